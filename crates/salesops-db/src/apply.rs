use std::fmt;
use std::time::Instant;

use salesops_common::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::source::MigrationFile;
use crate::version_store::VersionStore;

/// Which runner is applying a file. Only affects log wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Migration,
    Rollback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Migration => f.write_str("migration"),
            Phase::Rollback => f.write_str("rollback"),
        }
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u128 {
    started.elapsed().as_millis()
}

/// Execute every statement of `file` and move the version marker to
/// `marker`, all inside one transaction. Any failure rolls the transaction
/// back before the error is returned.
///
/// Returns the number of statements executed.
pub(crate) fn apply_file(
    db: &mut Database,
    file: &MigrationFile,
    marker: i64,
    phase: Phase,
    started: Instant,
) -> Result<usize> {
    let name = file.file_name();
    let statements = file.statements()?;

    info!(
        elapsed_ms = elapsed_ms(started),
        file = %name,
        statements = statements.len(),
        "starting {phase} for {name}"
    );

    let tx = db.connection_mut().transaction().map_err(|e| {
        Error::Storage(format!("failed to begin transaction for {name}: {e}"))
    })?;

    for statement in &statements {
        debug!(elapsed_ms = elapsed_ms(started), file = %name, "executing sql: {statement}");

        if let Err(e) = tx.execute_batch(statement) {
            error!(
                elapsed_ms = elapsed_ms(started),
                file = %name,
                statement = %statement,
                "{phase} failed for {name}: {e}"
            );
            if let Err(rollback_err) = tx.rollback() {
                warn!("rollback of {name} failed: {rollback_err}");
            }
            return Err(Error::Statement {
                file: name,
                statement: statement.clone(),
                message: e.to_string(),
            });
        }
    }

    if let Err(e) = VersionStore::new(&tx).set_version(marker) {
        error!(
            elapsed_ms = elapsed_ms(started),
            file = %name,
            "{phase} failed for {name}: {e}"
        );
        if let Err(rollback_err) = tx.rollback() {
            warn!("rollback of {name} failed: {rollback_err}");
        }
        return Err(e);
    }

    tx.commit()
        .map_err(|e| Error::Storage(format!("failed to commit {name}: {e}")))?;

    Ok(statements.len())
}
