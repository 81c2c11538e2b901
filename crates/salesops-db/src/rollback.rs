use std::collections::BTreeMap;
use std::time::Instant;

use salesops_common::{Error, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::apply::{Phase, apply_file, elapsed_ms};
use crate::migrator::Migrator;
use crate::source::MigrationFile;
use crate::version_store::VersionStore;

/// Outcome of a rollback run.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub target_version: i64,
    pub from_version: i64,
    /// Marker value after the run, read back from the database.
    pub to_version: i64,
    /// Versions undone by this run, in descending order.
    pub rolled_back: Vec<i64>,
    /// Versions in range that had no rollback file. The marker was not
    /// decremented for these.
    pub missing: Vec<i64>,
    pub statements_executed: usize,
    pub elapsed_ms: u128,
}

impl Migrator<'_> {
    /// Undo versions in `(target, current]`, highest first, each through its
    /// `<n>.rollback.sql` file in its own transaction. A committed rollback of
    /// version `n` leaves the marker at `n - 1`.
    pub fn run_rollback(&mut self, target: i64) -> Result<RollbackReport> {
        let started = Instant::now();
        self.roll_back_to(target, started).inspect_err(|e| {
            error!(
                elapsed_ms = elapsed_ms(started),
                "database rollback failed: {e}"
            );
        })
    }

    fn roll_back_to(&mut self, target: i64, started: Instant) -> Result<RollbackReport> {
        if target < 0 {
            return Err(Error::Config(format!(
                "target version must be non-negative, got {target}"
            )));
        }

        info!(
            elapsed_ms = elapsed_ms(started),
            dir = %self.source.dir().display(),
            "starting schema rollback to version {target}"
        );

        let rollbacks = self.source.rollback_files()?;
        let forwards = self.source.forward_files()?;
        info!(
            elapsed_ms = elapsed_ms(started),
            "rollback files: {:?}",
            rollbacks.iter().map(|f| f.file_name()).collect::<Vec<_>>()
        );

        let from_version = {
            let store = VersionStore::new(self.db.connection());
            if store.table_exists()? {
                store.current_version()?
            } else {
                info!("version table absent, nothing has been migrated");
                0
            }
        };

        let mut report = RollbackReport {
            target_version: target,
            from_version,
            to_version: from_version,
            rolled_back: Vec::new(),
            missing: Vec::new(),
            statements_executed: 0,
            elapsed_ms: 0,
        };

        if from_version <= target {
            info!(
                elapsed_ms = elapsed_ms(started),
                "current version ({from_version}) is less than or equal to target version ({target}), no rollback needed"
            );
            report.elapsed_ms = elapsed_ms(started);
            return Ok(report);
        }

        let in_range = |version: i64| version > target && version <= from_version;

        // Every version known from either file class; `None` means no
        // rollback file exists for it.
        let mut candidates: BTreeMap<i64, Option<&MigrationFile>> = BTreeMap::new();
        for file in forwards.iter().filter(|f| in_range(f.version)) {
            candidates.entry(file.version).or_insert(None);
        }
        for file in rollbacks.iter().filter(|f| in_range(f.version)) {
            candidates.insert(file.version, Some(file));
        }

        for (&version, file) in candidates.iter().rev() {
            let Some(file) = file.filter(|f| f.path.is_file()) else {
                warn!(
                    elapsed_ms = elapsed_ms(started),
                    "no rollback file found for version {version}, marker left unchanged"
                );
                report.missing.push(version);
                continue;
            };

            report.statements_executed +=
                apply_file(self.db, file, version - 1, Phase::Rollback, started)?;
            report.rolled_back.push(version);

            info!(
                elapsed_ms = elapsed_ms(started),
                "rolled back to version {} - {}",
                version - 1,
                file.file_name()
            );
        }

        report.to_version = VersionStore::new(self.db.connection()).current_version()?;
        report.elapsed_ms = elapsed_ms(started);
        info!(
            elapsed_ms = report.elapsed_ms,
            version = report.to_version,
            "database rollback completed successfully"
        );

        Ok(report)
    }
}
