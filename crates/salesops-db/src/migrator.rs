use std::time::Instant;

use salesops_common::Result;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::apply::{Phase, apply_file, elapsed_ms};
use crate::database::Database;
use crate::source::MigrationSource;
use crate::version_store::VersionStore;

/// Outcome of a forward migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub from_version: i64,
    pub to_version: i64,
    /// Versions applied by this run, in order.
    pub applied: Vec<i64>,
    /// Versions already at or below the marker when they were reached.
    pub skipped: Vec<i64>,
    pub statements_executed: usize,
    /// Whether this run had to create the version table.
    pub created_version_table: bool,
    pub elapsed_ms: u128,
}

/// Applies pending forward files and rolls back applied ones, one file per
/// transaction, over a single borrowed [`Database`].
pub struct Migrator<'db> {
    pub(crate) db: &'db mut Database,
    pub(crate) source: MigrationSource,
}

impl<'db> Migrator<'db> {
    pub fn new(db: &'db mut Database, source: MigrationSource) -> Self {
        Self { db, source }
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    /// Apply every forward file whose version is above the stored marker, in
    /// ascending order. Stops at the first failing file; files committed
    /// before it stay applied.
    pub fn run_migrations(&mut self) -> Result<MigrationReport> {
        let started = Instant::now();
        self.migrate(started).inspect_err(|e| {
            error!(
                elapsed_ms = elapsed_ms(started),
                "database migration failed: {e}"
            );
        })
    }

    fn migrate(&mut self, started: Instant) -> Result<MigrationReport> {
        info!(
            elapsed_ms = elapsed_ms(started),
            dir = %self.source.dir().display(),
            "starting schema migration"
        );

        let files = self.source.forward_files()?;
        info!(
            elapsed_ms = elapsed_ms(started),
            "forward migration files: {:?}",
            files.iter().map(|f| f.file_name()).collect::<Vec<_>>()
        );

        let (from_version, created_version_table) = {
            let store = VersionStore::new(self.db.connection());
            if store.table_exists()? {
                (store.current_version()?, false)
            } else {
                store.create_version_table()?;
                (0, true)
            }
        };
        info!(
            elapsed_ms = elapsed_ms(started),
            "current schema version {from_version}"
        );

        let mut current = from_version;
        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        let mut statements_executed = 0;

        for file in &files {
            if file.version <= current {
                debug!(
                    elapsed_ms = elapsed_ms(started),
                    "skipped migration for version {} - {}",
                    file.version,
                    file.file_name()
                );
                skipped.push(file.version);
                continue;
            }

            statements_executed +=
                apply_file(self.db, file, file.version, Phase::Migration, started)?;
            current = file.version;
            applied.push(file.version);

            info!(
                elapsed_ms = elapsed_ms(started),
                "migrated to version {} - {}",
                file.version,
                file.file_name()
            );
        }

        info!(
            elapsed_ms = elapsed_ms(started),
            applied = applied.len(),
            "database migration completed successfully"
        );

        Ok(MigrationReport {
            from_version,
            to_version: current,
            applied,
            skipped,
            statements_executed,
            created_version_table,
            elapsed_ms: elapsed_ms(started),
        })
    }
}
