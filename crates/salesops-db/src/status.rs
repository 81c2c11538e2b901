use std::collections::BTreeSet;
use std::time::Instant;

use salesops_common::Result;
use serde::Serialize;
use tracing::error;

use crate::apply::elapsed_ms;
use crate::migrator::Migrator;
use crate::version_store::VersionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Applied,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub version: i64,
    pub file: String,
    pub state: MigrationState,
    pub has_rollback: bool,
}

/// Read-only snapshot of where the database stands against the files on disk.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub version_table_exists: bool,
    pub current_version: i64,
    pub entries: Vec<StatusEntry>,
    /// Rollback files with no forward file of the same version.
    pub orphan_rollbacks: Vec<i64>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == MigrationState::Pending)
    }
}

impl Migrator<'_> {
    /// Compare the stored marker with the forward files on disk. Never
    /// creates the version table.
    pub fn status(&self) -> Result<StatusReport> {
        let started = Instant::now();
        self.collect_status().inspect_err(|e| {
            error!(
                elapsed_ms = elapsed_ms(started),
                "status check failed: {e}"
            );
        })
    }

    fn collect_status(&self) -> Result<StatusReport> {
        let forwards = self.source.forward_files()?;
        let rollback_versions: BTreeSet<i64> = self
            .source
            .rollback_files()?
            .iter()
            .map(|f| f.version)
            .collect();

        let store = VersionStore::new(self.db.connection());
        let version_table_exists = store.table_exists()?;
        let current_version = if version_table_exists {
            store.current_version()?
        } else {
            0
        };

        let entries = forwards
            .iter()
            .map(|file| StatusEntry {
                version: file.version,
                file: file.file_name(),
                state: if file.version <= current_version {
                    MigrationState::Applied
                } else {
                    MigrationState::Pending
                },
                has_rollback: rollback_versions.contains(&file.version),
            })
            .collect();

        let forward_versions: BTreeSet<i64> = forwards.iter().map(|f| f.version).collect();
        let orphan_rollbacks = rollback_versions
            .difference(&forward_versions)
            .copied()
            .collect();

        Ok(StatusReport {
            version_table_exists,
            current_version,
            entries,
            orphan_rollbacks,
        })
    }
}
