use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use salesops_common::{Error, Result};
use tracing::info;

/// Owned handle to the single connection a migration run works through.
///
/// Created once at process start and lent to the runner; every statement,
/// version read and transaction of a run goes over this one connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_with_timeout(db_path, Duration::from_secs(5))
    }

    pub fn open_with_timeout(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        info!("opening database at {}", db_path.display());
        let conn = Connection::open(db_path).map_err(|e| {
            Error::Connection(format!(
                "failed to open database {}: {e}",
                db_path.display()
            ))
        })?;

        conn.busy_timeout(busy_timeout)
            .map_err(|e| Error::Connection(format!("failed to set busy timeout: {e}")))?;

        Self::configure(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("failed to open in-memory database: {e}")))?;

        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Connection(format!("failed to set pragmas: {e}")))?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access, needed to open a transaction.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Whether a table called `name` exists in the schema catalog.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        table_exists(&self.conn, name)
    }
}

pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("failed to check for table {name}: {e}")))?;
    Ok(count > 0)
}
