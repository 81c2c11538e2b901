use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use salesops_common::{Error, Result};
use tracing::info;

use crate::database::table_exists;

/// Metadata table holding the schema version record.
pub const VERSION_TABLE: &str = "system_meta";

/// Primary key of the schema version record.
pub const VERSION_KEY: &str = "schema_version";

/// Reads and writes the persisted schema version marker.
///
/// Borrows any connection, including an open transaction (which derefs to
/// [`Connection`]), so the marker can be moved inside the same transaction
/// as the migration it records.
pub struct VersionStore<'c> {
    conn: &'c Connection,
}

impl<'c> VersionStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn table_exists(&self) -> Result<bool> {
        table_exists(self.conn, VERSION_TABLE)
    }

    /// Create the metadata table and seed the record with version 0.
    ///
    /// Fails if the table already exists; callers check [`Self::table_exists`]
    /// first.
    pub fn create_version_table(&self) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Storage(format!("failed to begin transaction: {e}")))?;

        tx.execute_batch(&format!(
            "CREATE TABLE {VERSION_TABLE} (
                id VARCHAR(45) PRIMARY KEY,
                value VARCHAR(512) NULL
            );"
        ))
        .map_err(|e| Error::Storage(format!("failed to create {VERSION_TABLE}: {e}")))?;

        tx.execute(
            &format!("INSERT INTO {VERSION_TABLE} (id, value) VALUES (?1, ?2)"),
            params![VERSION_KEY, "0"],
        )
        .map_err(|e| Error::Storage(format!("failed to seed {VERSION_KEY}: {e}")))?;

        tx.commit()
            .map_err(|e| Error::Storage(format!("failed to commit {VERSION_TABLE}: {e}")))?;

        info!("created {VERSION_TABLE} with {VERSION_KEY} = 0");
        Ok(())
    }

    /// The stored version, or 0 when the record is absent, NULL, non-numeric
    /// or not positive.
    pub fn current_version(&self) -> Result<i64> {
        let value: Option<Value> = self
            .conn
            .query_row(
                &format!("SELECT value FROM {VERSION_TABLE} WHERE id = ?1"),
                params![VERSION_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Storage(format!("failed to read {VERSION_KEY}: {e}")))?;

        Ok(value.map(version_from_value).unwrap_or(0))
    }

    /// Overwrite the stored version. Fails when the record is missing rather
    /// than updating nothing.
    pub fn set_version(&self, version: i64) -> Result<()> {
        let updated = self
            .conn
            .execute(
                &format!("UPDATE {VERSION_TABLE} SET value = ?1 WHERE id = ?2"),
                params![version.to_string(), VERSION_KEY],
            )
            .map_err(|e| Error::Storage(format!("failed to update {VERSION_KEY}: {e}")))?;

        if updated == 0 {
            return Err(Error::Storage(format!(
                "{VERSION_KEY} record missing from {VERSION_TABLE}"
            )));
        }
        Ok(())
    }
}

fn version_from_value(value: Value) -> i64 {
    let version = match value {
        Value::Integer(v) => v,
        Value::Real(v) => v as i64,
        Value::Text(s) => s.trim().parse().unwrap_or(0),
        Value::Null | Value::Blob(_) => 0,
    };
    version.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn fresh_database_has_no_version_table() {
        let db = Database::in_memory().unwrap();
        assert!(!VersionStore::new(db.connection()).table_exists().unwrap());
    }

    #[test]
    fn create_version_table_seeds_zero() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();

        assert!(store.table_exists().unwrap());
        assert_eq!(store.current_version().unwrap(), 0);

        let raw: String = db
            .connection()
            .query_row(
                "SELECT value FROM system_meta WHERE id = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, "0");
    }

    #[test]
    fn create_version_table_is_not_idempotent() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();

        let err = store.create_version_table().unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn set_version_round_trips_as_text() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();

        store.set_version(7).unwrap();
        assert_eq!(store.current_version().unwrap(), 7);
    }

    #[test]
    fn set_version_without_record_fails() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();
        db.connection()
            .execute("DELETE FROM system_meta", [])
            .unwrap();

        let err = store.set_version(3).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn reading_without_table_is_a_storage_error() {
        let db = Database::in_memory().unwrap();
        let err = VersionStore::new(db.connection())
            .current_version()
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn falsy_stored_values_read_as_zero() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();

        for raw in [None, Some("abc"), Some("-4"), Some("")] {
            db.connection()
                .execute(
                    "UPDATE system_meta SET value = ?1 WHERE id = 'schema_version'",
                    params![raw],
                )
                .unwrap();
            assert_eq!(store.current_version().unwrap(), 0, "stored {raw:?}");
        }
    }

    #[test]
    fn integer_typed_value_is_accepted() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();
        db.connection()
            .execute("UPDATE system_meta SET value = 12 WHERE id = 'schema_version'", [])
            .unwrap();

        assert_eq!(store.current_version().unwrap(), 12);
    }

    #[test]
    fn missing_record_reads_as_zero() {
        let db = Database::in_memory().unwrap();
        let store = VersionStore::new(db.connection());
        store.create_version_table().unwrap();
        db.connection()
            .execute("DELETE FROM system_meta", [])
            .unwrap();

        assert_eq!(store.current_version().unwrap(), 0);
    }

    #[test]
    fn set_version_inside_rolled_back_transaction_is_undone() {
        let mut db = Database::in_memory().unwrap();
        VersionStore::new(db.connection())
            .create_version_table()
            .unwrap();

        {
            let tx = db.connection_mut().transaction().unwrap();
            VersionStore::new(&tx).set_version(9).unwrap();
            tx.rollback().unwrap();
        }

        assert_eq!(
            VersionStore::new(db.connection()).current_version().unwrap(),
            0
        );
    }
}
