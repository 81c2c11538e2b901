//! Forward-only schema migrations with paired rollback files.
//!
//! Migration files live in one directory as `<n>.sql` and `<n>.rollback.sql`.
//! The highest committed version is kept in the `system_meta` table and is
//! moved inside the same transaction as the file it records.

mod apply;
pub mod database;
pub mod migrator;
pub mod rollback;
pub mod source;
pub mod splitter;
pub mod status;
pub mod version_store;

pub use database::Database;
pub use migrator::{MigrationReport, Migrator};
pub use rollback::RollbackReport;
pub use source::{MigrationFile, MigrationKind, MigrationSource};
pub use splitter::{split_statements, strip_comments};
pub use status::{MigrationState, StatusEntry, StatusReport};
pub use version_store::{VERSION_KEY, VERSION_TABLE, VersionStore};
