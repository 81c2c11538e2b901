//! CLI argument definitions using clap derive API

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use salesops_config::loader::{ENV_DB_PATH, ENV_SCHEMA_DIR};

/// SalesOps - versioned schema migrations for the sales database
#[derive(Parser, Debug)]
#[command(name = "salesops")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (YAML or TOML). Defaults to salesops.yml/.yaml/.toml in the working directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overrides database.path
    #[arg(short, long, global = true, env = ENV_DB_PATH)]
    pub database: Option<PathBuf>,

    /// Directory holding <n>.sql and <n>.rollback.sql files, overrides migrations.schema_dir
    #[arg(short, long, global = true, env = ENV_SCHEMA_DIR)]
    pub schema_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending forward migration
    Migrate,

    /// Undo applied migrations down to a target version
    Rollback(RollbackArgs),

    /// Show applied and pending migrations without changing anything
    Status(StatusArgs),

    /// Scaffold the next numbered migration and rollback pair
    New(NewArgs),
}

#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Version to leave the database at; 0 undoes everything
    #[arg(allow_negative_numbers = true)]
    pub target: i64,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Short description written into the file headers
    pub name: String,
}
