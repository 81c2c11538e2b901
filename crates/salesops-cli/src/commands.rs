use std::time::Duration;

use anyhow::{Context, Result};
use salesops_config::{AppConfig, ConfigLoader};
use salesops_db::{Database, MigrationSource, Migrator};
use tracing::info;

use crate::banner::{self, Target};
use crate::cli::{Commands, GlobalArgs, NewArgs, RollbackArgs, StatusArgs};

/// Load configuration and let command-line flags win over everything else.
pub fn resolve_config(global: &GlobalArgs) -> salesops_common::Result<AppConfig> {
    let mut config = ConfigLoader::load(global.config.as_deref())?;
    apply_cli_overrides(&mut config, global);
    Ok(config)
}

fn apply_cli_overrides(config: &mut AppConfig, global: &GlobalArgs) {
    if let Some(path) = &global.database {
        config.database.path = path.clone();
    }
    if let Some(dir) = &global.schema_dir {
        config.migrations.schema_dir = dir.clone();
    }
}

pub fn dispatch(command: &Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Migrate => migrate(config),
        Commands::Rollback(args) => rollback(args, config),
        Commands::Status(args) => status(args, config),
        Commands::New(args) => new(args, config),
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let db = Database::open_with_timeout(
        &config.database.path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )?;
    info!(path = %config.database.path.display(), "database opened");
    Ok(db)
}

fn target(config: &AppConfig) -> Target<'_> {
    Target {
        database: &config.database.path,
        schema_dir: &config.migrations.schema_dir,
    }
}

fn migrate(config: &AppConfig) -> Result<()> {
    let mut db = open_database(config)?;
    let source = MigrationSource::new(config.migrations.schema_dir.clone());
    let report = Migrator::new(&mut db, source).run_migrations()?;

    println!("{}", banner::migration_summary(&report, &target(config)));
    Ok(())
}

fn rollback(args: &RollbackArgs, config: &AppConfig) -> Result<()> {
    let mut db = open_database(config)?;
    let source = MigrationSource::new(config.migrations.schema_dir.clone());
    let report = Migrator::new(&mut db, source).run_rollback(args.target)?;

    println!("{}", banner::rollback_summary(&report, &target(config)));
    Ok(())
}

fn status(args: &StatusArgs, config: &AppConfig) -> Result<()> {
    // A missing file is reported as an empty database rather than created.
    let mut db = if config.database.path.exists() {
        open_database(config)?
    } else {
        info!(
            path = %config.database.path.display(),
            "database file does not exist yet"
        );
        Database::in_memory()?
    };
    let source = MigrationSource::new(config.migrations.schema_dir.clone());
    let report = Migrator::new(&mut db, source).status()?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serializing status report")?;
        println!("{json}");
    } else {
        println!("{}", banner::status_table(&report));
    }
    Ok(())
}

fn new(args: &NewArgs, config: &AppConfig) -> Result<()> {
    let source = MigrationSource::new(config.migrations.schema_dir.clone());
    let (forward, rollback) = source.create_pair(&args.name)?;

    println!("{}", forward.path.display());
    println!("{}", rollback.path.display());
    Ok(())
}

/// Exit status for a failed command. Library errors carry their own code;
/// anything else is a generic failure.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<salesops_common::Error>()
        .map_or(1, salesops_common::Error::exit_code)
}
