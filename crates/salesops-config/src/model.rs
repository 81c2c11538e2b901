use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the salesops tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("salesops.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory holding `<n>.sql` and `<n>.rollback.sql` files.
    pub schema_dir: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("managed_data/schema"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `SALESOPS_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Directory for the daily-rotated log file. `None` keeps logs on
    /// stderr only.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            dir: Some(PathBuf::from("logs")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bundled_schema() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, PathBuf::from("salesops.db"));
        assert_eq!(
            config.migrations.schema_dir,
            PathBuf::from("managed_data/schema")
        );
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn log_dir_can_be_disabled_or_moved() {
        let config: AppConfig = serde_yaml::from_str("log:\n  dir: null\n").unwrap();
        assert_eq!(config.log.dir, None);
        assert_eq!(config.log.level, "info");

        let config: AppConfig = toml::from_str("[log]\ndir = \"/var/log/salesops\"\n").unwrap();
        assert_eq!(config.log.dir, Some(PathBuf::from("/var/log/salesops")));
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let config: AppConfig = serde_yaml::from_str("database:\n  path: /tmp/ops.db\n").unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/ops.db"));
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.migrations, MigrationsConfig::default());
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
