use std::path::{Path, PathBuf};

use salesops_common::{Error, Result};
use tracing::{debug, info, warn};

use crate::model::AppConfig;

/// File names probed in the working directory when no config path is given.
const DEFAULT_CONFIG_FILES: &[&str] = &["salesops.yml", "salesops.yaml", "salesops.toml"];

pub const ENV_DB_PATH: &str = "SALESOPS_DB_PATH";
pub const ENV_SCHEMA_DIR: &str = "SALESOPS_SCHEMA_DIR";
pub const ENV_LOG_FORMAT: &str = "SALESOPS_LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "SALESOPS_LOG_DIR";

/// Resolves the effective [`AppConfig`] from `.env`, an optional config file
/// and environment overrides, in that order.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration. An explicitly given `path` must exist; otherwise
    /// the default file names are probed and defaults are used when none is
    /// present.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        match dotenvy::dotenv() {
            Ok(env_path) => debug!("loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("ignoring unreadable .env file: {e}"),
        }

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover(Path::new(".")) {
                Some(found) => Self::from_file(&found)?,
                None => AppConfig::default(),
            },
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a single YAML or TOML config file.
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// First default config file present in `dir`, if any.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Overlay `SALESOPS_*` variables onto `config`. `lookup` abstracts the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
        config.database.path = PathBuf::from(path);
    }
    if let Some(dir) = lookup(ENV_SCHEMA_DIR).filter(|v| !v.is_empty()) {
        config.migrations.schema_dir = PathBuf::from(dir);
    }
    if let Some(format) = lookup(ENV_LOG_FORMAT).filter(|v| !v.is_empty()) {
        config.log.format = format
            .parse()
            .map_err(|e| Error::Config(format!("{ENV_LOG_FORMAT}: {e}")))?;
    }
    if let Some(dir) = lookup(ENV_LOG_DIR).filter(|v| !v.is_empty()) {
        config.log.dir = Some(PathBuf::from(dir));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::LogFormat;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_yaml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesops.yml");
        std::fs::write(
            &path,
            "database:\n  path: ops.db\nmigrations:\n  schema_dir: sql\nlog:\n  format: json\n",
        )
        .unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();
        assert_eq!(config.database.path, PathBuf::from("ops.db"));
        assert_eq!(config.migrations.schema_dir, PathBuf::from("sql"));
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn reads_toml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesops.toml");
        std::fs::write(&path, "[database]\npath = \"ops.db\"\nbusy_timeout_ms = 250\n").unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();
        assert_eq!(config.database.path, PathBuf::from("ops.db"));
        assert_eq!(config.database.busy_timeout_ms, 250);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesops.ini");
        std::fs::write(&path, "path=ops.db").unwrap();

        let err = ConfigLoader::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load(Some(&dir.path().join("absent.yml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn discover_prefers_yml_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("salesops.toml"), "").unwrap();
        std::fs::write(dir.path().join("salesops.yml"), "").unwrap();

        let found = ConfigLoader::discover(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "salesops.yml");
    }

    #[test]
    fn discover_returns_none_for_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::discover(dir.path()).is_none());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_DB_PATH, "/var/lib/ops.db"),
                (ENV_SCHEMA_DIR, "/srv/schema"),
                (ENV_LOG_FORMAT, "json"),
                (ENV_LOG_DIR, "/var/log/salesops"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/var/lib/ops.db"));
        assert_eq!(config.migrations.schema_dir, PathBuf::from("/srv/schema"));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.dir, Some(PathBuf::from("/var/log/salesops")));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, env(&[(ENV_DB_PATH, "")])).unwrap();
        assert_eq!(config.database.path, PathBuf::from("salesops.db"));
    }

    #[test]
    fn invalid_log_format_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        assert!(err.to_string().contains(ENV_LOG_FORMAT));
    }
}
