use std::path::Path;

use salesops_config::{LogConfig, LogFormat};
use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Environment variable holding a tracing filter directive. Takes precedence
/// over `log.level` from the config file.
pub const LOG_ENV: &str = "SALESOPS_LOG";

const LOG_FILE_PREFIX: &str = "application";
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .boxed(),
    }
}

/// `application.<date>.log` in `dir`, rotated at midnight UTC. Creates `dir`
/// when it is missing.
fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)
}

fn file_layer(appender: RollingFileAppender, format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(false)
            .with_writer(appender)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_ansi(false)
            .with_writer(appender)
            .json()
            .boxed(),
    }
}

/// Install the global subscriber: stderr, so command output on stdout stays
/// machine-readable, plus the daily log file when `log.dir` is set.
pub fn init_tracing(config: &LogConfig) {
    let mut layers = vec![stderr_layer(config.format)];
    let mut file_error = None;

    if let Some(dir) = &config.dir {
        match file_appender(dir) {
            Ok(appender) => layers.push(file_layer(appender, config.format)),
            Err(e) => file_error = Some(format!("log file disabled, {}: {e}", dir.display())),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(config))
        .init();

    if let Some(message) = file_error {
        warn!("{message}");
    }
}
