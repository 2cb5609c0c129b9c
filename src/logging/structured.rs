//! Subscriber setup
//!
//! Human-readable lines go to stderr. When `[logging] local_enabled` is set,
//! the same events are also appended as JSON lines to
//! `<local_path>/<local_file_name>`, rotated as configured. Every event
//! emitted during an export run carries the run's `job` and `run_id` span
//! fields in the JSON output, so one run can be followed from its bound
//! query to its upload.
//!
//! `RUST_LOG` overrides the configured level.

use crate::config::LoggingConfig;
use crate::domain::{Result, SluiceError};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Keeps the background log writer alive; dropping it flushes the file
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns a configuration error for an unknown level, an unknown rotation,
/// or a log directory that cannot be created.
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(level)?;
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("sluice={level}")))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    let (file, file_guard) = if config.local_enabled {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(writer)
            .with_filter(filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    tracing::info!(
        level = %level,
        file = config.local_enabled.then(|| log_file_path(config)).as_deref(),
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        SluiceError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    Ok(RollingFileAppender::new(
        parse_rotation(&config.local_rotation)?,
        &config.local_path,
        &config.local_file_name,
    ))
}

fn log_file_path(config: &LoggingConfig) -> String {
    Path::new(&config.local_path)
        .join(&config.local_file_name)
        .display()
        .to_string()
}

fn parse_rotation(rotation: &str) -> Result<Rotation> {
    match rotation {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        "never" => Ok(Rotation::NEVER),
        other => Err(SluiceError::Configuration(format!(
            "Invalid log rotation '{other}'. Must be one of: daily, hourly, never"
        ))),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        SluiceError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("trace", Level::TRACE)]
    #[test_case("debug", Level::DEBUG)]
    #[test_case("INFO", Level::INFO ; "upper case")]
    #[test_case("Warn", Level::WARN ; "mixed case")]
    #[test_case("error", Level::ERROR)]
    fn test_parse_log_level(input: &str, expected: Level) {
        assert_eq!(parse_log_level(input).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("loud" ; "unknown")]
    fn test_parse_log_level_invalid(input: &str) {
        assert!(matches!(
            parse_log_level(input),
            Err(SluiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation("hourly").unwrap(), Rotation::HOURLY);
        assert_eq!(parse_rotation("never").unwrap(), Rotation::NEVER);
        assert!(parse_rotation("weekly").is_err());
    }

    #[test]
    fn test_log_file_path_uses_configured_name() {
        let config = LoggingConfig {
            local_enabled: true,
            local_path: "/var/log/sluice".to_string(),
            local_file_name: "exports.log".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(log_file_path(&config), "/var/log/sluice/exports.log");
    }
}
