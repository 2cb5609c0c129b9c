//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{FirstRunNaming, OverlapPolicy, ScheduleTimezone, SluiceConfig};
use crate::config::secret_string;
use crate::domain::errors::SluiceError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SluiceConfig
/// 4. Applies environment variable overrides (SLUICE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if any step fails.
///
/// # Examples
///
/// ```no_run
/// use sluice::config::loader::load_config;
///
/// let config = load_config("sluice.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SluiceConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SluiceError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SluiceError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config = parse_config(&contents)?;

    tracing::debug!(
        path = %path.display(),
        exporters = config.exporters.len(),
        databases = config.databases.len(),
        storages = config.storages.len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Parses and validates configuration from TOML text
///
/// # Errors
///
/// Returns a configuration error if substitution, parsing or validation fails.
pub fn parse_config(contents: &str) -> Result<SluiceConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SluiceConfig = toml::from_str(&contents)
        .map_err(|e| SluiceError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SluiceError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_placeholder();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SluiceError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Environment variable suffix for a configuration map key
///
/// `eu-warehouse` becomes `EU_WAREHOUSE`.
fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Applies environment variable overrides using SLUICE_* prefix
///
/// Environment variables follow the pattern: SLUICE_<SECTION>_<KEY>, for
/// example SLUICE_APPLICATION_LOG_LEVEL. Databases are addressed by name:
/// SLUICE_DATABASES_<NAME>_CONNECTION_STRING.
fn apply_env_overrides(config: &mut SluiceConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_WATERMARK_FILE") {
        config.application.watermark_file = val;
    }
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_FIRST_RUN_NAMING") {
        config.application.first_run_naming = match val.to_lowercase().as_str() {
            "stable" => FirstRunNaming::Stable,
            "timestamped" => FirstRunNaming::Timestamped,
            other => {
                return Err(SluiceError::Configuration(format!(
                    "Invalid SLUICE_APPLICATION_FIRST_RUN_NAMING '{other}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_SCHEDULE_TIMEZONE") {
        config.application.schedule_timezone = match val.to_lowercase().as_str() {
            "utc" => ScheduleTimezone::Utc,
            "local" => ScheduleTimezone::Local,
            other => {
                return Err(SluiceError::Configuration(format!(
                    "Invalid SLUICE_APPLICATION_SCHEDULE_TIMEZONE '{other}'"
                )))
            }
        };
    }

    // Export overrides
    if let Ok(val) = std::env::var("SLUICE_EXPORT_QUERY_TIMEOUT_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.export.query_timeout_seconds = secs;
        }
    }
    if let Ok(val) = std::env::var("SLUICE_EXPORT_UPLOAD_TIMEOUT_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.export.upload_timeout_seconds = secs;
        }
    }
    if let Ok(val) = std::env::var("SLUICE_EXPORT_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.export.upload_retry.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("SLUICE_EXPORT_DRY_RUN") {
        config.export.dry_run = val.parse().unwrap_or(false);
    }

    // Scheduler overrides
    if let Ok(val) = std::env::var("SLUICE_SCHEDULER_OVERLAP_POLICY") {
        config.scheduler.overlap_policy = match val.to_lowercase().as_str() {
            "skip" => OverlapPolicy::Skip,
            "wait" => OverlapPolicy::Wait,
            other => {
                return Err(SluiceError::Configuration(format!(
                    "Invalid SLUICE_SCHEDULER_OVERLAP_POLICY '{other}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("SLUICE_SCHEDULER_SHUTDOWN_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.scheduler.shutdown_timeout_secs = secs;
        }
    }

    // Database overrides
    for (name, database) in config.databases.iter_mut() {
        let var = format!("SLUICE_DATABASES_{}_CONNECTION_STRING", env_key(name));
        if let Ok(val) = std::env::var(&var) {
            database.connection_string = secret_string(val);
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SLUICE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("SLUICE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
