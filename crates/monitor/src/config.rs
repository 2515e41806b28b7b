use std::path::PathBuf;

use crate::error::{MonitorError, MonitorResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Path to the JSON plant definition.
    pub plant_definition: PathBuf,
    /// Path to the JSON-lines readings file to replay.
    pub readings_file: PathBuf,
    /// Start every startable equipment before replaying readings.
    pub auto_start_equipment: bool,
    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Required | Default |
    /// |------------------------|----------|---------|
    /// | `PLANT_DEFINITION`     | yes      | --      |
    /// | `READINGS_FILE`        | yes      | --      |
    /// | `AUTO_START_EQUIPMENT` | no       | `true`  |
    /// | `LOG_FORMAT`           | no       | `text`  |
    pub fn from_env() -> MonitorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MonitorResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MonitorError::Config(format!("{key} must be set")))
        };

        let plant_definition = PathBuf::from(required("PLANT_DEFINITION")?);
        let readings_file = PathBuf::from(required("READINGS_FILE")?);

        let auto_start_equipment = match lookup("AUTO_START_EQUIPMENT") {
            None => true,
            Some(v) => v.parse::<bool>().map_err(|_| {
                MonitorError::Config(format!("AUTO_START_EQUIPMENT must be true or false, got '{v}'"))
            })?,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(MonitorError::Config(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{other}'"
                )))
            }
        };

        Ok(Self {
            plant_definition,
            readings_file,
            auto_start_equipment,
            log_format,
        })
    }
}
