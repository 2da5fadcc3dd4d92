//! Layered configuration: defaults, then an optional TOML file, then
//! `VISAFLOW_*` environment variables. Command line flags are applied last
//! by the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::UtcOffset;
use visaflow_core::TransitionPolicy;
use visaflow_engine::{NotificationMode, DEFAULT_MAX_CREATE_ATTEMPTS, DEFAULT_MAX_SAVE_ATTEMPTS};

/// Default request body limit: 1 MB.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct VisaflowConfig {
    pub(crate) server: ServerConfig,
    pub(crate) log: LogConfig,
    pub(crate) calendar: CalendarConfig,
    pub(crate) workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) port: u16,
    /// When set, every endpoint except `/health` requires this key.
    pub(crate) api_key: Option<String>,
    pub(crate) max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            api_key: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub(crate) level: String,
    pub(crate) format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CalendarConfig {
    /// Fixed offset from UTC, in hours, of the calendar identifiers are dated in.
    pub(crate) utc_offset_hours: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorkflowConfig {
    pub(crate) transition_policy: TransitionPolicy,
    pub(crate) notifications: NotificationMode,
    pub(crate) max_create_attempts: u32,
    pub(crate) max_save_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            transition_policy: TransitionPolicy::default(),
            notifications: NotificationMode::default(),
            max_create_attempts: DEFAULT_MAX_CREATE_ATTEMPTS,
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
        }
    }
}

impl VisaflowConfig {
    /// Load defaults, the file at `path` if given, and the process environment.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `VISAFLOW_*` variables, looked up through `lookup`.
    pub(crate) fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("VISAFLOW_PORT") {
            self.server.port = parse_env("VISAFLOW_PORT", value)?;
        }
        if let Some(value) = lookup("VISAFLOW_API_KEY") {
            self.server.api_key = Some(value).filter(|k| !k.is_empty());
        }
        if let Some(value) = lookup("VISAFLOW_LOG_LEVEL") {
            self.log.level = value;
        }
        if let Some(value) = lookup("VISAFLOW_LOG_FORMAT") {
            self.log.format = match value.as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::Env {
                        var: "VISAFLOW_LOG_FORMAT",
                        value,
                        reason: "expected text or json".to_string(),
                    })
                }
            };
        }
        if let Some(value) = lookup("VISAFLOW_UTC_OFFSET_HOURS") {
            self.calendar.utc_offset_hours = parse_env("VISAFLOW_UTC_OFFSET_HOURS", value)?;
        }
        if let Some(value) = lookup("VISAFLOW_TRANSITION_POLICY") {
            self.workflow.transition_policy = parse_env("VISAFLOW_TRANSITION_POLICY", value)?;
        }
        if let Some(value) = lookup("VISAFLOW_NOTIFICATIONS") {
            self.workflow.notifications = parse_env("VISAFLOW_NOTIFICATIONS", value)?;
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(-12..=14).contains(&self.calendar.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "calendar.utc_offset_hours must be between -12 and 14, got {}",
                self.calendar.utc_offset_hours
            )));
        }
        if self.workflow.max_create_attempts == 0 || self.workflow.max_save_attempts == 0 {
            return Err(ConfigError::Invalid(
                "workflow.max_create_attempts and workflow.max_save_attempts must be at least 1"
                    .to_string(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        UtcOffset::from_hms(self.calendar.utc_offset_hours, 0, 0)
            .map_err(|e| ConfigError::Invalid(format!("calendar.utc_offset_hours: {e}")))
    }

    /// TOML rendering with the API key masked.
    pub(crate) fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.server.api_key.is_some() {
            shown.server.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ConfigError::Invalid(format!("cannot render config: {e}")))
    }
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        reason: e.to_string(),
        value,
    })
}
