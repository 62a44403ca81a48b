mod account;
mod export;
mod project;

pub use account::*;
pub use export::*;
pub use project::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::parse_timezone;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything qsched reads from `config_qualtrics.yaml`.
///
/// Passed explicitly into every client and command; nothing in the
/// workspace reads configuration from process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub embedded_data: EmbeddedDataConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Read and parse the YAML file at `path`.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Timezone used for a recipient without one of their own.
    pub fn default_time_zone(&self) -> Option<&str> {
        self.embedded_data
            .time_zone
            .as_deref()
            .or(self.project.timezone.as_deref())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. Time slot syntax
    /// is checked by the scheduler crate, not here.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.account.data_center.trim().is_empty() {
            errors.push(ConfigError::error(
                "account.DATA_CENTER",
                "data center must not be empty",
            ));
        } else if !self
            .account
            .data_center
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            errors.push(ConfigError::error(
                "account.DATA_CENTER",
                format!(
                    "'{}' is not a valid data center id",
                    self.account.data_center
                ),
            ));
        }

        if self.account.default_directory.trim().is_empty() {
            errors.push(ConfigError::warning(
                "account.DEFAULT_DIRECTORY",
                "default directory is empty",
            ));
        }

        for (field, value) in [
            ("project.MAILING_LIST_ID", &self.project.mailing_list_id),
            ("project.SURVEY_ID", &self.project.survey_id),
            ("project.MESSAGE_ID", &self.project.message_id),
        ] {
            if value.trim().is_empty() {
                errors.push(ConfigError::error(field, "must not be empty"));
            }
        }

        if self.project.message_id_email.is_some() && self.account.library_id.is_none() {
            errors.push(ConfigError::warning(
                "account.LIBRARY_ID",
                "MESSAGE_ID_EMAIL is set but no library id is configured",
            ));
        }

        for (field, tz) in [
            ("project.TIMEZONE", &self.project.timezone),
            ("embedded_data.TimeZone", &self.embedded_data.time_zone),
        ] {
            if let Some(tz) = tz {
                if let Err(message) = parse_timezone(tz) {
                    errors.push(ConfigError::error(field, message));
                }
            }
        }

        if self.embedded_data.num_days == Some(0) {
            errors.push(ConfigError::error(
                "embedded_data.NumDays",
                "number of days must be at least 1",
            ));
        }

        if self.export.max_retries == 0 {
            errors.push(ConfigError::error(
                "export.max_retries",
                "max_retries must be greater than 0",
            ));
        }

        if !(self.export.wait_time_secs.is_finite() && self.export.wait_time_secs > 0.0) {
            errors.push(ConfigError::error(
                "export.wait_time_secs",
                "wait_time_secs must be a positive number",
            ));
        }

        if !self.account.verify_tls {
            errors.push(ConfigError::warning(
                "account.verify_tls",
                "TLS certificate verification is disabled",
            ));
        }

        errors
    }
}
