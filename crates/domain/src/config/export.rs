use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ExportFormat;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response export
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Export job polling settings.
///
/// Between non-terminal polls the poller sleeps
/// `wait_time_secs * 2^(retry - 1)`; the job is abandoned once the retry
/// counter exceeds `max_retries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "d_wait_time_secs")]
    pub wait_time_secs: f64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Directory the normalized artifact is written to.
    #[serde(default = "d_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            wait_time_secs: d_wait_time_secs(),
            max_retries: d_max_retries(),
            output_dir: d_output_dir(),
        }
    }
}

impl ExportConfig {
    /// Base backoff interval. Non-finite or negative values collapse to zero.
    pub fn wait_time(&self) -> Duration {
        if self.wait_time_secs.is_finite() && self.wait_time_secs > 0.0 {
            Duration::from_secs_f64(self.wait_time_secs)
        } else {
            Duration::ZERO
        }
    }
}

fn d_wait_time_secs() -> f64 {
    7.5
}

fn d_max_retries() -> u32 {
    5
}

fn d_output_dir() -> PathBuf {
    PathBuf::from(".")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Logging
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "d_filter")]
    pub filter: String,
    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: d_filter(),
            json: false,
        }
    }
}

fn d_filter() -> String {
    "warn".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vendor_guidance() {
        let cfg = ExportConfig::default();
        assert_eq!(cfg.format, ExportFormat::Json);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.wait_time(), Duration::from_millis(7500));
    }

    #[test]
    fn negative_wait_time_is_zero() {
        let cfg = ExportConfig {
            wait_time_secs: -3.0,
            ..ExportConfig::default()
        };
        assert_eq!(cfg.wait_time(), Duration::ZERO);
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: ExportConfig = serde_yaml::from_str("format: csv").unwrap();
        assert_eq!(cfg.format, ExportFormat::Csv);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.output_dir, PathBuf::from("."));
    }
}
