pub mod config;
pub mod credentials;
pub mod distribute;
pub mod export;
pub mod schedule;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use qs_domain::config::{Config, ConfigSeverity};
use qs_domain::types::ExportFormat;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/config_qualtrics.yaml";

/// qsched: survey send-time scheduling and response export.
#[derive(Debug, Parser)]
#[command(name = "qsched", version, about)]
pub struct Cli {
    /// Path to the YAML config (overrides `QS_CONFIG`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Emit JSON log lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Expand time slots into UTC send/expire pairs and print them.
    Schedule(ScheduleArgs),
    /// Schedule invitations for one contact and submit them to the vendor.
    Distribute {
        /// Contact lookup id within the configured mailing list.
        #[arg(long)]
        contact_id: String,
        /// Send email invitations instead of SMS.
        #[arg(long)]
        email: bool,
        /// Print the request bodies without contacting the vendor.
        #[arg(long)]
        dry_run: bool,
    },
    /// Export survey responses and write them to the output directory.
    Export(ExportArgs),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// YAML/JSON map of one contact's embedded data (`StartDate`,
    /// `TimeSlots` or `Time1`.., `NumDays`, `TimeZone`). Its values take
    /// precedence over `embedded_data`; flags take precedence over both.
    #[arg(long)]
    pub contact: Option<PathBuf>,
    /// First local day (YYYY-MM-DD). Defaults to `embedded_data.StartDate`.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// Slot string such as "800,[1200,1300]". Defaults to `embedded_data.TimeSlots`.
    #[arg(long)]
    pub slots: Option<String>,
    /// Number of days. Defaults to `embedded_data.NumDays`.
    #[arg(long)]
    pub days: Option<u32>,
    /// IANA timezone. Defaults to `embedded_data.TimeZone`, then `project.TIMEZONE`.
    #[arg(long)]
    pub tz: Option<String>,
    /// Survey link lifetime in minutes.
    #[arg(long)]
    pub expire_minutes: Option<u32>,
    /// Drop sends that are already in the past.
    #[arg(long)]
    pub future_only: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Survey to export. Defaults to `project.SURVEY_ID`.
    #[arg(long)]
    pub survey_id: Option<String>,
    /// json or csv.
    #[arg(long)]
    pub format: Option<ExportFormat>,
    /// Base backoff interval in seconds.
    #[arg(long)]
    pub wait_time: Option<f64>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as YAML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `--config`, then `QS_CONFIG`, then
/// [`DEFAULT_CONFIG_PATH`]. Returns the parsed [`Config`] and the path that
/// was used.
///
/// An explicitly named file must exist; a missing default file yields the
/// built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, PathBuf)> {
    let env_path = std::env::var_os("QS_CONFIG").map(PathBuf::from);
    let named = explicit.map(Path::to_path_buf).or(env_path);

    match named {
        Some(path) => {
            let config = Config::from_path(&path)?;
            Ok((config, path))
        }
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            let config = if path.exists() {
                Config::from_path(&path)?
            } else {
                Config::default()
            };
            Ok((config, path))
        }
    }
}

/// Fail unless the config has no error-level issues. Used by the commands
/// that talk to the vendor.
pub fn require_valid(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|issue| issue.severity == ConfigSeverity::Error)
        .map(|issue| issue.to_string())
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    anyhow::bail!(
        "{} has {} error(s):\n{}",
        config_path.display(),
        errors.len(),
        errors.join("\n")
    )
}
