use std::path::Path;

use qs_domain::config::{Config, ConfigError, ConfigSeverity};
use qs_scheduler::TimeSlotSet;

/// Every issue `Config::validate` reports, plus slot syntax of
/// `embedded_data.TimeSlots`.
pub fn issues(config: &Config) -> Vec<ConfigError> {
    let mut issues = config.validate();
    if let Some(spec) = &config.embedded_data.time_slots {
        if let Err(e) = TimeSlotSet::from_spec(spec) {
            issues.push(ConfigError::error("embedded_data.TimeSlots", e.to_string()));
        }
    }
    issues
}

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one error was found.
pub fn validate(config: &Config, config_path: &Path) -> bool {
    let issues = issues(config);

    if issues.is_empty() {
        println!("Config OK ({})", config_path.display());
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {}",
        error_count,
        warning_count,
        config_path.display()
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as YAML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = serde_yaml::to_string(config)?;
    print!("{output}");
    Ok(())
}
