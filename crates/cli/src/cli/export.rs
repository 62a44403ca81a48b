use std::time::Duration;

use anyhow::Context;

use qs_client::QualtricsClient;
use qs_domain::config::Config;
use qs_export::{ExportPoller, PollSettings};

use super::credentials::load_token;
use super::ExportArgs;

/// Config values with command-line overrides applied.
pub fn settings(config: &Config, args: &ExportArgs) -> anyhow::Result<PollSettings> {
    let mut settings = PollSettings::from(&config.export);
    if let Some(secs) = args.wait_time {
        settings.wait_time = Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero())
            .with_context(|| format!("--wait-time {secs} is not a positive number of seconds"))?;
    }
    if let Some(max) = args.max_retries {
        anyhow::ensure!(max > 0, "--max-retries must be greater than 0");
        settings.max_retries = max;
    }
    Ok(settings)
}

pub fn run(config: &Config, args: &ExportArgs) -> anyhow::Result<()> {
    let survey_id = args
        .survey_id
        .as_deref()
        .unwrap_or(config.project.survey_id.as_str());
    anyhow::ensure!(
        !survey_id.trim().is_empty(),
        "no survey id: pass --survey-id or set project.SURVEY_ID"
    );
    let format = args.format.unwrap_or(config.export.format);
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.export.output_dir.clone());
    let settings = settings(config, args)?;

    let token = load_token(&config.account)?;
    let client = QualtricsClient::new(&config.account, token)?;
    let poller = ExportPoller::new(client, settings, output_dir);

    let artifact = poller
        .poll_and_fetch(survey_id, format)
        .with_context(|| format!("exporting {survey_id} as {format}"))?;

    println!(
        "{} response(s) written to {}",
        artifact.responses.len(),
        artifact.path.display()
    );
    Ok(())
}
