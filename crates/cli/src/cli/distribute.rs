//! `qsched distribute`: schedule one contact's invitations and submit them.

use anyhow::Context;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;

use qs_client::distribution::{email_request, sms_request, tagged_message, Recipients};
use qs_client::{EmailDistributionRequest, QualtricsClient, SmsDistributionRequest};
use qs_domain::config::Config;
use qs_scheduler::{pending_after, schedule, ScheduleRequest, ScheduledSend};

use super::credentials::load_token;

/// A distribution ready to post.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Planned {
    Sms(SmsDistributionRequest),
    Email(EmailDistributionRequest),
}

/// Build one request per send. Each message gets its own random tag.
pub fn plan<R: Rng + ?Sized>(
    config: &Config,
    contact_id: &str,
    email: bool,
    sends: &[ScheduledSend],
    message_text: &str,
    rng: &mut R,
) -> Vec<Planned> {
    let project = &config.project;
    sends
        .iter()
        .map(|send| {
            let recipients = Recipients {
                mailing_list_id: project.mailing_list_id.clone(),
                contact_id: contact_id.to_owned(),
            };
            let text = tagged_message(message_text, rng);
            if email {
                Planned::Email(email_request(
                    &project.email,
                    &project.survey_id,
                    recipients,
                    send,
                    text,
                ))
            } else {
                Planned::Sms(sms_request(&project.survey_id, recipients, send, text))
            }
        })
        .collect()
}

/// Library message id for the chosen channel.
fn message_id(config: &Config, email: bool) -> anyhow::Result<&str> {
    if email {
        config
            .project
            .message_id_email
            .as_deref()
            .context("--email needs project.MESSAGE_ID_EMAIL")
    } else {
        Ok(config.project.message_id.as_str())
    }
}

pub fn run(config: &Config, contact_id: &str, email: bool, dry_run: bool) -> anyhow::Result<()> {
    let request = ScheduleRequest::from_embedded(&config.embedded_data, config.default_time_zone())?;
    let sends = pending_after(&schedule(&request)?, Utc::now());
    if sends.is_empty() {
        println!("No future sends for {contact_id}; nothing to submit.");
        return Ok(());
    }

    let message_id = message_id(config, email)?;
    let library_id = config
        .account
        .library_id
        .as_deref()
        .context("account.LIBRARY_ID is required to load the invitation text")?;

    if dry_run {
        let placeholder = format!("<library message {library_id}/{message_id}>");
        let planned = plan(config, contact_id, email, &sends, &placeholder, &mut rand::thread_rng());
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    let token = load_token(&config.account)?;
    let client = QualtricsClient::new(&config.account, token)?;
    let text = client.library_message(library_id, message_id)?;

    let planned = plan(config, contact_id, email, &sends, &text, &mut rand::thread_rng());
    let mut submitted = 0usize;
    for (send, item) in sends.iter().zip(&planned) {
        let receipt = match item {
            Planned::Sms(req) => client.send_sms_distribution(req),
            Planned::Email(req) => client.send_email_distribution(req),
        }
        .with_context(|| format!("submitting send at {}", send.send_time_utc))?;
        submitted += 1;
        println!(
            "{}  {}",
            qs_scheduler::format_vendor_timestamp(send.send_time_utc),
            receipt.id.as_deref().unwrap_or("(no id)")
        );
    }

    tracing::info!(contact_id, submitted, "distributions submitted");
    Ok(())
}
