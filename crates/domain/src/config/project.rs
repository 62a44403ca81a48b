use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::SlotSpec;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Project identifiers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "MAILING_LIST_ID", default)]
    pub mailing_list_id: String,
    #[serde(rename = "SURVEY_ID", default)]
    pub survey_id: String,
    /// Library message used for SMS invitations.
    #[serde(rename = "MESSAGE_ID", default)]
    pub message_id: String,
    /// Library message used for email invitations.
    #[serde(rename = "MESSAGE_ID_EMAIL", default)]
    pub message_id_email: Option<String>,
    /// Default recipient timezone when a contact carries none.
    #[serde(rename = "TIMEZONE", default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub email: EmailHeaderConfig,
}

/// Header fields for email distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailHeaderConfig {
    #[serde(default = "d_from_email")]
    pub from_email: String,
    #[serde(default = "d_from_name")]
    pub from_name: String,
    #[serde(default = "d_from_email")]
    pub reply_to_email: String,
    #[serde(default = "d_subject")]
    pub subject: String,
}

impl Default for EmailHeaderConfig {
    fn default() -> Self {
        Self {
            from_email: d_from_email(),
            from_name: d_from_name(),
            reply_to_email: d_from_email(),
            subject: d_subject(),
        }
    }
}

fn d_from_email() -> String {
    "noreply@qualtrics.com".into()
}

fn d_from_name() -> String {
    "Qualtrics Survey".into()
}

fn d_subject() -> String {
    "Survey invitation".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Embedded data defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Scheduling parameters in the same shape contacts carry them as
/// embedded data. Used as defaults by `schedule` and `distribute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedDataConfig {
    #[serde(rename = "StartDate", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "TimeSlots", default)]
    pub time_slots: Option<SlotSpec>,
    #[serde(rename = "NumDays", default)]
    pub num_days: Option<u32>,
    #[serde(rename = "TimeZone", default)]
    pub time_zone: Option<String>,
    #[serde(rename = "ExpireMinutes", default = "d_expire_minutes")]
    pub expire_minutes: u32,
}

impl Default for EmbeddedDataConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            time_slots: None,
            num_days: None,
            time_zone: None,
            expire_minutes: d_expire_minutes(),
        }
    }
}

fn d_expire_minutes() -> u32 {
    60
}
