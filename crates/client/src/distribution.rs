//! Request bodies for scheduled SMS and email distributions.
//!
//! Everything here is pure; [`crate::QualtricsClient`] only posts the
//! result.

use rand::Rng;
use serde::{Deserialize, Serialize};

use qs_domain::config::EmailHeaderConfig;
use qs_scheduler::{format_vendor_timestamp, ScheduledSend};

/// Who receives a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipients {
    pub mailing_list_id: String,
    /// Contact lookup id within the mailing list.
    pub contact_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub message_text: String,
}

/// `POST /API/v3/distributions/sms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsDistributionRequest {
    pub send_date: String,
    pub survey_link_expiration_date: String,
    pub method: String,
    pub survey_id: String,
    pub name: String,
    pub recipients: Recipients,
    pub message: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailHeader {
    pub from_email: String,
    pub from_name: String,
    pub reply_to_email: String,
    pub subject: String,
}

impl From<&EmailHeaderConfig> for EmailHeader {
    fn from(cfg: &EmailHeaderConfig) -> Self {
        Self {
            from_email: cfg.from_email.clone(),
            from_name: cfg.from_name.clone(),
            reply_to_email: cfg.reply_to_email.clone(),
            subject: cfg.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyLink {
    pub survey_id: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub expiration_date: String,
}

/// `POST /API/v3/distributions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDistributionRequest {
    pub header: EmailHeader,
    pub survey_link: SurveyLink,
    pub send_date: String,
    pub recipients: Recipients,
    pub message: MessageBody,
}

/// What the vendor returns for an accepted distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DistributionReceipt {
    /// Distribution id (`EMD_…` / `SMSD_…`), when the vendor sends one.
    #[serde(default)]
    pub id: Option<String>,
}

/// Random `[ll d ll d ll]` tag: six ASCII letters and two digits.
pub fn random_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"0123456789";

    let mut tag = String::with_capacity(10);
    tag.push('[');
    for class in [LETTERS, LETTERS, DIGITS, LETTERS, LETTERS, DIGITS, LETTERS, LETTERS] {
        tag.push(char::from(class[rng.gen_range(0..class.len())]));
    }
    tag.push(']');
    tag
}

/// Library message text plus a random trailing tag. The vendor drops a
/// message identical to one already sent to the same contact that day.
pub fn tagged_message<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    format!("{text}\n&nbsp;\n\n{}\n", random_tag(rng))
}

pub fn sms_request(
    survey_id: &str,
    recipients: Recipients,
    send: &ScheduledSend,
    message_text: String,
) -> SmsDistributionRequest {
    SmsDistributionRequest {
        send_date: format_vendor_timestamp(send.send_time_utc),
        survey_link_expiration_date: format_vendor_timestamp(send.expire_time_utc),
        method: "Invite".into(),
        survey_id: survey_id.to_owned(),
        name: "SMS message".into(),
        recipients,
        message: MessageBody { message_text },
    }
}

pub fn email_request(
    header: &EmailHeaderConfig,
    survey_id: &str,
    recipients: Recipients,
    send: &ScheduledSend,
    message_text: String,
) -> EmailDistributionRequest {
    EmailDistributionRequest {
        header: header.into(),
        survey_link: SurveyLink {
            survey_id: survey_id.to_owned(),
            link_type: "Individual".into(),
            expiration_date: format_vendor_timestamp(send.expire_time_utc),
        },
        send_date: format_vendor_timestamp(send.send_time_utc),
        recipients,
        message: MessageBody { message_text },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn send() -> ScheduledSend {
        let at = Utc.with_ymd_and_hms(2025, 3, 3, 13, 0, 0).unwrap();
        ScheduledSend {
            send_time_utc: at,
            expire_time_utc: at + chrono::Duration::minutes(60),
        }
    }

    fn recipients() -> Recipients {
        Recipients {
            mailing_list_id: "CG_list".into(),
            contact_id: "CID_1".into(),
        }
    }

    #[test]
    fn tag_shape_is_letters_and_digits() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let tag = random_tag(&mut rng);
            let inner: Vec<char> = tag.trim_start_matches('[').trim_end_matches(']').chars().collect();
            assert_eq!(inner.len(), 8, "{tag}");
            for (i, c) in inner.iter().enumerate() {
                if i == 2 || i == 5 {
                    assert!(c.is_ascii_digit(), "{tag}");
                } else {
                    assert!(c.is_ascii_alphabetic(), "{tag}");
                }
            }
        }
    }

    #[test]
    fn tagged_message_keeps_original_text() {
        let mut rng = StdRng::seed_from_u64(9);
        let text = tagged_message("Please take the survey: ${l://SurveyURL}", &mut rng);
        assert!(text.starts_with("Please take the survey: ${l://SurveyURL}\n&nbsp;\n\n["));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn sms_body_matches_vendor_shape() {
        let body = serde_json::to_value(sms_request("SV_1", recipients(), &send(), "hi".into())).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "sendDate": "2025-03-03T13:00:00Z",
                "surveyLinkExpirationDate": "2025-03-03T14:00:00Z",
                "method": "Invite",
                "surveyId": "SV_1",
                "name": "SMS message",
                "recipients": {"mailingListId": "CG_list", "contactId": "CID_1"},
                "message": {"messageText": "hi"}
            })
        );
    }

    #[test]
    fn email_body_matches_vendor_shape() {
        let header = EmailHeaderConfig::default();
        let body = serde_json::to_value(email_request(
            &header,
            "SV_1",
            recipients(),
            &send(),
            "hello".into(),
        ))
        .unwrap();
        assert_eq!(body["surveyLink"]["type"], "Individual");
        assert_eq!(body["surveyLink"]["expirationDate"], "2025-03-03T14:00:00Z");
        assert_eq!(body["sendDate"], "2025-03-03T13:00:00Z");
        assert_eq!(body["header"]["fromEmail"], "noreply@qualtrics.com");
        assert_eq!(body["header"]["replyToEmail"], "noreply@qualtrics.com");
        assert!(body.get("method").is_none());
    }
}
