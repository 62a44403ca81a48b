//! Blocking REST client for the survey vendor's v3 API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use qs_domain::config::AccountConfig;
use qs_domain::error::{Error, Result};
use qs_domain::trace::TraceEvent;
use qs_domain::types::ExportFormat;
use qs_export::{ExportProgress, ExportRemote};

use crate::distribution::{DistributionReceipt, EmailDistributionRequest, SmsDistributionRequest};

/// Longest body excerpt carried in an error.
const ERROR_BODY_CHARS: usize = 200;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One client per account; every call blocks the calling thread.
#[derive(Debug, Clone)]
pub struct QualtricsClient {
    http: Client,
    base_url: String,
    token: String,
}

impl QualtricsClient {
    /// Build a client for the account's data center.
    pub fn new(account: &AccountConfig, token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(account.base_url(), token, account.verify_tls)
    }

    /// Build a client against an explicit base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        verify_tls: bool,
    ) -> Result<Self> {
        // Only the poll loop's retry budget bounds an export, not the
        // individual request.
        let http = Client::builder()
            .timeout(None::<Duration>)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the API token, send, and turn non-2xx replies into errors.
    fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let resp = rb
            .header("x-api-token", &self.token)
            .send()
            .map_err(|e| Error::Http(format!("{endpoint}: {e}")))?;

        let status = resp.status();
        tracing::debug!(endpoint, status = status.as_u16(), "vendor call");
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }

    fn json<T: DeserializeOwned>(&self, endpoint: &str, resp: Response) -> Result<T> {
        let body = resp
            .text()
            .map_err(|e| Error::Http(format!("{endpoint}: reading body: {e}")))?;
        serde_json::from_str(&body).map_err(|e| Error::Protocol {
            endpoint: endpoint.to_owned(),
            message: format!("{e}: {}", excerpt(&body)),
        })
    }

    fn export_path(survey_id: &str) -> String {
        format!("/API/v3/surveys/{survey_id}/export-responses/")
    }

    // ── library messages ─────────────────────────────────────────────

    /// English text of a library message.
    pub fn library_message(&self, library_id: &str, message_id: &str) -> Result<String> {
        let endpoint = "GET /API/v3/libraries/{id}/messages/{id}";
        let url = self.url(&format!("/API/v3/libraries/{library_id}/messages/{message_id}"));
        let resp = self.execute(endpoint, self.http.get(&url))?;
        let body: Envelope<LibraryMessage> = self.json(endpoint, resp)?;
        Ok(body.result.messages.en)
    }

    // ── distributions ────────────────────────────────────────────────

    pub fn send_sms_distribution(&self, req: &SmsDistributionRequest) -> Result<DistributionReceipt> {
        self.submit_distribution(
            "POST /API/v3/distributions/sms",
            "/API/v3/distributions/sms",
            "sms",
            req,
            &req.recipients.contact_id,
            &req.send_date,
        )
    }

    pub fn send_email_distribution(
        &self,
        req: &EmailDistributionRequest,
    ) -> Result<DistributionReceipt> {
        self.submit_distribution(
            "POST /API/v3/distributions",
            "/API/v3/distributions",
            "email",
            req,
            &req.recipients.contact_id,
            &req.send_date,
        )
    }

    fn submit_distribution<B: Serialize>(
        &self,
        endpoint: &str,
        path: &str,
        channel: &str,
        body: &B,
        contact_id: &str,
        send_date: &str,
    ) -> Result<DistributionReceipt> {
        let url = self.url(path);
        let resp = self.execute(endpoint, self.http.post(&url).json(body))?;
        let status = resp.status().as_u16();
        let envelope: ReceiptEnvelope = self.json(endpoint, resp)?;

        TraceEvent::DistributionSubmitted {
            channel: channel.to_owned(),
            contact_id: contact_id.to_owned(),
            send_date: send_date.to_owned(),
            status,
        }
        .emit();

        Ok(envelope.result)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Export endpoints
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl ExportRemote for QualtricsClient {
    fn start_export(&self, survey_id: &str, format: ExportFormat) -> Result<String> {
        let endpoint = "POST /API/v3/surveys/{id}/export-responses/";
        let url = self.url(&Self::export_path(survey_id));
        let resp = self.execute(
            endpoint,
            self.http.post(&url).json(&StartExport { format }),
        )?;
        let body: Envelope<ExportStarted> = self.json(endpoint, resp)?;
        Ok(body.result.progress_id)
    }

    fn poll(&self, survey_id: &str, progress_id: &str) -> Result<ExportProgress> {
        let endpoint = "GET /API/v3/surveys/{id}/export-responses/{progressId}";
        let url = self.url(&format!("{}{progress_id}", Self::export_path(survey_id)));
        let resp = self.execute(endpoint, self.http.get(&url))?;
        let body: Envelope<ExportProgress> = self.json(endpoint, resp)?;
        Ok(body.result)
    }

    fn download(&self, survey_id: &str, file_id: &str) -> Result<Vec<u8>> {
        let endpoint = "GET /API/v3/surveys/{id}/export-responses/{fileId}/file";
        let url = self.url(&format!("{}{file_id}/file", Self::export_path(survey_id)));
        let resp = self.execute(endpoint, self.http.get(&url))?;
        let bytes = resp
            .bytes()
            .map_err(|e| Error::Http(format!("{endpoint}: reading body: {e}")))?;
        Ok(bytes.to_vec())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Distribution replies may omit `result`.
#[derive(Debug, Deserialize)]
struct ReceiptEnvelope {
    #[serde(default)]
    result: DistributionReceipt,
}

#[derive(Debug, Serialize)]
struct StartExport {
    format: ExportFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportStarted {
    progress_id: String,
}

#[derive(Debug, Deserialize)]
struct LibraryMessage {
    messages: LocalizedText,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    en: String,
}

/// Map a non-2xx reply: the vendor's `meta.error.errorMessage` when present,
/// otherwise the start of the body.
pub fn api_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/meta/error/errorMessage")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| excerpt(body));
    Error::Api { status, message }
}

fn excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_prefers_vendor_message() {
        let body = r#"{"meta":{"httpStatus":"400 - Bad Request","error":{"errorMessage":"Invalid surveyId","errorCode":"RCE_01"}}}"#;
        match api_error(400, body) {
            Error::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid surveyId");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_error_falls_back_to_body_excerpt() {
        let body = "x".repeat(500);
        match api_error(502, &body) {
            Error::Api { message, .. } => assert_eq!(message.len(), ERROR_BODY_CHARS),
            other => panic!("unexpected {other:?}"),
        }
        match api_error(500, r#"{"meta":{"error":{"errorMessage":""}}}"#) {
            Error::Api { message, .. } => assert!(message.starts_with("{\"meta\"")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = QualtricsClient::with_base_url("https://yul1.qualtrics.com/", "t", true).unwrap();
        assert_eq!(client.base_url(), "https://yul1.qualtrics.com");
        assert_eq!(
            client.url(&QualtricsClient::export_path("SV_1")),
            "https://yul1.qualtrics.com/API/v3/surveys/SV_1/export-responses/"
        );
    }

    #[test]
    fn start_export_body_uses_lowercase_format() {
        let body = serde_json::to_value(StartExport { format: ExportFormat::Csv }).unwrap();
        assert_eq!(body, serde_json::json!({"format": "csv"}));
    }
}
