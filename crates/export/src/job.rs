//! Export job state machine.
//!
//! The job only records what the remote reported and decides the next step;
//! the poller performs the I/O and the sleeping.

use serde::{Deserialize, Serialize};

/// Lifecycle of one export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Requested,
    Polling,
    Downloading,
    Complete,
    Failed,
}

/// Remote status string, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    InProgress,
    Complete,
    Failed,
    /// Anything else the vendor sends; polled like `InProgress`.
    Unknown(String),
}

impl ExportStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "inProgress" => Self::InProgress,
            "complete" => Self::Complete,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

/// One progress report from the remote (`result` of the progress endpoint).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub status: String,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl ExportProgress {
    pub fn status(&self) -> ExportStatus {
        ExportStatus::parse(&self.status)
    }

    /// The file id, if the vendor sent a non-empty one.
    pub fn ready_file_id(&self) -> Option<&str> {
        self.file_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// What the poller should do after a progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Fetch this file.
    Download(String),
    /// Sleep for retry number `retry` (1-based), then poll again.
    Wait { retry: u32 },
    /// Remote reported `failed`.
    Failed,
    /// Retry budget exhausted.
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportJob {
    pub survey_id: String,
    pub progress_id: String,
    pub status: String,
    pub percent_complete: f64,
    pub file_id: Option<String>,
    /// Non-terminal polls seen so far.
    pub retry_count: u32,
    /// Every poll, terminal or not.
    pub polls: u32,
    pub state: JobState,
}

impl ExportJob {
    pub fn new(survey_id: impl Into<String>) -> Self {
        Self {
            survey_id: survey_id.into(),
            progress_id: String::new(),
            status: String::new(),
            percent_complete: 0.0,
            file_id: None,
            retry_count: 0,
            polls: 0,
            state: JobState::Requested,
        }
    }

    /// The remote accepted the job.
    pub fn submitted(&mut self, progress_id: impl Into<String>) {
        self.progress_id = progress_id.into();
        self.state = JobState::Polling;
    }

    /// Fold one progress report into the job and pick the next step.
    ///
    /// A file id wins over the status string; `complete` without a file id
    /// keeps polling.
    pub fn observe(&mut self, progress: &ExportProgress, max_retries: u32) -> PollStep {
        self.polls += 1;
        self.status = progress.status.clone();
        self.percent_complete = progress.percent_complete;

        if let Some(file_id) = progress.ready_file_id() {
            self.file_id = Some(file_id.to_owned());
            self.state = JobState::Downloading;
            return PollStep::Download(file_id.to_owned());
        }

        if progress.status() == ExportStatus::Failed {
            self.state = JobState::Failed;
            return PollStep::Failed;
        }

        self.retry_count += 1;
        if self.retry_count > max_retries {
            self.state = JobState::Failed;
            return PollStep::TimedOut;
        }
        PollStep::Wait {
            retry: self.retry_count,
        }
    }

    pub fn mark_complete(&mut self) {
        self.state = JobState::Complete;
    }

    pub fn mark_failed(&mut self) {
        self.state = JobState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(status: &str, file_id: Option<&str>) -> ExportProgress {
        ExportProgress {
            status: status.into(),
            percent_complete: 50.0,
            file_id: file_id.map(String::from),
        }
    }

    fn polling_job() -> ExportJob {
        let mut job = ExportJob::new("SV_1");
        job.submitted("ES_1");
        job
    }

    #[test]
    fn submission_moves_to_polling() {
        let job = polling_job();
        assert_eq!(job.state, JobState::Polling);
        assert_eq!(job.progress_id, "ES_1");
    }

    #[test]
    fn file_id_checked_before_status() {
        let mut job = polling_job();
        let step = job.observe(&progress("inProgress", Some("F_1")), 5);
        assert_eq!(step, PollStep::Download("F_1".into()));
        assert_eq!(job.state, JobState::Downloading);
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn in_progress_counts_retries() {
        let mut job = polling_job();
        assert_eq!(job.observe(&progress("inProgress", None), 2), PollStep::Wait { retry: 1 });
        assert_eq!(job.observe(&progress("inProgress", None), 2), PollStep::Wait { retry: 2 });
        assert_eq!(job.observe(&progress("inProgress", None), 2), PollStep::TimedOut);
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.polls, 3);
    }

    #[test]
    fn remote_failure_is_terminal() {
        let mut job = polling_job();
        assert_eq!(job.observe(&progress("failed", None), 5), PollStep::Failed);
        assert_eq!(job.state, JobState::Failed);
    }

    #[test]
    fn complete_without_file_keeps_polling() {
        let mut job = polling_job();
        assert_eq!(job.observe(&progress("complete", None), 5), PollStep::Wait { retry: 1 });
        assert_eq!(job.observe(&progress("complete", Some("")), 5), PollStep::Wait { retry: 2 });
    }

    #[test]
    fn unknown_status_is_polled_like_in_progress() {
        assert_eq!(ExportStatus::parse("queued"), ExportStatus::Unknown("queued".into()));
        let mut job = polling_job();
        assert_eq!(job.observe(&progress("queued", None), 5), PollStep::Wait { retry: 1 });
    }

    #[test]
    fn progress_deserializes_vendor_shape() {
        let p: ExportProgress = serde_json::from_str(
            r#"{"status":"complete","percentComplete":100.0,"fileId":"1dc4-file"}"#,
        )
        .unwrap();
        assert_eq!(p.status(), ExportStatus::Complete);
        assert_eq!(p.ready_file_id(), Some("1dc4-file"));

        let p: ExportProgress = serde_json::from_str(r#"{"status":"inProgress"}"#).unwrap();
        assert_eq!(p.percent_complete, 0.0);
        assert_eq!(p.ready_file_id(), None);
    }
}
