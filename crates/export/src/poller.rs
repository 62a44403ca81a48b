//! Drive an export job from submission to a persisted artifact.

use std::path::{Path, PathBuf};
use std::time::Duration;

use qs_domain::config::ExportConfig;
use qs_domain::trace::TraceEvent;
use qs_domain::types::ExportFormat;

use crate::archive::extract_member;
use crate::artifact::{normalize, persist, ExportArtifact};
use crate::backoff::backoff_delay;
use crate::error::ExportError;
use crate::job::{ExportJob, PollStep};
use crate::remote::{ExportRemote, Sleeper, ThreadSleeper};

/// Retry budget for one export run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Base backoff interval.
    pub wait_time: Duration,
    /// Non-terminal polls tolerated before giving up.
    pub max_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for PollSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            wait_time: config.wait_time(),
            max_retries: config.max_retries,
        }
    }
}

/// One poller per job; blocking throughout.
pub struct ExportPoller<R, S = ThreadSleeper> {
    remote: R,
    sleeper: S,
    settings: PollSettings,
    output_dir: PathBuf,
}

impl<R: ExportRemote> ExportPoller<R, ThreadSleeper> {
    pub fn new(remote: R, settings: PollSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            sleeper: ThreadSleeper,
            settings,
            output_dir: output_dir.into(),
        }
    }
}

impl<R: ExportRemote, S: Sleeper> ExportPoller<R, S> {
    /// Replace the sleeper (tests record instead of sleeping).
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> ExportPoller<R, T> {
        ExportPoller {
            remote: self.remote,
            sleeper,
            settings: self.settings,
            output_dir: self.output_dir,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Submit an export for `survey_id`, poll it with exponential backoff,
    /// download and unpack the result and write the normalized artifact.
    ///
    /// Nothing is written unless every step succeeds.
    pub fn poll_and_fetch(
        &self,
        survey_id: &str,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let mut job = ExportJob::new(survey_id);
        let progress_id = self.remote.start_export(survey_id, format)?;
        job.submitted(progress_id);

        TraceEvent::ExportRequested {
            survey_id: survey_id.to_owned(),
            format: format.to_string(),
            progress_id: job.progress_id.clone(),
        }
        .emit();

        let file_id = self.wait_for_file(&mut job)?;

        let result = self.fetch(&job, &file_id, format);
        match &result {
            Ok(_) => job.mark_complete(),
            Err(e) => {
                job.mark_failed();
                tracing::warn!(
                    progress_id = %job.progress_id,
                    file_id = %file_id,
                    error = %e,
                    "export download failed"
                );
            }
        }
        result
    }

    fn wait_for_file(&self, job: &mut ExportJob) -> Result<String, ExportError> {
        loop {
            let progress = self.remote.poll(&job.survey_id, &job.progress_id)?;
            let step = job.observe(&progress, self.settings.max_retries);

            TraceEvent::ExportPolled {
                progress_id: job.progress_id.clone(),
                status: job.status.clone(),
                percent_complete: job.percent_complete,
                file_ready: matches!(step, PollStep::Download(_)),
            }
            .emit();

            match step {
                PollStep::Download(file_id) => return Ok(file_id),
                PollStep::Failed => {
                    return Err(ExportError::Failed {
                        progress_id: job.progress_id.clone(),
                        attempts: job.polls,
                        status: job.status.clone(),
                    })
                }
                PollStep::TimedOut => {
                    return Err(ExportError::Timeout {
                        progress_id: job.progress_id.clone(),
                        attempts: job.polls,
                        last_status: job.status.clone(),
                        percent_complete: job.percent_complete,
                    })
                }
                PollStep::Wait { retry } => {
                    let delay = backoff_delay(self.settings.wait_time, retry);
                    TraceEvent::ExportBackoff {
                        progress_id: job.progress_id.clone(),
                        retry,
                        sleep_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    }
                    .emit();
                    self.sleeper.sleep(delay);
                }
            }
        }
    }

    fn fetch(
        &self,
        job: &ExportJob,
        file_id: &str,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = self.remote.download(&job.survey_id, file_id)?;
        TraceEvent::ExportDownloaded {
            progress_id: job.progress_id.clone(),
            file_id: file_id.to_owned(),
            bytes: bytes.len(),
        }
        .emit();

        let member = extract_member(&bytes, format, file_id)?;
        let normalized = normalize(&member, format, file_id)?;
        let path = persist(&self.output_dir, &normalized.file_name, &normalized.bytes)?;

        TraceEvent::ArtifactWritten {
            path: path.display().to_string(),
            responses: normalized.responses.len(),
        }
        .emit();

        Ok(ExportArtifact {
            format,
            file_id: file_id.to_owned(),
            path,
            responses: normalized.responses,
        })
    }
}
