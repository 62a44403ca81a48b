use std::time::Duration;

use qs_domain::error::Result;
use qs_domain::types::ExportFormat;

use crate::job::ExportProgress;

/// The vendor endpoints the poller drives.
pub trait ExportRemote {
    /// Submit an export job; returns its progress id.
    fn start_export(&self, survey_id: &str, format: ExportFormat) -> Result<String>;

    fn poll(&self, survey_id: &str, progress_id: &str) -> Result<ExportProgress>;

    /// Raw bytes of the compressed export.
    fn download(&self, survey_id: &str, file_id: &str) -> Result<Vec<u8>>;
}

impl<T: ExportRemote + ?Sized> ExportRemote for &T {
    fn start_export(&self, survey_id: &str, format: ExportFormat) -> Result<String> {
        (**self).start_export(survey_id, format)
    }

    fn poll(&self, survey_id: &str, progress_id: &str) -> Result<ExportProgress> {
        (**self).poll(survey_id, progress_id)
    }

    fn download(&self, survey_id: &str, file_id: &str) -> Result<Vec<u8>> {
        (**self).download(survey_id, file_id)
    }
}

/// Blocking sleep between polls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}
