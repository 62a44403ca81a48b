use std::path::PathBuf;

/// Why an export run ended without an artifact.
///
/// `Timeout` and `Failed` are remote outcomes; `Corrupt` means the remote
/// job succeeded but the downloaded file could not be used locally.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(
        "export {progress_id} still not ready after {attempts} polls \
         (last status {last_status:?}, {percent_complete}% complete)"
    )]
    Timeout {
        progress_id: String,
        attempts: u32,
        last_status: String,
        percent_complete: f64,
    },

    #[error("export {progress_id} failed remotely after {attempts} polls (status {status:?})")]
    Failed {
        progress_id: String,
        attempts: u32,
        status: String,
    },

    #[error("export file {file_id} is unusable: {reason}")]
    Corrupt { file_id: String, reason: String },

    #[error(transparent)]
    Remote(#[from] qs_domain::error::Error),

    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub(crate) fn corrupt(file_id: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            file_id: file_id.to_owned(),
            reason: reason.into(),
        }
    }
}
