//! Survey response export: submit a job, poll it with bounded exponential
//! backoff, then unpack and persist the result.
//!
//! The vendor is reached through [`ExportRemote`] and waiting goes through
//! [`Sleeper`], so the whole state machine runs against scripted fakes in
//! tests.

pub mod archive;
pub mod artifact;
pub mod backoff;
pub mod error;
pub mod job;
pub mod poller;
pub mod remote;
pub mod sanitize;

pub use artifact::{read_json, ExportArtifact, SOURCE_TAG};
pub use error::ExportError;
pub use job::{ExportJob, ExportProgress, ExportStatus, JobState, PollStep};
pub use poller::{ExportPoller, PollSettings};
pub use remote::{ExportRemote, Sleeper, ThreadSleeper};
