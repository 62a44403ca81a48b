//! Export poller against a scripted remote and a recording sleeper.
//!
//! No network and no real sleeping: every test finishes instantly.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::time::Duration;

use qs_domain::error::{Error, Result};
use qs_domain::types::ExportFormat;
use qs_export::artifact::encode_json;
use qs_export::{
    read_json, ExportError, ExportPoller, ExportProgress, ExportRemote, PollSettings, Sleeper,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fakes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedRemote {
    polls: RefCell<VecDeque<ExportProgress>>,
    archive: Vec<u8>,
    poll_calls: Cell<u32>,
    downloads: Cell<u32>,
}

impl ScriptedRemote {
    fn new(polls: Vec<ExportProgress>, archive: Vec<u8>) -> Self {
        Self {
            polls: RefCell::new(polls.into()),
            archive,
            poll_calls: Cell::new(0),
            downloads: Cell::new(0),
        }
    }
}

impl ExportRemote for ScriptedRemote {
    fn start_export(&self, survey_id: &str, _format: ExportFormat) -> Result<String> {
        assert_eq!(survey_id, "SV_test");
        Ok("ES_progress".into())
    }

    fn poll(&self, _survey_id: &str, progress_id: &str) -> Result<ExportProgress> {
        assert_eq!(progress_id, "ES_progress");
        self.poll_calls.set(self.poll_calls.get() + 1);
        // Once the script runs out, the job stays in progress forever.
        Ok(self
            .polls
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| in_progress(99.0)))
    }

    fn download(&self, _survey_id: &str, file_id: &str) -> Result<Vec<u8>> {
        assert_eq!(file_id, "F_file");
        self.downloads.set(self.downloads.get() + 1);
        Ok(self.archive.clone())
    }
}

#[derive(Default)]
struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

fn in_progress(pct: f64) -> ExportProgress {
    ExportProgress {
        status: "inProgress".into(),
        percent_complete: pct,
        file_id: None,
    }
}

fn complete() -> ExportProgress {
    ExportProgress {
        status: "complete".into(),
        percent_complete: 100.0,
        file_id: Some("F_file".into()),
    }
}

fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

const EXPORT_JSON: &[u8] =
    br#"{"responses":[{"responseId":"R_1","values":{"QID1":4}},{"responseId":"R_2","values":{"QID1":2}}]}"#;

fn settings(max_retries: u32) -> PollSettings {
    PollSettings {
        wait_time: Duration::from_millis(250),
        max_retries,
    }
}

fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Polling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn three_in_progress_polls_then_complete() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(
        vec![in_progress(10.0), in_progress(40.0), in_progress(80.0), complete()],
        zip_of(&[("Mood Survey 2025-03-03 10:15:00.json", EXPORT_JSON)]),
    );
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let artifact = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap();

    let w = Duration::from_millis(250);
    assert_eq!(*sleeper.sleeps.borrow(), vec![w, w * 2, w * 4]);
    assert_eq!(remote.poll_calls.get(), 4);
    assert_eq!(remote.downloads.get(), 1);
    assert_eq!(artifact.responses.len(), 2);
    assert_eq!(artifact.file_id, "F_file");
    assert_eq!(
        artifact.path,
        dir.path().join("Mood_Survey_2025-03-03_101500.json")
    );
}

#[test]
fn file_id_before_complete_status_downloads_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let early = ExportProgress {
        status: "inProgress".into(),
        percent_complete: 99.0,
        file_id: Some("F_file".into()),
    };
    let remote = ScriptedRemote::new(vec![early], zip_of(&[("s.json", EXPORT_JSON)]));
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap();
    assert!(sleeper.sleeps.borrow().is_empty());
    assert_eq!(remote.downloads.get(), 1);
}

#[test]
fn never_terminal_times_out_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(vec![], zip_of(&[("s.json", EXPORT_JSON)]));
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(3), dir.path()).with_sleeper(&sleeper);

    let err = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap_err();
    match err {
        ExportError::Timeout {
            progress_id,
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(progress_id, "ES_progress");
            assert_eq!(attempts, 4);
            assert_eq!(last_status, "inProgress");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(sleeper.sleeps.borrow().len(), 3);
    assert_eq!(remote.downloads.get(), 0);
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn remote_failure_is_reported_with_status() {
    let dir = tempfile::tempdir().unwrap();
    let failed = ExportProgress {
        status: "failed".into(),
        percent_complete: 0.0,
        file_id: None,
    };
    let remote = ScriptedRemote::new(vec![in_progress(5.0), failed], Vec::new());
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let err = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Failed { attempts: 2, ref status, .. } if status == "failed"
    ));
    assert_eq!(remote.downloads.get(), 0);
}

#[test]
fn remote_errors_propagate() {
    struct Down;
    impl ExportRemote for Down {
        fn start_export(&self, _: &str, _: ExportFormat) -> Result<String> {
            Err(Error::Api {
                status: 401,
                message: "invalid token".into(),
            })
        }
        fn poll(&self, _: &str, _: &str) -> Result<ExportProgress> {
            unreachable!()
        }
        fn download(&self, _: &str, _: &str) -> Result<Vec<u8>> {
            unreachable!()
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let poller = ExportPoller::new(Down, settings(5), dir.path());
    let err = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap_err();
    assert!(matches!(err, ExportError::Remote(Error::Api { status: 401, .. })));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Download & unpack
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn corrupt_archive_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(vec![complete()], b"PK\x03\x04 truncated".to_vec());
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let err = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap_err();
    assert!(matches!(err, ExportError::Corrupt { ref file_id, .. } if file_id == "F_file"));
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn missing_format_member_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(vec![complete()], zip_of(&[("s.json", EXPORT_JSON)]));
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let err = poller.poll_and_fetch("SV_test", ExportFormat::Csv).unwrap_err();
    assert!(matches!(err, ExportError::Corrupt { .. }));
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn json_artifact_round_trips_byte_stable() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(vec![complete()], zip_of(&[("s.json", EXPORT_JSON)]));
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let artifact = poller.poll_and_fetch("SV_test", ExportFormat::Json).unwrap();
    let written = std::fs::read(&artifact.path).unwrap();

    let reread = read_json(&artifact.path).unwrap();
    assert_eq!(reread["source"], "qualtrics");
    assert_eq!(
        reread["responses"].as_array().unwrap(),
        &artifact.responses
    );
    assert_eq!(encode_json(&reread).unwrap(), written);
    assert!(String::from_utf8(written).unwrap().starts_with("{\n    \""));
}

#[test]
fn csv_export_is_persisted_verbatim() {
    let csv = concat!(
        "ResponseId,Q1\n",
        "Response ID,Mood today\n",
        "\"{\"\"ImportId\"\":\"\"_recordId\"\"}\",\"{\"\"ImportId\"\":\"\"QID1\"\"}\"\n",
        "R_1,4\n",
    );
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedRemote::new(
        vec![complete()],
        zip_of(&[("Mood Survey.csv", csv.as_bytes())]),
    );
    let sleeper = RecordingSleeper::default();
    let poller = ExportPoller::new(&remote, settings(5), dir.path()).with_sleeper(&sleeper);

    let artifact = poller.poll_and_fetch("SV_test", ExportFormat::Csv).unwrap();
    assert_eq!(std::fs::read(&artifact.path).unwrap(), csv.as_bytes());
    assert_eq!(artifact.responses.len(), 1);
    assert_eq!(artifact.responses[0]["Q1"], "4");
}
