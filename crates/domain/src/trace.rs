use serde::Serialize;

/// Structured trace events emitted across all qsched crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SendsScheduled {
        time_zone: String,
        num_days: u32,
        slots: usize,
        sends: usize,
    },
    ExportRequested {
        survey_id: String,
        format: String,
        progress_id: String,
    },
    ExportPolled {
        progress_id: String,
        status: String,
        percent_complete: f64,
        file_ready: bool,
    },
    ExportBackoff {
        progress_id: String,
        retry: u32,
        sleep_ms: u64,
    },
    ExportDownloaded {
        progress_id: String,
        file_id: String,
        bytes: usize,
    },
    ArtifactWritten {
        path: String,
        responses: usize,
    },
    DistributionSubmitted {
        channel: String,
        contact_id: String,
        send_date: String,
        status: u16,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "qs_event");
    }
}
