//! Normalizing and persisting the downloaded export.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use qs_domain::types::ExportFormat;

use crate::archive::ArchiveMember;
use crate::error::ExportError;
use crate::sanitize::artifact_file_name;

/// Tag added to every JSON export document.
pub const SOURCE_TAG: &str = "qualtrics";

/// Header row plus two vendor metadata rows (question text, import ids).
const CSV_METADATA_ROWS: usize = 2;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A completed, persisted export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_id: String,
    /// Where the artifact was written.
    pub path: PathBuf,
    /// One object per survey response.
    pub responses: Vec<Value>,
}

/// Artifact contents before they touch the filesystem.
#[derive(Debug, Clone)]
pub struct NormalizedExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub responses: Vec<Value>,
}

/// Turn the archive member into the bytes to persist and the in-memory
/// responses.
pub fn normalize(
    member: &ArchiveMember,
    format: ExportFormat,
    file_id: &str,
) -> Result<NormalizedExport, ExportError> {
    let file_name = artifact_file_name(&member.name).ok_or_else(|| {
        ExportError::corrupt(file_id, format!("member name {:?} is unusable", member.name))
    })?;

    match format {
        ExportFormat::Json => {
            let mut document: Map<String, Value> = serde_json::from_slice(&member.data)
                .map_err(|e| ExportError::corrupt(file_id, format!("invalid JSON: {e}")))?;
            let responses = match document.get("responses") {
                Some(Value::Array(items)) => items.clone(),
                Some(_) => {
                    return Err(ExportError::corrupt(file_id, "`responses` is not an array"))
                }
                None => return Err(ExportError::corrupt(file_id, "no `responses` field")),
            };
            document.insert("source".into(), Value::String(SOURCE_TAG.into()));
            let bytes = encode_json(&document)
                .map_err(|e| ExportError::corrupt(file_id, format!("re-encoding: {e}")))?;
            Ok(NormalizedExport {
                file_name,
                bytes,
                responses,
            })
        }
        ExportFormat::Csv => {
            let responses = parse_csv(&member.data)
                .map_err(|e| ExportError::corrupt(file_id, format!("invalid CSV: {e}")))?;
            Ok(NormalizedExport {
                file_name,
                bytes: member.data.clone(),
                responses,
            })
        }
    }
}

/// Serialize with 4-space indentation. Object keys keep their input order.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Read a persisted JSON artifact back.
pub fn read_json(path: &Path) -> qs_domain::error::Result<Map<String, Value>> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Rows of a vendor CSV export as JSON objects keyed by column header.
pub fn parse_csv(data: &[u8]) -> Result<Vec<Value>, csv::Error> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records().skip(CSV_METADATA_ROWS) {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_owned(), Value::String(v.to_owned())))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Write `bytes` to `dir/file_name` via a temp file in the same directory.
pub fn persist(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let target = dir.join(file_name);
    let write_err = |source| ExportError::Write {
        path: target.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(&target).map_err(|e| write_err(e.error))?;
    Ok(target)
}
