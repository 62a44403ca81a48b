//! Hardened unpacking of the vendor's zip export.

use std::io::{Cursor, Read};

use qs_domain::types::ExportFormat;
use zip::ZipArchive;

use crate::error::ExportError;

/// Max uncompressed size of the payload member (default 512 MiB).
fn max_member_bytes() -> u64 {
    std::env::var("QS_EXPORT_MAX_MEMBER_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(512 * 1024 * 1024)
}

/// Max number of entries in the archive.
const MAX_ENTRIES: usize = 10_000;

/// Upper bound on the buffer reserved up front from a member's declared size.
const MAX_PREALLOC: u64 = 1 << 20;

/// Capacity to reserve for a member whose header claims `declared` bytes.
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// The payload file found inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// Name as stored in the archive.
    pub name: String,
    pub data: Vec<u8>,
}

/// Locate and read the single member whose name ends in `.{format}`.
///
/// Any unreadable archive, unsafe member path, oversized member, or a count
/// of matching members other than one is reported as `Corrupt`.
pub fn extract_member(
    bytes: &[u8],
    format: ExportFormat,
    file_id: &str,
) -> Result<ArchiveMember, ExportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExportError::corrupt(file_id, format!("not a zip archive: {e}")))?;

    if archive.len() > MAX_ENTRIES {
        return Err(ExportError::corrupt(
            file_id,
            format!("archive has {} entries (max {MAX_ENTRIES})", archive.len()),
        ));
    }

    let suffix = format!(".{}", format.as_str());
    let mut matching = Vec::new();

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ExportError::corrupt(file_id, format!("entry {index}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        if entry.enclosed_name().is_none() {
            return Err(ExportError::corrupt(
                file_id,
                format!("unsafe member path: {:?}", entry.name()),
            ));
        }
        if entry.name().to_ascii_lowercase().ends_with(&suffix) {
            matching.push(index);
        }
    }

    let index = match matching.as_slice() {
        [index] => *index,
        [] => {
            return Err(ExportError::corrupt(
                file_id,
                format!("no *{suffix} member in archive"),
            ))
        }
        many => {
            return Err(ExportError::corrupt(
                file_id,
                format!("{} *{suffix} members in archive, expected one", many.len()),
            ))
        }
    };

    let limit = max_member_bytes();
    let entry = archive
        .by_index(index)
        .map_err(|e| ExportError::corrupt(file_id, format!("entry {index}: {e}")))?;
    let name = entry.name().to_owned();
    if entry.size() > limit {
        return Err(ExportError::corrupt(
            file_id,
            format!("member {name:?} is {} bytes (max {limit})", entry.size()),
        ));
    }

    // The header size may lie; cap the actual read as well.
    let mut data = Vec::with_capacity(initial_capacity(entry.size()));
    entry
        .take(limit + 1)
        .read_to_end(&mut data)
        .map_err(|e| ExportError::corrupt(file_id, format!("reading {name:?}: {e}")))?;
    if data.len() as u64 > limit {
        return Err(ExportError::corrupt(
            file_id,
            format!("member {name:?} exceeds {limit} bytes"),
        ));
    }

    tracing::debug!(file_id, member = %name, bytes = data.len(), "extracted export member");
    Ok(ArchiveMember { name, data })
}
