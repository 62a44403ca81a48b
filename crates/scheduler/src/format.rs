use chrono::{DateTime, Utc};

/// Timestamp layout accepted by the vendor's distribution endpoints.
pub const VENDOR_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a UTC instant as `YYYY-MM-DDTHH:MM:SSZ` (second precision, no
/// fractional part, literal `Z`).
pub fn format_vendor_timestamp(at: DateTime<Utc>) -> String {
    at.format(VENDOR_TIMESTAMP_FORMAT).to_string()
}

/// `serialize_with` helper so sends print in the same form they are
/// submitted in.
pub(crate) fn serialize_vendor<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_vendor_timestamp(*at))
}
