/// Max length for an artifact file name.
pub(crate) const MAX_NAME_LEN: usize = 255;

/// File name an archive member is persisted under.
///
/// Only the final path component is kept; spaces become `_` and colons are
/// dropped (`"Survey 2025-03-03 10:15:00.json"` →
/// `"Survey_2025-03-03_101500.json"`). Returns `None` when nothing usable is
/// left.
pub fn artifact_file_name(member: &str) -> Option<String> {
    let base = member.rsplit(['/', '\\']).next().unwrap_or(member);
    let cleaned: String = base
        .chars()
        .filter(|c| *c != ':')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." || cleaned.len() > MAX_NAME_LEN {
        return None;
    }
    if cleaned.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(cleaned)
}
