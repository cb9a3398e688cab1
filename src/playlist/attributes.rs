//! `key=value` scanning for `#EXTM3U` and `#EXTINF` lines
//!
//! Values are either double-quoted (ending at the next `"`) or bare (ending at
//! whitespace or end of line). A value longer than its field limit is
//! rejected outright rather than cut short.

use tracing::warn;

use super::{MAX_SERVICE_NAME_LENGTH, MAX_URL_LENGTH, is_c_space, truncate_to_char_boundary};
use crate::errors::AttributeError;

/// Extract the value of `key=` from `line`
///
/// The key match is case-sensitive and uses the first occurrence. An empty
/// value is returned as an empty string; callers decide whether that counts.
pub fn extract_attribute(line: &str, key: &str, max_len: usize) -> Result<String, AttributeError> {
    let pattern = format!("{key}=");
    let start = line.find(&pattern).ok_or(AttributeError::Missing)?;
    read_value(&line[start + pattern.len()..], max_len)
}

/// Extract the display name: everything after the last comma, trimmed
///
/// Names longer than the name field are cut at the field limit, matching how
/// the name is stored, while an absent or blank name is an error.
pub fn extract_service_name(line: &str) -> Result<String, AttributeError> {
    let comma = line.rfind(',').ok_or(AttributeError::Missing)?;
    let name = line[comma + 1..].trim_start_matches(is_c_space);
    if name.is_empty() {
        return Err(AttributeError::Empty);
    }

    let name = truncate_to_char_boundary(name, MAX_SERVICE_NAME_LENGTH);
    Ok(name.trim_end_matches(is_c_space).to_string())
}

/// Extract the EPG URL from an `#EXTM3U` header
///
/// Looks for `x-tvg-url=` first and `url-tvg=` second, ignoring case.
pub fn extract_tvg_url(header_line: &str) -> Result<String, AttributeError> {
    let lowered = header_line.to_ascii_lowercase();
    let value_start = ["x-tvg-url=", "url-tvg="]
        .iter()
        .find_map(|key| lowered.find(key).map(|pos| pos + key.len()))
        .ok_or(AttributeError::Missing)?;

    let value = read_value(&header_line[value_start..], MAX_URL_LENGTH)?;
    if value.is_empty() {
        return Err(AttributeError::Empty);
    }
    Ok(value)
}

fn read_value(rest: &str, max_len: usize) -> Result<String, AttributeError> {
    let rest = rest.trim_start_matches(is_c_space);

    let value = match rest.strip_prefix('"') {
        Some(quoted) => {
            let end = quoted.find('"').ok_or(AttributeError::Unterminated)?;
            &quoted[..end]
        }
        None => {
            let end = rest.find(is_c_space).unwrap_or(rest.len());
            &rest[..end]
        }
    };

    if value.len() > max_len {
        return Err(AttributeError::TooLong {
            length: value.len(),
            max: max_len,
        });
    }
    Ok(value.to_string())
}

/// The transient state for one `#EXTINF` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtinfEntry {
    /// `group/name` when a group title is present, else the display name
    pub name: String,
    pub group_title: Option<String>,
    pub catchup_source: Option<String>,
    /// The line exactly as read, emitted later with at most the catchup rewritten
    pub raw_line: String,
}

impl ExtinfEntry {
    /// Parse an `#EXTINF:` line; fails only when the display name is unusable
    pub fn parse(line: &str) -> Result<Self, AttributeError> {
        let base_name = extract_service_name(line)?;

        let group_title = extract_attribute(line, "group-title", MAX_SERVICE_NAME_LENGTH)
            .ok()
            .filter(|group| !group.is_empty());

        let catchup_source = extract_attribute(line, "catchup-source", MAX_URL_LENGTH)
            .ok()
            .filter(|source| !source.is_empty());

        Ok(Self {
            name: compose_service_name(group_title.as_deref(), &base_name),
            group_title,
            catchup_source,
            raw_line: line.to_string(),
        })
    }
}

/// Build `group/name`, shortening the group so the result fits the name field
fn compose_service_name(group: Option<&str>, base_name: &str) -> String {
    let Some(group) = group else {
        return base_name.to_string();
    };

    if group.len() + 1 + base_name.len() <= MAX_SERVICE_NAME_LENGTH {
        return format!("{group}/{base_name}");
    }

    let room = MAX_SERVICE_NAME_LENGTH.saturating_sub(base_name.len() + 1);
    let group = truncate_to_char_boundary(group, room);
    if group.is_empty() {
        warn!("Group title dropped for service: {}", base_name);
        return base_name.to_string();
    }

    warn!("Group title truncated for service: {}", base_name);
    format!("{group}/{base_name}")
}
