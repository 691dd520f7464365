//! Raw API-reference dataset as produced by the external dump tooling.
//!
//! The shape is `{classes: [...], enums: [...], metadata: {...}}`. Missing keys
//! and `null` values fall back to empty collections, `false` flags or `None`, so
//! the indexer never has to deal with gaps.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{ApidexError, Result};
use crate::index::{EnumItem, MemberType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default, deserialize_with = "nullable")]
    pub classes: Vec<RawClass>,
    #[serde(default, deserialize_with = "nullable")]
    pub enums: Vec<RawEnum>,
    #[serde(default, deserialize_with = "nullable")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClass {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub inherits: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub members: Vec<RawMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMember {
    pub name: String,
    #[serde(default)]
    pub member_type: MemberType,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub unreplicated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub deprecated: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub hidden: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub unscriptable: bool,
    #[serde(default)]
    pub security: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnum {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<EnumItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

impl Metadata {
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("Unknown")
    }
    /// Human readable form of `updated`, relative to `now`.
    /// A missing timestamp is treated as "just now".
    pub fn updated(&self, now: DateTime<Utc>) -> String {
        match &self.updated {
            Some(updated) => format_update_time(updated, now),
            None => format_update_time(&now.to_rfc3339(), now),
        }
    }
}

/// Treats an explicit `null` the same as an absent key.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn from_json_str(json: &str) -> Result<RawDataset> {
    let dataset: RawDataset = serde_json::from_str(json)?;
    Ok(dataset)
}

/// Reads and decodes a dataset file. Any I/O or decoding failure is a `Load` error.
pub fn load(path: impl AsRef<Path>) -> Result<RawDataset> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| ApidexError::Load(format!("Failed to load {}: {e}", path.display())))?;
    let dataset: RawDataset = serde_json::from_slice(&bytes)
        .map_err(|e| ApidexError::Load(format!("Malformed dataset {}: {e}", path.display())))?;
    info!(
        classes = dataset.classes.len(),
        enums = dataset.enums.len(),
        version = dataset.metadata.version(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 { format!("{n} {unit}") } else { format!("{n} {unit}s") }
}

/// Formats an RFC 3339 timestamp as e.g. `Mar 4, 2025, 01:30 PM UTC (2 days and 3 hours ago)`.
/// Unparsable input is returned unchanged.
pub fn format_update_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(date) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let date = date.with_timezone(&Utc);
    let diff = now.signed_duration_since(date);
    let days = diff.num_days();
    let hours = diff.num_hours() - days * 24;
    let ago = if days > 0 {
        if hours > 0 {
            format!("{} and {}", plural(days, "day"), plural(hours, "hour"))
        } else {
            plural(days, "day")
        }
    } else if hours > 0 {
        plural(hours, "hour")
    } else {
        "less than an hour".to_string()
    };
    format!("{} ({ago} ago)", date.format("%b %-d, %Y, %I:%M %p UTC"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_are_empty() {
        let dataset = from_json_str("{}").unwrap();
        assert!(dataset.classes.is_empty());
        assert!(dataset.enums.is_empty());
        assert_eq!(dataset.metadata.version(), "Unknown");
    }

    #[test]
    fn nulls_default() {
        let json = r#"{"classes": [{"name": "Part", "inherits": null, "members": [
            {"name": "Size", "member_type": "Property", "value_type": null, "deprecated": null}
        ]}], "enums": null}"#;
        let dataset = from_json_str(json).unwrap();
        let member = &dataset.classes[0].members[0];
        assert!(dataset.classes[0].inherits.is_empty());
        assert!(!member.deprecated);
        assert_eq!(member.value_type, None);
    }

    #[test]
    fn malformed_is_load_error() {
        let err = from_json_str("{\"classes\": 5}").unwrap_err();
        assert!(matches!(err, ApidexError::Load(_)));
        let err = load("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err}").contains("Failed to load"));
    }

    #[test]
    fn update_time_is_relative() {
        let now = DateTime::parse_from_rfc3339("2025-03-06T16:30:00Z").unwrap().with_timezone(&Utc);
        let formatted = format_update_time("2025-03-04T13:30:00Z", now);
        assert_eq!(formatted, "Mar 4, 2025, 01:30 PM UTC (2 days and 3 hours ago)");
        assert!(format_update_time("2025-03-06T16:00:00Z", now).ends_with("(less than an hour ago)"));
        assert!(format_update_time("2025-03-05T16:30:00Z", now).ends_with("(1 day ago)"));
        assert_eq!(format_update_time("yesterday", now), "yesterday");
    }
}
