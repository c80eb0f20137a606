use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::{FileRecord, MediaKind};
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaTypeConfig {
    #[serde(flatten)]
    base: FilterBase,
    #[serde(default)]
    include_types: Vec<MediaKind>,
    #[serde(default)]
    exclude_types: Vec<MediaKind>,
}

/// 依媒體種類納入或排除，排除清單優先於納入清單
pub struct MediaTypeFilter {
    id: String,
    config: MediaTypeConfig,
}

impl MediaTypeFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        Ok(Self {
            id: id.to_string(),
            config: parse_settings(id, settings)?,
        })
    }
}

fn join_kinds(kinds: &[MediaKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Filter for MediaTypeFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Media Type Filter"
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if !self.config.include_types.is_empty() {
            parts.push(format!("Include: {}", join_kinds(&self.config.include_types)));
        }
        if !self.config.exclude_types.is_empty() {
            parts.push(format!("Exclude: {}", join_kinds(&self.config.exclude_types)));
        }
        if parts.is_empty() {
            "All media types".to_string()
        } else {
            parts.join("; ")
        }
    }

    fn priority(&self) -> i32 {
        self.config.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.config.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        let kind = record.media_kind();
        let metadata = metadata_map(json!({ "media_type": kind.as_str() }));

        if self.config.exclude_types.contains(&kind) {
            return FilterResult::exclude(format!("Excluded media type: {kind}"), metadata);
        }

        if !self.config.include_types.is_empty() && !self.config.include_types.contains(&kind) {
            return FilterResult::exclude(format!("Not in included media types: {kind}"), metadata);
        }

        FilterResult::include(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::SystemTime;

    fn record(name: &str) -> FileRecord {
        FileRecord::from_parts(Path::new(name), 1, SystemTime::UNIX_EPOCH, 0)
    }

    #[test]
    fn test_empty_config_accepts_everything() {
        let filter = MediaTypeFilter::from_settings("media", &Value::Null).unwrap();
        assert!(filter.check(&record("a.jpg")).include);
        assert!(filter.check(&record("a.xyz")).include);
        assert_eq!(filter.description(), "All media types");
    }

    #[test]
    fn test_include_list() {
        let settings = json!({ "includeTypes": ["image", "video"] });
        let filter = MediaTypeFilter::from_settings("media", &settings).unwrap();

        assert!(filter.check(&record("a.mov")).include);
        let result = filter.check(&record("a.mp3"));
        assert!(!result.include);
        assert_eq!(
            result.reason.as_deref(),
            Some("Not in included media types: audio")
        );
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let settings = json!({ "includeTypes": ["image"], "excludeTypes": ["image"] });
        let filter = MediaTypeFilter::from_settings("media", &settings).unwrap();

        let result = filter.check(&record("a.png"));
        assert_eq!(result.reason.as_deref(), Some("Excluded media type: image"));
    }

    #[test]
    fn test_unknown_media_kind_is_config_error() {
        let settings = json!({ "includeTypes": ["hologram"] });
        assert!(matches!(
            MediaTypeFilter::from_settings("media", &settings),
            Err(OrganizeError::InvalidFilterConfig { .. })
        ));
    }

    #[test]
    fn test_priority_override() {
        let settings = json!({ "priority": 3, "enabled": false });
        let filter = MediaTypeFilter::from_settings("media", &settings).unwrap();
        assert_eq!(filter.priority(), 3);
        assert!(!filter.enabled());
    }
}
