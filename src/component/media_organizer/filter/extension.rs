use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::FileRecord;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

pub const DEFAULT_PRIORITY: i32 = 15;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionConfig {
    #[serde(flatten)]
    base: FilterBase,
    #[serde(default)]
    include_extensions: Vec<String>,
    #[serde(default)]
    exclude_extensions: Vec<String>,
}

/// 依副檔名過濾（不分大小寫，可寫成 `.jpg` 或 `jpg`）
pub struct ExtensionFilter {
    id: String,
    base: FilterBase,
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

fn normalize(extensions: &[String]) -> BTreeSet<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

impl ExtensionFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        let config: ExtensionConfig = parse_settings(id, settings)?;
        Ok(Self {
            id: id.to_string(),
            include: normalize(&config.include_extensions),
            exclude: normalize(&config.exclude_extensions),
            base: config.base,
        })
    }
}

impl Filter for ExtensionFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Extension Filter"
    }

    fn description(&self) -> String {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        match (self.include.is_empty(), self.exclude.is_empty()) {
            (true, true) => "All extensions".to_string(),
            (false, true) => format!("Include: {}", join(&self.include)),
            (true, false) => format!("Exclude: {}", join(&self.exclude)),
            (false, false) => format!(
                "Include: {}; Exclude: {}",
                join(&self.include),
                join(&self.exclude)
            ),
        }
    }

    fn priority(&self) -> i32 {
        self.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        let extension = record.extension();
        let metadata = metadata_map(json!({ "extension": extension }));

        if self.exclude.contains(extension) {
            return FilterResult::exclude(format!("Excluded extension: {extension}"), metadata);
        }
        if !self.include.is_empty() && !self.include.contains(extension) {
            return FilterResult::exclude(
                format!("Not in included extensions: {extension}"),
                metadata,
            );
        }
        FilterResult::include(metadata)
    }
}
