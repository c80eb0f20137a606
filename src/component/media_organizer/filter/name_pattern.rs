use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::FileRecord;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_PRIORITY: i32 = 40;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamePatternConfig {
    #[serde(flatten)]
    base: FilterBase,
    #[serde(default)]
    exclude_by_filename: Vec<String>,
    #[serde(default)]
    exclude_by_path: Vec<String>,
}

/// 以正規表示式排除檔名或完整路徑（不分大小寫，部分比對）
pub struct NamePatternFilter {
    id: String,
    base: FilterBase,
    filename_patterns: Vec<Regex>,
    path_patterns: Vec<Regex>,
}

fn compile(id: &str, patterns: &[String]) -> Result<Vec<Regex>, OrganizeError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("(?i){p}"))
                .map_err(|e| OrganizeError::invalid_config(id, format!("{p}: {e}")))
        })
        .collect()
}

impl NamePatternFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        let config: NamePatternConfig = parse_settings(id, settings)?;
        Ok(Self {
            id: id.to_string(),
            filename_patterns: compile(id, &config.exclude_by_filename)?,
            path_patterns: compile(id, &config.exclude_by_path)?,
            base: config.base,
        })
    }
}

impl Filter for NamePatternFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Name Pattern Filter"
    }

    fn description(&self) -> String {
        format!(
            "Excludes {} filename pattern(s) and {} path pattern(s)",
            self.filename_patterns.len(),
            self.path_patterns.len()
        )
    }

    fn priority(&self) -> i32 {
        self.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        let filename = record.display_name();
        if let Some(re) = self.filename_patterns.iter().find(|re| re.is_match(filename)) {
            return FilterResult::exclude(
                format!("Filename matches excluded pattern: {}", re.as_str().trim_start_matches("(?i)")),
                metadata_map(json!({ "matched": "filename" })),
            );
        }

        let path = record.source_path().to_string_lossy().replace('\\', "/");
        if let Some(re) = self.path_patterns.iter().find(|re| re.is_match(&path)) {
            return FilterResult::exclude(
                format!("Path matches excluded pattern: {}", re.as_str().trim_start_matches("(?i)")),
                metadata_map(json!({ "matched": "path" })),
            );
        }

        FilterResult::include(Default::default())
    }
}
