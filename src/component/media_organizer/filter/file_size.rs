use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::{FileRecord, format_size};
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_PRIORITY: i32 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileSizeConfig {
    #[serde(flatten)]
    base: FilterBase,
    /// 位元組
    #[serde(default)]
    min_size: Option<u64>,
    #[serde(default)]
    max_size: Option<u64>,
}

/// 依檔案大小（位元組，含邊界）過濾
pub struct FileSizeFilter {
    id: String,
    config: FileSizeConfig,
}

impl FileSizeFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        let config: FileSizeConfig = parse_settings(id, settings)?;
        if let (Some(min), Some(max)) = (config.min_size, config.max_size) {
            if min > max {
                return Err(OrganizeError::invalid_config(
                    id,
                    format!("最小值 {min} 大於最大值 {max}"),
                ));
            }
        }
        Ok(Self {
            id: id.to_string(),
            config,
        })
    }
}

impl Filter for FileSizeFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "File Size Filter"
    }

    fn description(&self) -> String {
        match (self.config.min_size, self.config.max_size) {
            (Some(min), Some(max)) => {
                format!("Files between {} and {}", format_size(min), format_size(max))
            }
            (Some(min), None) => format!("Files larger than {}", format_size(min)),
            (None, Some(max)) => format!("Files smaller than {}", format_size(max)),
            (None, None) => "All file sizes".to_string(),
        }
    }

    fn priority(&self) -> i32 {
        self.config.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.config.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        let size = record.size();
        let metadata = metadata_map(json!({ "file_size": size }));

        if let Some(min) = self.config.min_size.filter(|min| size < *min) {
            return FilterResult::exclude(
                format!(
                    "File size {} is smaller than minimum {}",
                    format_size(size),
                    format_size(min)
                ),
                metadata,
            );
        }
        if let Some(max) = self.config.max_size.filter(|max| size > *max) {
            return FilterResult::exclude(
                format!(
                    "File size {} is larger than maximum {}",
                    format_size(size),
                    format_size(max)
                ),
                metadata,
            );
        }
        FilterResult::include(metadata)
    }
}
