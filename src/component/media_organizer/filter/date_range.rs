//! 日期範圍篩選器
//!
//! 以日曆日期比較（含邊界），日期來源依序為：指定的 metadata 欄位、
//! 常見的 EXIF 日期欄位、檔案修改時間（需啟用）

use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::FileRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_PRIORITY: i32 = 30;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y:%m:%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];
const FALLBACK_DATE_FIELDS: &[&str] = &["datetime", "dateTimeOriginal", "dateTimeDigitized"];

/// 解析日期時間字串，容許時區或小數秒等尾端內容；只有日期時視為當天 00:00:00
#[must_use]
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let candidates = [value, value.get(..19).unwrap_or(value), value.get(..10).unwrap_or(value)];
    for candidate in candidates {
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(candidate, format) {
                return Some(dt);
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
    }
    None
}

#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    parse_datetime(value).map(|dt| dt.date())
}

const fn default_true() -> bool {
    true
}

fn default_date_field() -> String {
    "datetime".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeConfig {
    #[serde(flatten)]
    base: FilterBase,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default = "default_true")]
    use_metadata_date: bool,
    #[serde(default)]
    use_file_modified_date: bool,
    #[serde(default = "default_date_field")]
    date_field: String,
}

pub struct DateRangeFilter {
    id: String,
    config: DateRangeConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRangeFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        let config: DateRangeConfig = parse_settings(id, settings)?;

        let bound = |raw: &Option<String>, label: &str| -> Result<Option<NaiveDate>, OrganizeError> {
            match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(s) => parse_date(s)
                    .map(Some)
                    .ok_or_else(|| OrganizeError::invalid_config(id, format!("無效的{label}: {s}"))),
            }
        };
        let start = bound(&config.start_date, "起始日期")?;
        let end = bound(&config.end_date, "結束日期")?;

        Ok(Self {
            id: id.to_string(),
            config,
            start,
            end,
        })
    }

    /// 決定檔案日期與來源
    fn file_date(&self, record: &FileRecord) -> Option<(NaiveDate, &'static str)> {
        if self.config.use_metadata_date {
            let from_metadata = std::iter::once(self.config.date_field.as_str())
                .chain(FALLBACK_DATE_FIELDS.iter().copied())
                .filter_map(|field| record.metadata_value(field))
                .find_map(parse_date);
            if let Some(date) = from_metadata {
                return Some((date, "metadata"));
            }
        }

        if self.config.use_file_modified_date {
            return Some((record.last_modified().date_naive(), "file_modified"));
        }

        None
    }
}

impl Filter for DateRangeFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Date Range Filter"
    }

    fn description(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("Files between {start} and {end}"),
            (Some(start), None) => format!("Files after {start}"),
            (None, Some(end)) => format!("Files before {end}"),
            (None, None) => "All dates".to_string(),
        }
    }

    fn priority(&self) -> i32 {
        self.config.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.config.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        let Some((date, source)) = self.file_date(record) else {
            return FilterResult::include(metadata_map(json!({
                "date_source": "unknown",
                "file_date": null,
            })));
        };

        let metadata = metadata_map(json!({
            "date_source": source,
            "file_date": date.to_string(),
        }));

        if let Some(start) = self.start.filter(|start| date < *start) {
            return FilterResult::exclude(
                format!("File date {date} is before start date {start}"),
                metadata,
            );
        }

        if let Some(end) = self.end.filter(|end| date > *end) {
            return FilterResult::exclude(
                format!("File date {date} is after end date {end}"),
                metadata,
            );
        }

        FilterResult::include(metadata)
    }
}
