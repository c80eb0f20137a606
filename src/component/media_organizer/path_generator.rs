//! 目標路徑產生器
//!
//! 資料夾與檔名各由一串 [`PathElement`] 組成，每個元素都由檔案紀錄算出字串，
//! 清除路徑保留字元後再組合。副檔名一律沿用來源檔案

use super::error::OrganizeError;
use super::file_record::FileRecord;
use super::filter::date_range::parse_datetime;
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const UNKNOWN: &str = "Unknown";
const DEFAULT_FILENAME: &str = "file";
const DATETIME_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";
const DATETIME_FIELDS: &[&str] = &["datetime", "dateTimeOriginal", "dateTimeDigitized"];

const fn default_digits() -> usize {
    3
}

/// 路徑元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathElement {
    Literal {
        value: String,
    },
    /// metadata 欄位；有 `format` 時將值視為日期時間並以 strftime 格式輸出
    Metadata {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// 不含副檔名的原始檔名
    OriginalFilename,
    Sequence {
        #[serde(default = "default_digits")]
        digits: usize,
    },
}

impl PathElement {
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn metadata(field: impl Into<String>) -> Self {
        Self::Metadata {
            field: field.into(),
            format: None,
        }
    }

    #[must_use]
    pub fn metadata_with_format(field: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Metadata {
            field: field.into(),
            format: Some(format.into()),
        }
    }
}

/// 將路徑保留字元 `<>:"/\|?*` 換成底線；只由 `.` 組成的元件（`.`、`..`）換成單一底線
#[must_use]
pub fn sanitize_component(value: &str) -> String {
    let sanitized: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    if is_dots_only(&sanitized) {
        "_".to_string()
    } else {
        sanitized
    }
}

fn is_dots_only(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c == '.')
}

/// 連號計數器，每次 `next` 遞增，可明確重設
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// 一串路徑元素與各自的連號計數器
#[derive(Debug, Default)]
pub struct PathPattern {
    elements: Vec<PathElement>,
    counters: Vec<SequenceCounter>,
}

impl PathPattern {
    #[must_use]
    pub fn new(elements: Vec<PathElement>) -> Self {
        let counters = elements.iter().map(|_| SequenceCounter::default()).collect();
        Self { elements, counters }
    }

    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn reset(&self) {
        self.counters.iter().for_each(SequenceCounter::reset);
    }

    /// 算出每個元素（已清理、非空）的字串
    fn render_parts(&self, record: &FileRecord) -> Result<Vec<String>, OrganizeError> {
        let mut parts = Vec::with_capacity(self.elements.len());
        for (element, counter) in self.elements.iter().zip(&self.counters) {
            let raw = match element {
                PathElement::Literal { value } => value.clone(),
                PathElement::Metadata { field, format } => {
                    resolve_metadata(record, field, format.as_deref())?
                }
                PathElement::OriginalFilename => record.file_stem(),
                PathElement::Sequence { digits } => {
                    format!("{:0width$}", counter.next(), width = *digits)
                }
            };

            let part = sanitize_component(&raw);
            if !part.is_empty() {
                parts.push(part);
            }
        }
        Ok(parts)
    }
}

fn render_error(record: &FileRecord, message: impl Into<String>) -> OrganizeError {
    OrganizeError::Render {
        path: record.source_path().to_path_buf(),
        message: message.into(),
    }
}

fn modified_naive(record: &FileRecord) -> NaiveDateTime {
    record.last_modified().naive_local()
}

/// 可作為日期的 metadata 值，沒有時用修改時間
fn record_datetime(record: &FileRecord, field: &str) -> Option<NaiveDateTime> {
    std::iter::once(field)
        .chain(DATETIME_FIELDS.iter().copied())
        .filter_map(|key| record.metadata_value(key))
        .find_map(parse_datetime)
}

fn format_datetime(
    record: &FileRecord,
    datetime: NaiveDateTime,
    format: &str,
) -> Result<String, OrganizeError> {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(render_error(record, format!("無效的日期格式: {format}")));
    }

    // 時區欄位（%z、%Z）無法套用在不含時區的時間上，寫入時才會失敗
    let mut rendered = String::new();
    write!(rendered, "{}", datetime.format_with_items(items.into_iter()))
        .map_err(|_| render_error(record, format!("無法以此格式輸出日期: {format}")))?;
    Ok(rendered)
}

fn resolve_metadata(
    record: &FileRecord,
    field: &str,
    format: Option<&str>,
) -> Result<String, OrganizeError> {
    if let Some(format) = format {
        let datetime = match record.metadata_value(field) {
            Some(value) => parse_datetime(value).ok_or_else(|| {
                render_error(record, format!("欄位 {field} 的值不是日期: {value}"))
            })?,
            None => record_datetime(record, field).unwrap_or_else(|| modified_naive(record)),
        };
        return format_datetime(record, datetime, format);
    }

    if field == "datetime" {
        let datetime = record_datetime(record, field).unwrap_or_else(|| modified_naive(record));
        return Ok(datetime.format(DATETIME_NAME_FORMAT).to_string());
    }

    if let Some(value) = record.metadata_value(field) {
        return Ok(value.to_string());
    }

    let modified = record.last_modified();
    Ok(match field {
        "year" => modified.format("%Y").to_string(),
        "month" => modified.format("%m").to_string(),
        "day" => modified.format("%d").to_string(),
        _ => UNKNOWN.to_string(),
    })
}

/// 以資料夾樣式、檔名樣式與目的地根目錄產生目標路徑
#[derive(Debug)]
pub struct PathGenerator {
    destination_root: PathBuf,
    folder: PathPattern,
    filename: PathPattern,
}

impl PathGenerator {
    #[must_use]
    pub fn new(
        destination_root: impl Into<PathBuf>,
        folder_structure: Vec<PathElement>,
        file_name_pattern: Vec<PathElement>,
    ) -> Self {
        Self {
            destination_root: destination_root.into(),
            folder: PathPattern::new(folder_structure),
            filename: PathPattern::new(file_name_pattern),
        }
    }

    #[must_use]
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn render_folder(&self, record: &FileRecord) -> Result<PathBuf, OrganizeError> {
        let parts = self.folder.render_parts(record)?;
        Ok(parts
            .iter()
            .fold(self.destination_root.clone(), |path, part| path.join(part)))
    }

    /// 產生含副檔名的檔名；副檔名為空時不加點
    pub fn render_filename(&self, record: &FileRecord) -> Result<String, OrganizeError> {
        let mut name = self.filename.render_parts(record)?.concat();
        if name.is_empty() {
            name = DEFAULT_FILENAME.to_string();
        }
        if !record.extension().is_empty() {
            name.push('.');
            name.push_str(record.extension());
        }
        Ok(name)
    }

    pub fn render_target(&self, record: &FileRecord) -> Result<PathBuf, OrganizeError> {
        let folder = self.render_folder(record)?;
        let filename = self.render_filename(record)?;
        Ok(folder.join(filename))
    }

    /// 重設所有連號，下一次 render 從 1 開始
    pub fn reset_sequences(&self) {
        self.folder.reset();
        self.filename.reset();
    }

    /// 依探索順序為主檔設定目標路徑；sidecar 沿用主檔路徑並換成自己的副檔名
    ///
    /// 無法產生路徑的主檔標記為錯誤（連同其 sidecar），回傳失敗數
    pub fn assign_targets(&self, records: &mut [FileRecord]) -> usize {
        let mut failures = 0;

        for record in records.iter_mut() {
            match self.render_target(record) {
                Ok(target) => {
                    debug!("{} -> {}", record.display_name(), target.display());
                    for sidecar in record.associated_files_mut() {
                        let sidecar_target = if sidecar.extension().is_empty() {
                            target.with_extension("")
                        } else {
                            target.with_extension(sidecar.extension())
                        };
                        sidecar.set_target_path(sidecar_target);
                    }
                    record.set_target_path(target);
                }
                Err(e) => {
                    error!("{e}");
                    failures += 1;
                    let message = e.to_string();
                    for sidecar in record.associated_files_mut() {
                        sidecar.mark_error(format!("主檔無法產生路徑: {message}"));
                    }
                    record.mark_error(message);
                }
            }
        }

        failures
    }
}
