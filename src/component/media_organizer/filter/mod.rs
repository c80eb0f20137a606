//! 篩選器
//!
//! 每個篩選器對單一檔案給出「納入 / 排除」判斷，並附上理由與額外資訊。
//! 篩選器依優先度（數字小者先執行）串成 [`FilterChain`]，遇到第一個排除即停止。

mod chain;
pub mod date_range;
pub mod extension;
pub mod file_size;
pub mod media_type;
pub mod name_pattern;
mod registry;
pub mod screenshot;

pub use chain::{ActiveFilter, ExcludedFile, FilterChain, FilterChainSummary, FilterOutcome, FilterStats};
pub use registry::{FilterConstructor, FilterRegistry};

use super::error::OrganizeError;
use super::file_record::FileRecord;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// 單一篩選器的判斷結果
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    pub include: bool,
    /// 排除時必定有值
    pub reason: Option<String>,
    pub metadata: Map<String, Value>,
}

impl FilterResult {
    #[must_use]
    pub fn include(metadata: Map<String, Value>) -> Self {
        Self {
            include: true,
            reason: None,
            metadata,
        }
    }

    #[must_use]
    pub fn exclude(reason: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            include: false,
            reason: Some(reason.into()),
            metadata,
        }
    }
}

/// 篩選器的共同介面
pub trait Filter: Send + Sync {
    /// 設定中的識別碼，也是統計排除數時的鍵
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> String;
    /// 數字越小越先執行
    fn priority(&self) -> i32;
    fn enabled(&self) -> bool;
    /// 判斷失敗時必須回傳該篩選器文件化的預設結果，不可 panic
    fn check(&self, record: &FileRecord) -> FilterResult;
}

/// 所有篩選器共用的 `enabled` / `priority` 設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBase {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: Option<i32>,
}

impl Default for FilterBase {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
        }
    }
}

const fn default_enabled() -> bool {
    true
}

/// 將 JSON 設定解析為篩選器專用的設定結構，`null` 視為空物件
pub(crate) fn parse_settings<T: DeserializeOwned>(
    id: &str,
    settings: &Value,
) -> Result<T, OrganizeError> {
    let value = if settings.is_null() {
        Value::Object(Map::new())
    } else {
        settings.clone()
    };
    serde_json::from_value(value).map_err(|e| OrganizeError::invalid_config(id, e.to_string()))
}

/// 以 `serde_json::json!` 物件建立 metadata map
pub(crate) fn metadata_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
