use super::date_range::DateRangeFilter;
use super::extension::ExtensionFilter;
use super::file_size::FileSizeFilter;
use super::media_type::MediaTypeFilter;
use super::name_pattern::NamePatternFilter;
use super::screenshot::ScreenshotFilter;
use super::{Filter, FilterChain};
use crate::component::media_organizer::error::OrganizeError;
use crate::config::types::FilterDefinition;
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

/// 以 (id, 設定) 建立篩選器的建構函式
pub type FilterConstructor =
    Box<dyn Fn(&str, &Value) -> Result<Box<dyn Filter>, OrganizeError> + Send + Sync>;

/// 篩選器種類名稱 -> 建構函式
///
/// 以一般值傳遞，不使用全域狀態；自訂篩選器以 [`FilterRegistry::register`] 加入
#[derive(Default)]
pub struct FilterRegistry {
    constructors: BTreeMap<String, FilterConstructor>,
}

fn boxed<F, T>(build: F) -> FilterConstructor
where
    F: Fn(&str, &Value) -> Result<T, OrganizeError> + Send + Sync + 'static,
    T: Filter + 'static,
{
    Box::new(move |id: &str, settings: &Value| Ok(Box::new(build(id, settings)?) as Box<dyn Filter>))
}

impl FilterRegistry {
    /// 空的註冊表
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 含所有內建篩選器的註冊表
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("media_type", boxed(MediaTypeFilter::from_settings));
        registry.register("screenshot", boxed(ScreenshotFilter::from_settings));
        registry.register("date_range", boxed(DateRangeFilter::from_settings));
        registry.register("extension", boxed(ExtensionFilter::from_settings));
        registry.register("file_size", boxed(FileSizeFilter::from_settings));
        registry.register("name_pattern", boxed(NamePatternFilter::from_settings));
        registry
    }

    /// 註冊（或取代）一個篩選器種類
    pub fn register(&mut self, kind: impl Into<String>, constructor: FilterConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// 已註冊的種類名稱（依字母排序）
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        kind: &str,
        id: &str,
        settings: &Value,
    ) -> Result<Box<dyn Filter>, OrganizeError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| OrganizeError::UnknownFilter(kind.to_string()))?;
        constructor(id, settings)
    }

    /// 依設定建立篩選鏈，無法建立的篩選器記錄警告後略過
    #[must_use]
    pub fn build_chain(&self, definitions: &[FilterDefinition]) -> FilterChain {
        let mut chain = FilterChain::new();

        for definition in definitions {
            match self.create(definition.kind(), &definition.id, &definition.settings) {
                Ok(filter) => {
                    info!(
                        "啟用篩選器 {} (優先度 {}): {}",
                        filter.id(),
                        filter.priority(),
                        filter.description()
                    );
                    chain.add_filter(filter);
                }
                Err(e) => warn!("略過篩選器 {}: {e}", definition.id),
            }
        }

        chain
    }
}
