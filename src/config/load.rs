use crate::config::types::{Config, Preset, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 編譯時嵌入的內建整理組合（不需要外部檔案）
const DEFAULT_PRESETS_JSON: &str = include_str!("../data/default_presets.json");

pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let builtin_presets = Self::load_embedded_presets()?;
        let settings = load_settings(Path::new(SETTINGS_FILE)).unwrap_or_else(|e| {
            warn!("無法載入設定，使用預設值: {e:#}");
            UserSettings::default()
        });

        Ok(Self {
            builtin_presets,
            settings,
        })
    }

    /// 從編譯時嵌入的 JSON 載入內建組合
    fn load_embedded_presets() -> Result<Vec<Preset>> {
        serde_json::from_str(DEFAULT_PRESETS_JSON).context("無法解析嵌入的預設組合")
    }
}

/// 讀取設定檔，不存在時回傳預設值
pub fn load_settings(path: &Path) -> Result<UserSettings> {
    if !path.exists() {
        return Ok(UserSettings::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings from {}", path.display()))
}
