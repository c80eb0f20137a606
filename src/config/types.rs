use crate::component::media_organizer::{DeviceKind, DuplicateHandling, PathElement};
use crate::tools::HashAlgorithm;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 10;

const fn default_true() -> bool {
    true
}

fn default_sidecar_extensions() -> Vec<String> {
    ["xmp", "thm", "aae"].iter().map(|s| (*s).to_string()).collect()
}

/// 篩選器設定：`kind` 省略時與 `id` 相同，`settings` 為該篩選器自己的選項
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub settings: Value,
}

impl FilterDefinition {
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.id)
    }
}

/// 整理預設組合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub folder_structure: Vec<PathElement>,
    pub file_name_pattern: Vec<PathElement>,
    #[serde(default)]
    pub duplicate_handling: DuplicateHandling,
    #[serde(default = "default_true")]
    pub include_associated_files: bool,
    #[serde(default = "default_sidecar_extensions")]
    pub associated_file_extensions: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default = "default_true")]
    pub check_duplicates: bool,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_device: Option<DeviceKind>,
}

impl Preset {
    /// 只有名稱與樣式、其餘皆為預設值的組合
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        folder_structure: Vec<PathElement>,
        file_name_pattern: Vec<PathElement>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            folder_structure,
            file_name_pattern,
            duplicate_handling: DuplicateHandling::default(),
            include_associated_files: true,
            associated_file_extensions: default_sidecar_extensions(),
            filters: Vec::new(),
            hash_algorithm: HashAlgorithm::default(),
            check_duplicates: true,
            recursive: true,
            source_device: None,
        }
    }
}

/// 使用者設定（存於 settings.json）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub recent_source_paths: Vec<String>,
    pub recent_destination_paths: Vec<String>,
    pub selected_preset: Option<String>,
    /// 使用者自訂的組合，同名時取代內建組合
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub builtin_presets: Vec<Preset>,
    pub settings: UserSettings,
}

impl Config {
    /// 內建組合與使用者組合合併後的清單（使用者同名組合優先）
    #[must_use]
    pub fn presets(&self) -> Vec<&Preset> {
        let mut presets: Vec<&Preset> = self
            .builtin_presets
            .iter()
            .map(|builtin| {
                self.settings
                    .presets
                    .iter()
                    .find(|p| p.name == builtin.name)
                    .unwrap_or(builtin)
            })
            .collect();

        presets.extend(
            self.settings
                .presets
                .iter()
                .filter(|p| !self.builtin_presets.iter().any(|b| b.name == p.name)),
        );
        presets
    }

    #[must_use]
    pub fn find_preset(&self, name: &str) -> Option<&Preset> {
        self.presets().into_iter().find(|p| p.name == name)
    }

    /// 使用者選定的組合，未選或已不存在時為第一個組合
    #[must_use]
    pub fn selected_preset(&self) -> Option<&Preset> {
        self.settings
            .selected_preset
            .as_deref()
            .and_then(|name| self.find_preset(name))
            .or_else(|| self.presets().into_iter().next())
    }
}
