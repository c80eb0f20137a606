//! 截圖偵測與截圖篩選器
//!
//! 依序檢查：自訂檔名規則、檔名、路徑、metadata、解析度，
//! 第一個命中的訊號即為偵測方式

use super::{Filter, FilterBase, FilterResult, metadata_map, parse_settings};
use crate::component::media_organizer::error::OrganizeError;
use crate::component::media_organizer::file_record::{DeviceKind, FileRecord, MediaKind};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::LazyLock;

pub const DEFAULT_PRIORITY: i32 = 50;

/// iOS / Android 的檔名規則（比對小寫檔名）
static FILENAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^img_\d{4}\.png$",
        r"^screenshot.*\.png$",
        r"^screenshot_\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}.*\.png$",
        r"^スクリーンショット.*\.png$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

const SCREENSHOT_PATHS: &[&str] = &[
    "/pictures/screenshots/",
    "/dcim/screenshots/",
    "/screenshots/",
    "/screenshot/",
    "/スクリーンショット/",
];

const METADATA_KEYWORDS: &[&str] = &["screenshot", "スクリーンショット"];

const IOS_RESOLUTIONS: &[(u32, u32)] = &[
    (1125, 2436),
    (1242, 2688),
    (828, 1792),
    (750, 1334),
    (1242, 2208),
    (640, 1136),
    (640, 960),
    (320, 480),
    (1668, 2388),
    (2048, 2732),
    (1536, 2048),
];

const ANDROID_RESOLUTIONS: &[(u32, u32)] = &[
    (1080, 1920),
    (1440, 2560),
    (1080, 2340),
    (720, 1280),
    (1080, 2160),
    (1440, 3120),
];

/// 判定為截圖的訊號來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenshotSignal {
    CustomPattern,
    FilenamePattern,
    PathPattern,
    MetadataPattern,
    ResolutionPattern,
}

impl ScreenshotSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomPattern => "custom_pattern",
            Self::FilenamePattern => "filename_pattern",
            Self::PathPattern => "path_pattern",
            Self::MetadataPattern => "metadata_pattern",
            Self::ResolutionPattern => "resolution_pattern",
        }
    }
}

impl fmt::Display for ScreenshotSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析度表的裝置範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenDevice {
    #[default]
    Auto,
    #[serde(alias = "iOS")]
    Ios,
    #[serde(alias = "Android")]
    Android,
}

impl ScreenDevice {
    /// `Auto` 時改用檔案紀錄上的來源裝置提示
    fn resolve(self, record: &FileRecord) -> Self {
        match (self, record.source_device()) {
            (Self::Auto, Some(DeviceKind::Ios)) => Self::Ios,
            (Self::Auto, Some(DeviceKind::Android)) => Self::Android,
            (device, _) => device,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ios => "iOS",
            Self::Android => "Android",
        }
    }
}

pub fn by_filename(record: &FileRecord) -> bool {
    let filename = record.display_name().to_lowercase();
    FILENAME_PATTERNS.iter().any(|re| re.is_match(&filename))
}

pub fn by_path(record: &FileRecord) -> bool {
    let path = record
        .source_path()
        .to_string_lossy()
        .to_lowercase()
        .replace('\\', "/");

    // DCIM 以外的 Pictures 資料夾中的 PNG 多半是 iOS 截圖
    if path.contains("/pictures/") && !path.contains("/dcim/") && record.extension() == "png" {
        return true;
    }

    SCREENSHOT_PATHS.iter().any(|p| path.contains(p))
}

pub fn by_metadata(record: &FileRecord) -> bool {
    ["image_description", "software"].iter().any(|key| {
        record.metadata_value(key).is_some_and(|value| {
            let value = value.to_lowercase();
            METADATA_KEYWORDS.iter().any(|k| value.contains(k))
        })
    })
}

/// 寬高（任一方向）符合已知裝置螢幕解析度的 PNG
pub fn by_resolution(record: &FileRecord, device: ScreenDevice) -> bool {
    if record.extension() != "png" {
        return false;
    }

    let dimension = |key: &str| {
        record
            .metadata_value(key)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
    };
    let (Some(width), Some(height)) = (dimension("width"), dimension("height")) else {
        return false;
    };

    let tables: &[&[(u32, u32)]] = match device.resolve(record) {
        ScreenDevice::Ios => &[IOS_RESOLUTIONS],
        ScreenDevice::Android => &[ANDROID_RESOLUTIONS],
        ScreenDevice::Auto => &[IOS_RESOLUTIONS, ANDROID_RESOLUTIONS],
    };

    tables.iter().flat_map(|t| t.iter()).any(|&(w, h)| {
        (width == w && height == h) || (width == h && height == w)
    })
}

/// 使用全部內建訊號的預設偵測（`FileRecord::is_screenshot` 的快取來源）
#[must_use]
pub fn detect_default(record: &FileRecord) -> Option<ScreenshotSignal> {
    Detection::default().detect(record, &[], ScreenDevice::Auto)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    #[serde(default = "enabled")]
    pub enable_filename_pattern: bool,
    #[serde(default = "enabled")]
    pub enable_path_pattern: bool,
    #[serde(default = "enabled")]
    pub enable_metadata_pattern: bool,
    #[serde(default = "enabled")]
    pub enable_resolution_detection: bool,
    #[serde(default)]
    pub custom_patterns: Vec<String>,
}

const fn enabled() -> bool {
    true
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            enable_filename_pattern: true,
            enable_path_pattern: true,
            enable_metadata_pattern: true,
            enable_resolution_detection: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl Detection {
    fn is_default(&self) -> bool {
        self.enable_filename_pattern
            && self.enable_path_pattern
            && self.enable_metadata_pattern
            && self.enable_resolution_detection
            && self.custom_patterns.is_empty()
    }

    fn detect(
        &self,
        record: &FileRecord,
        custom: &[Regex],
        device: ScreenDevice,
    ) -> Option<ScreenshotSignal> {
        if record.media_kind() != MediaKind::Image {
            return None;
        }

        let filename = record.display_name().to_lowercase();
        if custom.iter().any(|re| re.is_match(&filename)) {
            Some(ScreenshotSignal::CustomPattern)
        } else if self.enable_filename_pattern && by_filename(record) {
            Some(ScreenshotSignal::FilenamePattern)
        } else if self.enable_path_pattern && by_path(record) {
            Some(ScreenshotSignal::PathPattern)
        } else if self.enable_metadata_pattern && by_metadata(record) {
            Some(ScreenshotSignal::MetadataPattern)
        } else if self.enable_resolution_detection && by_resolution(record, device) {
            Some(ScreenshotSignal::ResolutionPattern)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotConfig {
    #[serde(flatten)]
    base: FilterBase,
    #[serde(default = "enabled")]
    exclude_screenshots: bool,
    #[serde(default)]
    device_type: ScreenDevice,
    #[serde(default)]
    detection: Detection,
}

/// 排除截圖的篩選器，只作用於圖片
pub struct ScreenshotFilter {
    id: String,
    config: ScreenshotConfig,
    custom_patterns: Vec<Regex>,
}

impl ScreenshotFilter {
    pub fn from_settings(id: &str, settings: &Value) -> Result<Self, OrganizeError> {
        let config: ScreenshotConfig = parse_settings(id, settings)?;

        // 自訂規則不分大小寫，錨定在檔名開頭
        let custom_patterns = config
            .detection
            .custom_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i)^(?:{p})"))
                    .map_err(|e| OrganizeError::invalid_config(id, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: id.to_string(),
            config,
            custom_patterns,
        })
    }

    fn detect(&self, record: &FileRecord) -> Option<ScreenshotSignal> {
        if self.config.detection.is_default() && self.config.device_type == ScreenDevice::Auto {
            return record.screenshot_signal();
        }
        self.config
            .detection
            .detect(record, &self.custom_patterns, self.config.device_type)
    }
}

impl Filter for ScreenshotFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Screenshot Filter"
    }

    fn description(&self) -> String {
        if !self.config.exclude_screenshots {
            return "Screenshot filtering disabled".to_string();
        }

        let detection = &self.config.detection;
        let methods: Vec<&str> = [
            (detection.enable_filename_pattern, "filename"),
            (detection.enable_path_pattern, "path"),
            (detection.enable_metadata_pattern, "metadata"),
            (detection.enable_resolution_detection, "resolution"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();

        format!(
            "Excludes screenshot files using detection methods: {}",
            methods.join(", ")
        )
    }

    fn priority(&self) -> i32 {
        self.config.base.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    fn enabled(&self) -> bool {
        self.config.base.enabled
    }

    fn check(&self, record: &FileRecord) -> FilterResult {
        if !self.config.exclude_screenshots {
            return FilterResult::include(Default::default());
        }

        if record.media_kind() != MediaKind::Image {
            return FilterResult::include(metadata_map(json!({ "is_screenshot": false })));
        }

        match self.detect(record) {
            Some(signal) => FilterResult::exclude(
                format!("Screenshot detected by {signal}"),
                metadata_map(json!({
                    "is_screenshot": true,
                    "detection_method": signal.as_str(),
                    "device_type": self.config.device_type.as_str(),
                })),
            ),
            None => FilterResult::include(metadata_map(json!({ "is_screenshot": false }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_organizer::file_record::Metadata;
    use std::path::Path;
    use std::time::SystemTime;

    fn record(path: &str) -> FileRecord {
        FileRecord::from_parts(Path::new(path), 10, SystemTime::UNIX_EPOCH, 0)
    }

    fn with_metadata(path: &str, pairs: &[(&str, &str)]) -> FileRecord {
        let mut r = record(path);
        let metadata: Metadata = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        r.set_metadata(metadata);
        r
    }

    fn default_filter() -> ScreenshotFilter {
        ScreenshotFilter::from_settings("screenshot", &Value::Null).unwrap()
    }

    #[test]
    fn test_ios_filename_is_excluded_by_filename_pattern() {
        let result = default_filter().check(&record("/import/DCIM/100APPLE/IMG_0001.PNG"));

        assert!(!result.include);
        assert_eq!(
            result.metadata.get("detection_method"),
            Some(&json!("filename_pattern"))
        );
        assert_eq!(
            result.reason.as_deref(),
            Some("Screenshot detected by filename_pattern")
        );
    }

    #[test]
    fn test_camera_photo_is_included() {
        let result = default_filter().check(&record("/import/DCIM/100APPLE/IMG_0001.JPG"));
        assert!(result.include);
        assert_eq!(result.metadata.get("is_screenshot"), Some(&json!(false)));
    }

    #[test]
    fn test_non_image_is_never_screenshot() {
        let result = default_filter().check(&record("/import/Screenshots/screenshot.mp4"));
        assert!(result.include);
    }

    #[test]
    fn test_path_pattern() {
        let result = default_filter().check(&record("/phone/Pictures/Screenshots/photo.jpg"));
        assert!(!result.include);
        assert_eq!(
            result.metadata.get("detection_method"),
            Some(&json!("path_pattern"))
        );
    }

    #[test]
    fn test_metadata_pattern() {
        let r = with_metadata("/import/photo.jpg", &[("software", "Android Screenshot")]);
        let result = default_filter().check(&r);
        assert_eq!(
            result.metadata.get("detection_method"),
            Some(&json!("metadata_pattern"))
        );
    }

    #[test]
    fn test_resolution_in_either_orientation() {
        let portrait = with_metadata("/import/a.png", &[("width", "1125"), ("height", "2436")]);
        let landscape = with_metadata("/import/b.png", &[("width", "2436"), ("height", "1125")]);
        assert!(by_resolution(&portrait, ScreenDevice::Auto));
        assert!(by_resolution(&landscape, ScreenDevice::Auto));
    }

    #[test]
    fn test_device_hint_narrows_resolution_table() {
        let android = with_metadata("/import/a.png", &[("width", "1080"), ("height", "1920")]);
        assert!(by_resolution(&android, ScreenDevice::Android));
        assert!(!by_resolution(&android, ScreenDevice::Ios));

        let hinted = android.clone().with_source_device(Some(DeviceKind::Ios));
        assert!(!by_resolution(&hinted, ScreenDevice::Auto));
    }

    #[test]
    fn test_custom_pattern_checked_first() {
        let settings = json!({ "detection": { "customPatterns": ["^IMG_\\d+"] } });
        let filter = ScreenshotFilter::from_settings("screenshot", &settings).unwrap();

        let result = filter.check(&record("/import/IMG_0001.PNG"));
        assert_eq!(
            result.metadata.get("detection_method"),
            Some(&json!("custom_pattern"))
        );
    }

    #[test]
    fn test_invalid_custom_pattern_is_config_error() {
        let settings = json!({ "detection": { "customPatterns": ["("] } });
        assert!(ScreenshotFilter::from_settings("screenshot", &settings).is_err());
    }

    #[test]
    fn test_disabled_detection_method() {
        let settings = json!({ "detection": { "enableFilenamePattern": false } });
        let filter = ScreenshotFilter::from_settings("screenshot", &settings).unwrap();
        assert!(filter.check(&record("/import/IMG_0001.PNG")).include);
    }

    #[test]
    fn test_exclude_screenshots_off_passes_everything() {
        let settings = json!({ "excludeScreenshots": false });
        let filter = ScreenshotFilter::from_settings("screenshot", &settings).unwrap();
        assert!(filter.check(&record("/import/IMG_0001.PNG")).include);
        assert_eq!(filter.description(), "Screenshot filtering disabled");
    }
}
