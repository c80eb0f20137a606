//! 檔案紀錄
//!
//! 每個掃描到的檔案對應一筆 `FileRecord`，在整理流程中逐步補上
//! metadata、目標路徑、關聯檔案與雜湊值

use super::filter::screenshot::{self, ScreenshotSignal};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

/// 由外部 metadata 擷取器產生的鍵值表
pub type Metadata = BTreeMap<String, String>;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "wmv", "m4v", "mts", "m2ts"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "tiff", "tif", "bmp", "heic", "heif",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "m4a"];
const RAW_EXTENSIONS: &[&str] = &["arw", "raw", "cr2", "cr3", "nef", "orf", "rw2", "dng"];

/// 依副檔名推定的媒體種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Raw,
    Unknown,
}

impl MediaKind {
    /// 副檔名需為小寫且不含前導點
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        if VIDEO_EXTENSIONS.contains(&extension) {
            Self::Video
        } else if IMAGE_EXTENSIONS.contains(&extension) {
            Self::Image
        } else if AUDIO_EXTENSIONS.contains(&extension) {
            Self::Audio
        } else if RAW_EXTENSIONS.contains(&extension) {
            Self::Raw
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Raw => "raw",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Image => "圖片",
            Self::Video => "影片",
            Self::Audio => "音訊",
            Self::Raw => "RAW",
            Self::Unknown => "其他",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 來源裝置提示，用於縮小截圖解析度判斷範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[serde(alias = "iOS")]
    Ios,
    #[serde(alias = "Android")]
    Android,
    #[serde(alias = "Camera")]
    Camera,
}

/// 處理狀態，單次執行內只會從 `Pending` 前進
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Copied,
    Skipped,
    Error,
}

impl FileStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    source_path: PathBuf,
    display_name: String,
    extension: String,
    discovery_index: usize,
    size: u64,
    modified: SystemTime,
    media_kind: MediaKind,
    source_device: Option<DeviceKind>,
    metadata: Metadata,
    status: FileStatus,
    error_message: Option<String>,
    target_path: Option<PathBuf>,
    associated_files: Vec<FileRecord>,
    /// 所屬主檔的來源路徑（只做關聯，不擁有）
    parent: Option<PathBuf>,
    content_hash: Option<String>,
    screenshot_cache: OnceLock<Option<ScreenshotSignal>>,
}

impl FileRecord {
    /// 讀取檔案系統資訊建立紀錄
    pub fn from_path(path: &Path, discovery_index: usize) -> Result<Self> {
        let stat =
            fs::metadata(path).with_context(|| format!("無法讀取檔案資訊: {}", path.display()))?;
        let modified = stat
            .modified()
            .with_context(|| format!("無法取得修改時間: {}", path.display()))?;
        Ok(Self::from_parts(path, stat.len(), modified, discovery_index))
    }

    /// 由已知的大小與修改時間建立紀錄（裝置列舉時不一定能 stat）
    #[must_use]
    pub fn from_parts(
        path: &Path,
        size: u64,
        modified: SystemTime,
        discovery_index: usize,
    ) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let media_kind = MediaKind::from_extension(&extension);

        Self {
            source_path: path.to_path_buf(),
            display_name,
            extension,
            discovery_index,
            size,
            modified,
            media_kind,
            source_device: None,
            metadata: Metadata::new(),
            status: FileStatus::Pending,
            error_message: None,
            target_path: None,
            associated_files: Vec::new(),
            parent: None,
            content_hash: None,
            screenshot_cache: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_source_device(mut self, device: Option<DeviceKind>) -> Self {
        self.source_device = device;
        self.screenshot_cache = OnceLock::new();
        self
    }

    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 小寫、不含前導點
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// 不含副檔名的檔名
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn discovery_index(&self) -> usize {
        self.discovery_index
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn modified(&self) -> SystemTime {
        self.modified
    }

    #[must_use]
    pub fn last_modified(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.modified)
    }

    #[must_use]
    pub const fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    #[must_use]
    pub const fn source_device(&self) -> Option<DeviceKind> {
        self.source_device
    }

    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// 取得去除空白後非空的 metadata 值
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// 以新的 metadata 取代現有內容，並清除截圖判定快取
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
        self.reset_screenshot_cache();
    }

    /// 合併 metadata（同名鍵覆寫），並清除截圖判定快取
    pub fn merge_metadata(&mut self, metadata: Metadata) {
        self.metadata.extend(metadata);
        self.reset_screenshot_cache();
    }

    pub fn reset_screenshot_cache(&mut self) {
        self.screenshot_cache = OnceLock::new();
    }

    /// 以預設偵測規則判斷是否為截圖，結果會快取到 metadata 更新為止
    #[must_use]
    pub fn screenshot_signal(&self) -> Option<ScreenshotSignal> {
        *self
            .screenshot_cache
            .get_or_init(|| screenshot::detect_default(self))
    }

    #[must_use]
    pub fn is_screenshot(&self) -> bool {
        self.screenshot_signal().is_some()
    }

    #[must_use]
    pub const fn status(&self) -> FileStatus {
        self.status
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// 設定處理狀態
    ///
    /// 已離開 `Pending` 的紀錄不會再被改回或改成其他狀態，回傳是否有更新
    pub fn set_status(&mut self, status: FileStatus, message: Option<String>) -> bool {
        if self.status.is_terminal() && self.status != status {
            warn!(
                "忽略狀態變更 {:?} -> {:?}: {}",
                self.status,
                status,
                self.source_path.display()
            );
            return false;
        }
        self.status = status;
        if message.is_some() {
            self.error_message = message;
        }
        true
    }

    pub fn mark_copied(&mut self) -> bool {
        self.set_status(FileStatus::Copied, None)
    }

    pub fn mark_skipped(&mut self, reason: impl Into<String>) -> bool {
        self.set_status(FileStatus::Skipped, Some(reason.into()))
    }

    pub fn mark_error(&mut self, message: impl Into<String>) -> bool {
        self.set_status(FileStatus::Error, Some(message.into()))
    }

    #[must_use]
    pub fn is_eligible_for_copy(&self) -> bool {
        self.status == FileStatus::Pending && self.target_path.is_some()
    }

    #[must_use]
    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    pub fn set_target_path(&mut self, path: PathBuf) {
        self.target_path = Some(path);
    }

    #[must_use]
    pub fn associated_files(&self) -> &[FileRecord] {
        &self.associated_files
    }

    pub fn associated_files_mut(&mut self) -> &mut [FileRecord] {
        &mut self.associated_files
    }

    /// 加入關聯檔案（sidecar），關聯只有一層，sidecar 自己的關聯會一併攤平
    pub fn add_associated_file(&mut self, mut sidecar: FileRecord) {
        let nested = std::mem::take(&mut sidecar.associated_files);
        sidecar.parent = Some(self.source_path.clone());
        self.associated_files.push(sidecar);
        for child in nested {
            self.add_associated_file(child);
        }
    }

    /// sidecar 所屬主檔的來源路徑
    #[must_use]
    pub fn parent(&self) -> Option<&Path> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn set_content_hash(&mut self, hash: String) {
        self.content_hash = Some(hash);
    }

    /// 人類可讀的檔案大小
    #[must_use]
    pub fn size_human_readable(&self) -> String {
        format_size(self.size)
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileRecord({}, {}, {:?})",
            self.display_name, self.media_kind, self.status
        )
    }
}

#[must_use]
pub fn format_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    format!("{value:.1} {}", UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn record(name: &str) -> FileRecord {
        FileRecord::from_parts(
            &PathBuf::from("/media/DCIM").join(name),
            1024,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            0,
        )
    }

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(record("a.JPG").media_kind(), MediaKind::Image);
        assert_eq!(record("a.MOV").media_kind(), MediaKind::Video);
        assert_eq!(record("a.flac").media_kind(), MediaKind::Audio);
        assert_eq!(record("a.CR3").media_kind(), MediaKind::Raw);
        assert_eq!(record("a.xmp").media_kind(), MediaKind::Unknown);
        assert_eq!(record("noext").media_kind(), MediaKind::Unknown);
    }

    #[test]
    fn test_extension_is_lowercase_without_dot() {
        let r = record("IMG_0001.HEIC");
        assert_eq!(r.extension(), "heic");
        assert_eq!(r.file_stem(), "IMG_0001");
        assert_eq!(r.display_name(), "IMG_0001.HEIC");
    }

    #[test]
    fn test_from_path_reads_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4");
        fs::write(&path, b"12345").unwrap();

        let r = FileRecord::from_path(&path, 3).unwrap();
        assert_eq!(r.size(), 5);
        assert_eq!(r.discovery_index(), 3);
        assert_eq!(r.status(), FileStatus::Pending);
        assert!(r.target_path().is_none());
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(FileRecord::from_path(Path::new("/nonexistent/file.jpg"), 0).is_err());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        let mut r = record("a.jpg");
        assert!(r.mark_skipped("duplicate path"));
        assert!(!r.mark_copied());
        assert_eq!(r.status(), FileStatus::Skipped);
        assert_eq!(r.error_message(), Some("duplicate path"));
    }

    #[test]
    fn test_metadata_update_resets_screenshot_cache() {
        let mut r = record("photo.png");
        assert!(!r.is_screenshot());

        let mut metadata = Metadata::new();
        metadata.insert("software".to_string(), "Screenshot Tool".to_string());
        r.set_metadata(metadata);

        assert!(r.is_screenshot());
    }

    #[test]
    fn test_screen_resolution_counts_as_screenshot() {
        let mut r = record("photo.png");
        let mut metadata = Metadata::new();
        metadata.insert("width".to_string(), "1125".to_string());
        metadata.insert("height".to_string(), "2436".to_string());
        r.set_metadata(metadata);

        assert_eq!(r.screenshot_signal(), Some(ScreenshotSignal::ResolutionPattern));
    }

    #[test]
    fn test_add_associated_file_sets_parent_and_flattens() {
        let mut primary = record("IMG_1.JPG");
        let mut sidecar = record("IMG_1.XMP");
        sidecar.add_associated_file(record("IMG_1.AAE"));

        primary.add_associated_file(sidecar);

        assert_eq!(primary.associated_files().len(), 2);
        for child in primary.associated_files() {
            assert_eq!(child.parent(), Some(primary.source_path()));
            assert!(child.associated_files().is_empty());
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
