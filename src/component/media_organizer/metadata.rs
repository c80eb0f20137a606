//! metadata 擷取介面
//!
//! 擷取器只回傳鍵值表，合併到紀錄的工作由 [`apply_metadata`] 負責，
//! 擷取失敗只記錄警告，紀錄保持原狀

use super::file_record::{FileRecord, MediaKind, Metadata};
use crate::tools::get_exif_info;
use anyhow::Result;
use log::{debug, warn};
use rayon::prelude::*;
use std::path::Path;

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Metadata>;
}

/// 透過外部 exiftool 擷取
#[derive(Debug, Clone, Copy, Default)]
pub struct ExiftoolExtractor;

impl MetadataExtractor for ExiftoolExtractor {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Metadata> {
        if kind == MediaKind::Unknown {
            return Ok(Metadata::new());
        }
        get_exif_info(path)
    }
}

/// 不擷取任何 metadata（只依檔案系統資訊整理）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

impl MetadataExtractor for NoopExtractor {
    fn extract(&self, _path: &Path, _kind: MediaKind) -> Result<Metadata> {
        Ok(Metadata::new())
    }
}

/// 擷取並合併 metadata，回傳是否成功
pub fn apply_metadata(record: &mut FileRecord, extractor: &dyn MetadataExtractor) -> bool {
    match extractor.extract(record.source_path(), record.media_kind()) {
        Ok(metadata) => {
            debug!("{}: {} 個 metadata 欄位", record.display_name(), metadata.len());
            record.merge_metadata(metadata);
            true
        }
        Err(e) => {
            warn!("無法擷取 metadata {}: {e:#}", record.source_path().display());
            false
        }
    }
}

/// 平行擷取所有紀錄的 metadata，回傳成功數
pub fn apply_metadata_all(records: &mut [FileRecord], extractor: &dyn MetadataExtractor) -> usize {
    records
        .par_iter_mut()
        .map(|record| usize::from(apply_metadata(record, extractor)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::time::SystemTime;

    struct Fixed;

    impl MetadataExtractor for Fixed {
        fn extract(&self, path: &Path, _kind: MediaKind) -> Result<Metadata> {
            if path.ends_with("broken.png") {
                bail!("corrupt file");
            }
            let mut metadata = Metadata::new();
            metadata.insert("software".to_string(), "Screenshot Utility".to_string());
            Ok(metadata)
        }
    }

    fn record(name: &str) -> FileRecord {
        FileRecord::from_parts(&Path::new("/camera").join(name), 1, SystemTime::UNIX_EPOCH, 0)
    }

    #[test]
    fn test_merge_resets_screenshot_cache() {
        let mut r = record("photo.png");
        assert!(!r.is_screenshot());

        assert!(apply_metadata(&mut r, &Fixed));
        assert!(r.is_screenshot());
    }

    #[test]
    fn test_failure_leaves_record_untouched() {
        let mut r = record("broken.png");
        assert!(!apply_metadata(&mut r, &Fixed));
        assert!(r.metadata().is_empty());
    }

    #[test]
    fn test_apply_all_counts_successes() {
        let mut records = vec![record("a.png"), record("broken.png"), record("c.png")];
        assert_eq!(apply_metadata_all(&mut records, &Fixed), 2);
    }
}
