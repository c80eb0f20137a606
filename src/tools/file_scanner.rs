use super::validate_directory_exists;
use crate::component::media_organizer::FileRecord;
use anyhow::Result;
use log::{debug, warn};
use std::path::Path;
use walkdir::WalkDir;

/// 掃描來源資料夾，建立依探索順序編號的檔案紀錄
///
/// 同一資料夾內依檔名排序，讀取失敗的項目記錄警告後略過
pub fn scan_media_files(source: &Path, recursive: bool) -> Result<Vec<FileRecord>> {
    validate_directory_exists(source)?;

    let mut walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut records = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("無法讀取項目: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match FileRecord::from_path(entry.path(), records.len()) {
            Ok(record) => records.push(record),
            Err(e) => warn!("略過檔案: {e:#}"),
        }
    }

    debug!("掃描 {} 完成，共 {} 個檔案", source.display(), records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_organizer::MediaKind;
    use std::fs;
    use tempfile::TempDir;

    fn create_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("DCIM/100APPLE")).unwrap();
        fs::write(root.join("b.jpg"), b"b").unwrap();
        fs::write(root.join("a.mov"), b"a").unwrap();
        fs::write(root.join("DCIM/100APPLE/IMG_0001.HEIC"), b"heic").unwrap();
        temp_dir
    }

    #[test]
    fn test_scan_recursive_is_sorted_and_indexed() {
        let temp_dir = create_tree();

        let records = scan_media_files(temp_dir.path(), true).unwrap();

        let names: Vec<&str> = records.iter().map(FileRecord::display_name).collect();
        assert_eq!(names, vec!["IMG_0001.HEIC", "a.mov", "b.jpg"]);
        let indices: Vec<usize> = records.iter().map(FileRecord::discovery_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(records[0].media_kind(), MediaKind::Image);
    }

    #[test]
    fn test_scan_top_level_only() {
        let temp_dir = create_tree();

        let records = scan_media_files(temp_dir.path(), false).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let records = scan_media_files(temp_dir.path(), true).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(scan_media_files(Path::new("/nonexistent/source"), true).is_err());
    }
}
