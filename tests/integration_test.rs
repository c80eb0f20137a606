//! 整合測試 - 在暫存資料夾中驗證整理流程的各個階段

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};

use media_organize::component::media_organizer::filter::Filter;
use media_organize::component::media_organizer::filter::date_range::DateRangeFilter;
use media_organize::component::media_organizer::filter::screenshot::ScreenshotFilter;
use media_organize::component::media_organizer::{
    AssociationResolver, ConflictResolver, CopyExecutor, DuplicateDetector, DuplicateHandling,
    FileRecord, FileStatus, Metadata, PathElement, PathGenerator, REASON_OLDER_DUPLICATE,
};
use media_organize::component::media_organizer::filter::FilterRegistry;
use media_organize::config::FilterDefinition;
use media_organize::tools::{HashAlgorithm, scan_media_files};
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn flat_generator(destination: &Path) -> PathGenerator {
    PathGenerator::new(destination, vec![], vec![PathElement::OriginalFilename])
}

/// 測試 1: 主檔與 sidecar 的關聯
#[test]
fn test_sidecars_follow_primary() {
    let source = TempDir::new().unwrap();
    let jpg = write(source.path(), "IMG_1.JPG", b"photo");
    write(source.path(), "IMG_1.XMP", b"xmp");
    write(source.path(), "IMG_1.AAE", b"aae");
    write(source.path(), "IMG_2.JPG", b"photo 2");

    let records = scan_media_files(source.path(), true).unwrap();
    assert_eq!(records.len(), 4);

    let resolver = AssociationResolver::new(["xmp", "thm", "aae"]);
    let (primaries, associations) = resolver.link(records);

    assert_eq!(primaries.len(), 2);
    assert_eq!(primaries[0].display_name(), "IMG_1.JPG");
    assert_eq!(primaries[0].associated_files().len(), 2);
    assert!(
        primaries[0]
            .associated_files()
            .iter()
            .all(|s| s.parent() == Some(jpg.as_path()))
    );
    assert!(primaries[1].associated_files().is_empty());
    assert_eq!(associations[&jpg].len(), 2);

    println!("✓ 關聯檔案測試通過");
}

/// 測試 2: 單一檔案失敗不影響其他檔案
#[test]
fn test_copy_failure_is_isolated() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        write(source.path(), name, name.as_bytes());
    }

    let mut records = scan_media_files(source.path(), true).unwrap();
    assert_eq!(flat_generator(destination.path()).assign_targets(&mut records), 0);

    // 掃描後才消失的來源檔
    fs::remove_file(source.path().join("b.mp4")).unwrap();

    let executor = CopyExecutor::new(destination.path(), Arc::new(AtomicBool::new(false)));
    let mut calls = Vec::new();
    let copied = executor
        .run(&mut records, |done, total, _| calls.push((done, total)))
        .unwrap();

    assert_eq!(copied, 3);
    assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert_eq!(records[1].status(), FileStatus::Error);
    assert!(records[1].error_message().is_some());
    for i in [0, 2, 3] {
        assert_eq!(records[i].status(), FileStatus::Copied);
    }
    assert!(destination.path().join("d.mp4").exists());

    println!("✓ 複製失敗隔離測試通過");
}

fn colliding_records(destination: &Path) -> Vec<FileRecord> {
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let target = destination.join("photo.jpg");

    (0..3)
        .map(|i| {
            let mut record = FileRecord::from_parts(
                &PathBuf::from(format!("/card/{i}/photo.jpg")),
                100,
                base + Duration::from_secs([10, 30, 20][i]),
                i,
            );
            record.set_target_path(target.clone());
            record
        })
        .collect()
}

/// 測試 3: rename 策略讓目標路徑互不相同
#[test]
fn test_rename_policy_gives_distinct_targets() {
    let destination = TempDir::new().unwrap();
    let mut records = colliding_records(destination.path());

    let report = ConflictResolver::new(DuplicateHandling::Rename).resolve(&mut records, None);

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.renamed, 2);
    let targets: HashSet<&Path> = records.iter().filter_map(FileRecord::target_path).collect();
    assert_eq!(targets.len(), 3);
    assert_eq!(
        records[0].target_path(),
        Some(destination.path().join("photo.jpg").as_path())
    );
    assert!(records.iter().all(|r| r.status() == FileStatus::Pending));

    println!("✓ 重新命名策略測試通過");
}

/// 測試 4: overwrite 策略保留修改時間最新的檔案
#[test]
fn test_overwrite_policy_keeps_newest() {
    let destination = TempDir::new().unwrap();
    let mut records = colliding_records(destination.path());

    let report = ConflictResolver::new(DuplicateHandling::Overwrite).resolve(&mut records, None);

    assert_eq!(report.skipped, 2);
    assert_eq!(records[1].status(), FileStatus::Pending);
    for i in [0, 2] {
        assert_eq!(records[i].status(), FileStatus::Skipped);
        assert_eq!(records[i].error_message(), Some(REASON_OLDER_DUPLICATE));
    }

    println!("✓ 覆寫策略測試通過");
}

/// 測試 5: iPhone 截圖檔名
#[test]
fn test_screenshot_filter_excludes_iphone_png() {
    let filter = ScreenshotFilter::from_settings("screenshot", &json!({})).unwrap();
    let now = SystemTime::now();

    let screenshot = FileRecord::from_parts(Path::new("/photos/IMG_0001.PNG"), 10, now, 0);
    let photo = FileRecord::from_parts(Path::new("/photos/IMG_0001.JPG"), 10, now, 1);

    let result = filter.check(&screenshot);
    assert!(!result.include);
    assert!(result.reason.unwrap().contains("filename_pattern"));
    assert!(filter.check(&photo).include);

    println!("✓ 截圖篩選測試通過");
}

/// 測試 6: 日期範圍
#[test]
fn test_date_range_filter() {
    let filter = DateRangeFilter::from_settings(
        "date_range",
        &json!({ "startDate": "2024-01-01", "endDate": "2024-12-31" }),
    )
    .unwrap();

    let record_with_date = |date: &str| {
        let mut record =
            FileRecord::from_parts(Path::new("/photos/a.jpg"), 10, SystemTime::now(), 0);
        let mut metadata = Metadata::new();
        metadata.insert("dateTimeOriginal".to_string(), date.to_string());
        record.set_metadata(metadata);
        record
    };

    assert!(filter.check(&record_with_date("2024:03:15 10:00:00")).include);
    let result = filter.check(&record_with_date("2023:12:31 23:59:59"));
    assert!(!result.include);
    assert!(result.reason.unwrap().contains("before start date"));

    println!("✓ 日期範圍測試通過");
}

/// 測試 7: 依設定建立篩選鏈並統計
#[test]
fn test_filter_chain_from_definitions() {
    let registry = FilterRegistry::with_defaults();
    let definitions = vec![
        FilterDefinition {
            id: "screenshot".to_string(),
            kind: None,
            settings: json!({}),
        },
        FilterDefinition {
            id: "videos_only".to_string(),
            kind: Some("media_type".to_string()),
            settings: json!({ "includeTypes": ["video"] }),
        },
        FilterDefinition {
            id: "broken".to_string(),
            kind: Some("no_such_filter".to_string()),
            settings: json!({}),
        },
    ];

    let chain = registry.build_chain(&definitions);
    assert_eq!(chain.len(), 2);

    let now = SystemTime::now();
    let records = vec![
        FileRecord::from_parts(Path::new("/in/clip.mp4"), 1, now, 0),
        FileRecord::from_parts(Path::new("/in/photo.jpg"), 1, now, 1),
        FileRecord::from_parts(Path::new("/in/Screenshot_1.png"), 1, now, 2),
    ];
    let (included, excluded) = chain.partition(records);

    assert_eq!(included.len(), 1);
    assert_eq!(excluded.len(), 2);
    let stats = chain.stats();
    assert_eq!(stats.total_files, 3);
    // media_type 的優先度較高，截圖也先被它排除
    assert_eq!(stats.exclusion_by_filter.get("videos_only"), Some(&2));

    println!("✓ 篩選鏈測試通過");
}

/// 測試 8: 重複內容偵測
#[test]
fn test_duplicate_detection() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    write(source.path(), "a.jpg", b"identical");
    write(source.path(), "b.jpg", b"identical");
    write(source.path(), "c.jpg", b"unique");

    let mut records = scan_media_files(source.path(), true).unwrap();
    flat_generator(destination.path()).assign_targets(&mut records);

    for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
        let mut records = records.clone();
        let groups = DuplicateDetector::new(algorithm).detect(&mut records);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].files,
            vec![source.path().join("a.jpg"), source.path().join("b.jpg")]
        );
        assert_eq!(groups[0].wasted_bytes(), 9);
        assert!(records.iter().all(|r| r.status() == FileStatus::Pending));
    }

    println!("✓ 重複內容偵測測試通過");
}
