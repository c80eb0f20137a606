//! 整理流程
//!
//! 掃描 → 擷取 metadata → 篩選 → 建立關聯 → 產生目標路徑 → 處理衝突 →
//! 重複內容報告 → 複製。`plan()` 執行到複製之前，讓介面可以先預覽與確認；
//! `execute()` 才真正寫入目的地。

use super::association::{AssociationMap, AssociationResolver, group_key};
use super::conflict_resolver::{
    ConflictReport, ConflictResolver, DuplicateHandling, InteractiveResolver,
};
use super::copy_executor::CopyExecutor;
use super::duplicate_detector::{DuplicateDetector, DuplicateGroup};
use super::error::OrganizeError;
use super::file_record::{FileRecord, FileStatus, MediaKind};
use super::filter::{ExcludedFile, FilterRegistry, FilterStats};
use super::metadata::{ExiftoolExtractor, MetadataExtractor, apply_metadata_all};
use super::path_generator::PathGenerator;
use crate::config::Preset;
use crate::tools::{scan_media_files, validate_source_and_destination};
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 主檔被排除時，跟著被排除的 sidecar 所記錄的原因
pub const REASON_PRIMARY_EXCLUDED: &str = "primary excluded";

/// 一次整理的完整結果
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// 通過篩選的主檔（依探索順序，sidecar 掛在主檔下）
    pub records: Vec<FileRecord>,
    pub excluded: Vec<ExcludedFile>,
    pub filter_stats: FilterStats,
    pub associations: AssociationMap,
    pub conflicts: ConflictReport,
    pub duplicates: Vec<DuplicateGroup>,
    /// 無法產生目標路徑的主檔數
    pub render_failures: usize,
    pub copied: usize,
    pub cancelled: bool,
}

impl PipelineReport {
    /// 所有紀錄（含 sidecar）
    pub fn all_records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records
            .iter()
            .flat_map(|r| std::iter::once(r).chain(r.associated_files()))
    }

    /// 依媒體種類統計主檔數
    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<MediaKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.media_kind()).or_insert(0) += 1;
        }
        counts
    }

    /// 依狀態統計所有紀錄（含 sidecar）
    #[must_use]
    pub fn count_by_status(&self) -> HashMap<FileStatus, usize> {
        let mut counts = HashMap::new();
        for record in self.all_records() {
            *counts.entry(record.status()).or_insert(0) += 1;
        }
        counts
    }

    /// 仍待複製的紀錄數（含 sidecar）
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.all_records()
            .filter(|r| r.is_eligible_for_copy())
            .count()
    }

    /// 待複製紀錄的總大小
    #[must_use]
    pub fn pending_bytes(&self) -> u64 {
        self.all_records()
            .filter(|r| r.is_eligible_for_copy())
            .map(FileRecord::size)
            .sum()
    }
}

/// 以單一組合整理一個來源資料夾
pub struct OrganizePipeline {
    preset: Preset,
    source: PathBuf,
    destination: PathBuf,
    shutdown_signal: Arc<AtomicBool>,
    extractor: Box<dyn MetadataExtractor>,
    registry: FilterRegistry,
}

impl OrganizePipeline {
    #[must_use]
    pub fn new(
        preset: Preset,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            preset,
            source: source.into(),
            destination: destination.into(),
            shutdown_signal,
            extractor: Box::new(ExiftoolExtractor),
            registry: FilterRegistry::with_defaults(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// 替換篩選器登錄表（用於加入自訂篩選器）
    #[must_use]
    pub fn with_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn preset(&self) -> &Preset {
        &self.preset
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(OrganizeError::Cancelled.into());
        }
        Ok(())
    }

    /// 執行複製以外的所有步驟
    ///
    /// `ask` 策略沒有提供 `interactive` 時改用 `skip`
    pub fn plan(&self, interactive: Option<&mut dyn InteractiveResolver>) -> Result<PipelineReport> {
        let preset = &self.preset;
        validate_source_and_destination(&self.source, &self.destination, preset.recursive)?;

        info!("使用組合「{}」掃描: {}", preset.name, self.source.display());
        let mut records: Vec<FileRecord> = scan_media_files(&self.source, preset.recursive)?
            .into_iter()
            .map(|r| r.with_source_device(preset.source_device))
            .collect();
        info!("掃描到 {} 個檔案", records.len());
        self.check_cancelled()?;

        let extracted = apply_metadata_all(&mut records, self.extractor.as_ref());
        info!("已擷取 {extracted}/{} 個檔案的 metadata", records.len());
        self.check_cancelled()?;

        let associations = if preset.include_associated_files {
            AssociationResolver::new(&preset.associated_file_extensions)
        } else {
            AssociationResolver::new(Vec::<String>::new())
        };
        let (sidecars, candidates): (Vec<FileRecord>, Vec<FileRecord>) = records
            .into_iter()
            .partition(|r| associations.is_sidecar(r));

        let chain = self.registry.build_chain(&preset.filters);
        let (included, mut excluded) = chain.partition(candidates);
        let filter_stats = chain.stats();
        info!(
            "篩選結果: {} 個保留、{} 個排除",
            filter_stats.included_files, filter_stats.excluded_files
        );

        let sidecars = drop_orphaned_sidecars(sidecars, &included, &mut excluded);

        let mut linked = included;
        linked.extend(sidecars);
        let (mut records, association_map) = associations.link(linked);

        let generator = PathGenerator::new(
            &self.destination,
            preset.folder_structure.clone(),
            preset.file_name_pattern.clone(),
        );
        let render_failures = generator.assign_targets(&mut records);
        if render_failures > 0 {
            warn!("{render_failures} 個檔案無法產生目標路徑");
        }

        let policy = if preset.duplicate_handling == DuplicateHandling::Ask && interactive.is_none()
        {
            warn!("沒有可詢問的對象，衝突改為略過處理");
            DuplicateHandling::Skip
        } else {
            preset.duplicate_handling
        };
        let conflicts = ConflictResolver::new(policy).resolve(&mut records, interactive);

        let duplicates = if preset.check_duplicates {
            DuplicateDetector::new(preset.hash_algorithm)
                .with_shutdown_signal(Arc::clone(&self.shutdown_signal))
                .detect(&mut records)
        } else {
            Vec::new()
        };
        self.check_cancelled()?;

        Ok(PipelineReport {
            records,
            excluded,
            filter_stats,
            associations: association_map,
            conflicts,
            duplicates,
            render_failures,
            copied: 0,
            cancelled: false,
        })
    }

    /// 依計畫複製，`progress(已處理, 總數, 檔名)` 每個主檔呼叫一次
    pub fn execute<F>(&self, report: &mut PipelineReport, progress: F) -> Result<usize, OrganizeError>
    where
        F: FnMut(usize, usize, &str),
    {
        let executor = CopyExecutor::new(&self.destination, Arc::clone(&self.shutdown_signal));
        let copied = executor.run(&mut report.records, progress)?;

        report.copied = copied;
        report.cancelled = self.is_cancelled();
        if report.cancelled {
            warn!("複製已中斷，完成 {copied} 個檔案");
        }
        Ok(copied)
    }

    /// `plan()` 後接著 `execute()`；`dry_run` 時不複製
    pub fn run<F>(
        &self,
        interactive: Option<&mut dyn InteractiveResolver>,
        dry_run: bool,
        progress: F,
    ) -> Result<PipelineReport>
    where
        F: FnMut(usize, usize, &str),
    {
        let mut report = self.plan(interactive)?;
        if dry_run {
            info!("預覽模式，不複製檔案");
        } else {
            self.execute(&mut report, progress)?;
        }
        Ok(report)
    }
}

/// 移除主檔已被排除的 sidecar，並把它們加入排除清單
///
/// 同一組仍有保留的主檔時，sidecar 跟著保留的主檔
fn drop_orphaned_sidecars(
    sidecars: Vec<FileRecord>,
    included: &[FileRecord],
    excluded: &mut Vec<ExcludedFile>,
) -> Vec<FileRecord> {
    let rejected: HashMap<(String, String), String> = excluded
        .iter()
        .map(|e| (group_key(&e.path), e.filter_id.clone()))
        .collect();
    let kept_keys: std::collections::HashSet<(String, String)> = included
        .iter()
        .map(|r| group_key(r.source_path()))
        .collect();

    let mut kept = Vec::with_capacity(sidecars.len());
    for sidecar in sidecars {
        let key = group_key(sidecar.source_path());
        match rejected.get(&key) {
            Some(filter_id) if !kept_keys.contains(&key) => {
                debug!("{} 隨主檔一併排除", sidecar.display_name());
                excluded.push(ExcludedFile {
                    path: sidecar.source_path().to_path_buf(),
                    filter_id: filter_id.clone(),
                    reason: REASON_PRIMARY_EXCLUDED.to_string(),
                });
            }
            _ => kept.push(sidecar),
        }
    }
    kept
}
