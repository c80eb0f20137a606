//! 目標路徑衝突處理
//!
//! 必須在所有目標路徑都產生後才執行，主檔與 sidecar 一起比對

use super::file_record::{FileRecord, FileStatus};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

pub const REASON_DUPLICATE_PATH: &str = "duplicate path";
pub const REASON_OLDER_DUPLICATE: &str = "older duplicate";

/// 目標路徑重複時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    /// 保留最早探索到的檔案，其餘略過
    Skip,
    /// 保留修改時間最新的檔案，其餘略過
    Overwrite,
    /// 保留第一個，其餘加上 `_1`、`_2` 後綴
    #[default]
    Rename,
    /// 交給互動式解決者決定
    Ask,
}

impl DuplicateHandling {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Skip => "略過",
            Self::Overwrite => "保留較新的檔案",
            Self::Rename => "自動重新命名",
            Self::Ask => "逐一詢問",
        }
    }
}

impl fmt::Display for DuplicateHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 互動決定中，未被保留的檔案的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OthersAction {
    Skip,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// 保留原目標路徑的成員索引
    pub keep: usize,
    pub others: OthersAction,
}

/// `Ask` 策略的外部決策者，成員已依探索順序排列
pub trait InteractiveResolver {
    fn resolve(&mut self, target: &Path, candidates: &[&FileRecord]) -> Resolution;
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictGroup {
    pub target: PathBuf,
    /// 依探索順序排列的來源路徑
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub groups: Vec<ConflictGroup>,
    pub skipped: usize,
    pub renamed: usize,
    /// `Ask` 策略但沒有決策者時未處理的群組數
    pub unresolved: usize,
}

impl ConflictReport {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// 主檔索引與（可選）sidecar 索引
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordRef {
    primary: usize,
    sidecar: Option<usize>,
}

fn get(records: &[FileRecord], r: RecordRef) -> &FileRecord {
    let primary = &records[r.primary];
    match r.sidecar {
        Some(i) => &primary.associated_files()[i],
        None => primary,
    }
}

fn get_mut(records: &mut [FileRecord], r: RecordRef) -> &mut FileRecord {
    let primary = &mut records[r.primary];
    match r.sidecar {
        Some(i) => &mut primary.associated_files_mut()[i],
        None => primary,
    }
}

/// `{stem}_{n}.{ext}`，同資料夾
#[must_use]
pub fn suffixed_path(target: &Path, n: usize) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    target.with_file_name(name)
}

pub struct ConflictResolver {
    policy: DuplicateHandling,
}

impl ConflictResolver {
    #[must_use]
    pub const fn new(policy: DuplicateHandling) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> DuplicateHandling {
        self.policy
    }

    /// 處理衝突；`interactive` 只在 `Ask` 策略使用
    ///
    /// 除了沒有決策者的 `Ask` 以外，結束後任兩筆 `Pending` 紀錄的目標路徑都不同
    pub fn resolve(
        &self,
        records: &mut [FileRecord],
        interactive: Option<&mut dyn InteractiveResolver>,
    ) -> ConflictReport {
        let mut interactive = interactive;
        let mut report = ConflictReport::default();

        let mut by_target: BTreeMap<PathBuf, Vec<RecordRef>> = BTreeMap::new();
        for (primary, record) in records.iter().enumerate() {
            let refs = std::iter::once(RecordRef {
                primary,
                sidecar: None,
            })
            .chain((0..record.associated_files().len()).map(|i| RecordRef {
                primary,
                sidecar: Some(i),
            }));

            for r in refs {
                let member = get(records, r);
                if member.status() != FileStatus::Pending {
                    continue;
                }
                if let Some(target) = member.target_path() {
                    by_target.entry(target.to_path_buf()).or_default().push(r);
                }
            }
        }

        let mut taken: HashSet<PathBuf> = by_target.keys().cloned().collect();

        for (target, mut members) in by_target {
            if members.len() < 2 {
                continue;
            }
            members.sort_by_key(|r| get(records, *r).discovery_index());

            report.groups.push(ConflictGroup {
                target: target.clone(),
                sources: members
                    .iter()
                    .map(|r| get(records, *r).source_path().to_path_buf())
                    .collect(),
            });
            debug!("目標路徑衝突 ({} 個檔案): {}", members.len(), target.display());

            match self.policy {
                DuplicateHandling::Skip => {
                    for r in &members[1..] {
                        get_mut(records, *r).mark_skipped(REASON_DUPLICATE_PATH);
                        report.skipped += 1;
                    }
                }
                DuplicateHandling::Overwrite => {
                    let keep = newest_member(records, &members);
                    for r in members.iter().filter(|r| **r != keep) {
                        get_mut(records, *r).mark_skipped(REASON_OLDER_DUPLICATE);
                        report.skipped += 1;
                    }
                }
                DuplicateHandling::Rename => {
                    report.renamed += rename_members(records, &target, &members[1..], &mut taken);
                }
                DuplicateHandling::Ask => {
                    let Some(resolver) = interactive.as_deref_mut() else {
                        report.unresolved += 1;
                        continue;
                    };

                    let candidates: Vec<&FileRecord> =
                        members.iter().map(|r| get(records, *r)).collect();
                    let mut resolution = resolver.resolve(&target, &candidates);
                    if resolution.keep >= members.len() {
                        warn!("無效的選擇 {}，改為保留第一個檔案", resolution.keep);
                        resolution.keep = 0;
                    }

                    let others: Vec<RecordRef> = members
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != resolution.keep)
                        .map(|(_, r)| *r)
                        .collect();
                    match resolution.others {
                        OthersAction::Skip => {
                            for r in others {
                                get_mut(records, r).mark_skipped(REASON_DUPLICATE_PATH);
                                report.skipped += 1;
                            }
                        }
                        OthersAction::Rename => {
                            report.renamed += rename_members(records, &target, &others, &mut taken);
                        }
                    }
                }
            }
        }

        if report.has_conflicts() {
            info!(
                "路徑衝突 {} 組（{}）：略過 {}，重新命名 {}",
                report.groups.len(),
                self.policy,
                report.skipped,
                report.renamed
            );
        }
        report
    }
}

/// 修改時間最新者；相同時取探索順序最早者（成員已排序）
fn newest_member(records: &[FileRecord], members: &[RecordRef]) -> RecordRef {
    let mut keep = members[0];
    for r in &members[1..] {
        if get(records, *r).modified() > get(records, keep).modified() {
            keep = *r;
        }
    }
    keep
}

/// 第 i 個成員改為 `{stem}_{i}`，若該路徑已被占用則往後找下一個空號
fn rename_members(
    records: &mut [FileRecord],
    target: &Path,
    members: &[RecordRef],
    taken: &mut HashSet<PathBuf>,
) -> usize {
    let mut n = 0;
    for r in members {
        n += 1;
        let mut candidate = suffixed_path(target, n);
        while taken.contains(&candidate) {
            n += 1;
            candidate = suffixed_path(target, n);
        }
        taken.insert(candidate.clone());

        let record = get_mut(records, *r);
        debug!("重新命名 {} -> {}", record.display_name(), candidate.display());
        record.set_target_path(candidate);
    }
    members.len()
}
