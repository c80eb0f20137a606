//! 內容重複偵測
//!
//! 只產生報告，不改變任何紀錄的狀態

use super::file_record::FileRecord;
use crate::tools::{HashAlgorithm, calculate_file_hash};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 內容完全相同的一組檔案（依探索順序）
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub files: Vec<PathBuf>,
    pub size: u64,
}

impl DuplicateGroup {
    /// 只保留一份時可省下的空間
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.files.len() as u64).saturating_sub(1)
    }
}

pub struct DuplicateDetector {
    algorithm: HashAlgorithm,
    shutdown_signal: Option<Arc<AtomicBool>>,
}

impl DuplicateDetector {
    #[must_use]
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            shutdown_signal: None,
        }
    }

    /// 收到中斷信號後不再計算新的雜湊
    #[must_use]
    pub fn with_shutdown_signal(mut self, shutdown_signal: Arc<AtomicBool>) -> Self {
        self.shutdown_signal = Some(shutdown_signal);
        self
    }

    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown_signal
            .as_ref()
            .is_some_and(|s| s.load(Ordering::SeqCst))
    }

    /// 為已有目標路徑的紀錄（含 sidecar）計算並快取雜湊，回傳成功數
    pub fn hash_records(&self, records: &mut [FileRecord]) -> usize {
        records
            .par_iter_mut()
            .map(|record| {
                let mut hashed = usize::from(self.hash_one(record));
                for sidecar in record.associated_files_mut() {
                    hashed += usize::from(self.hash_one(sidecar));
                }
                hashed
            })
            .sum()
    }

    fn hash_one(&self, record: &mut FileRecord) -> bool {
        if record.target_path().is_none() {
            return false;
        }
        if record.content_hash().is_some() {
            return true;
        }
        if self.is_cancelled() {
            return false;
        }

        match calculate_file_hash(record.source_path(), self.algorithm) {
            Ok(hash) => {
                record.set_content_hash(hash);
                true
            }
            Err(e) => {
                warn!("無法計算雜湊 {}: {e:#}", record.source_path().display());
                false
            }
        }
    }

    /// 計算雜湊後依內容分組，只回傳超過一個成員的群組
    pub fn detect(&self, records: &mut [FileRecord]) -> Vec<DuplicateGroup> {
        self.hash_records(records);
        let groups = group_by_hash(records);

        if !groups.is_empty() {
            let wasted: u64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();
            info!(
                "發現 {} 組重複內容（{}），可節省 {} bytes",
                groups.len(),
                self.algorithm,
                wasted
            );
        }
        groups
    }
}

/// 依已快取的雜湊分組（單一寫入者）
#[must_use]
pub fn group_by_hash(records: &[FileRecord]) -> Vec<DuplicateGroup> {
    let mut by_hash: HashMap<&str, Vec<&FileRecord>> = HashMap::new();
    let all = records
        .iter()
        .flat_map(|r| std::iter::once(r).chain(r.associated_files()));

    for record in all {
        if let Some(hash) = record.content_hash() {
            by_hash.entry(hash).or_default().push(record);
        }
    }

    let mut groups: Vec<(usize, DuplicateGroup)> = by_hash
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(hash, mut members)| {
            members.sort_by_key(|r| r.discovery_index());
            let first = members[0].discovery_index();
            let group = DuplicateGroup {
                hash: hash.to_string(),
                size: members[0].size(),
                files: members
                    .iter()
                    .map(|r| r.source_path().to_path_buf())
                    .collect(),
            };
            (first, group)
        })
        .collect();

    groups.sort_by_key(|(first, _)| *first);
    groups.into_iter().map(|(_, group)| group).collect()
}
