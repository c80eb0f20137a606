//! 實際複製檔案
//!
//! 依探索順序逐一複製主檔，再處理其 sidecar；單一檔案失敗只影響該筆紀錄

use super::error::OrganizeError;
use super::file_record::FileRecord;
use crate::tools::ensure_directory_exists;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const REASON_PRIMARY_NOT_COPIED: &str = "primary not copied";

/// 複製檔案並保留修改時間
pub fn copy_preserving_mtime(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        ensure_directory_exists(parent)?;
    }

    fs::copy(source, target).with_context(|| {
        format!("複製失敗: {} -> {}", source.display(), target.display())
    })?;

    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .with_context(|| format!("無法取得修改時間: {}", source.display()))?;
    File::options()
        .write(true)
        .open(target)
        .and_then(|f| f.set_modified(modified))
        .with_context(|| format!("無法設定修改時間: {}", target.display()))?;

    Ok(())
}

pub struct CopyExecutor {
    destination_root: PathBuf,
    shutdown_signal: Arc<AtomicBool>,
}

impl CopyExecutor {
    #[must_use]
    pub fn new(destination_root: impl Into<PathBuf>, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            destination_root: destination_root.into(),
            shutdown_signal,
        }
    }

    /// 複製一筆紀錄並更新狀態，回傳是否成功
    fn copy_one(record: &mut FileRecord) -> bool {
        let Some(target) = record.target_path().map(Path::to_path_buf) else {
            return false;
        };

        match copy_preserving_mtime(record.source_path(), &target) {
            Ok(()) => {
                debug!("已複製 {} -> {}", record.display_name(), target.display());
                record.mark_copied()
            }
            Err(e) => {
                error!("{e:#}");
                record.mark_error(format!("{e:#}"));
                false
            }
        }
    }

    /// 執行複製，回傳狀態變為 `Copied` 的紀錄數（含 sidecar）
    ///
    /// `progress(已處理, 總數, 檔名)` 在每個主檔嘗試後呼叫一次，總數在開始時計算。
    /// 收到中斷信號時停止排程新的複製並回傳目前的成功數；
    /// 目的地根目錄消失時回傳 `DestinationUnavailable`，已處理的紀錄狀態保持不變
    pub fn run<F>(&self, records: &mut [FileRecord], mut progress: F) -> Result<usize, OrganizeError>
    where
        F: FnMut(usize, usize, &str),
    {
        fs::create_dir_all(&self.destination_root)
            .map_err(|_| OrganizeError::DestinationUnavailable(self.destination_root.clone()))?;

        let total = records.iter().filter(|r| r.is_eligible_for_copy()).count();
        let mut processed = 0;
        let mut copied = 0;

        info!("開始複製 {total} 個檔案到 {}", self.destination_root.display());

        for record in records.iter_mut() {
            if !record.is_eligible_for_copy() {
                for sidecar in record.associated_files_mut() {
                    if sidecar.is_eligible_for_copy() {
                        sidecar.mark_skipped(REASON_PRIMARY_NOT_COPIED);
                    }
                }
                continue;
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷信號，停止複製（已完成 {processed}/{total}）");
                break;
            }

            if !self.destination_root.is_dir() {
                error!("目的地資料夾已無法使用: {}", self.destination_root.display());
                return Err(OrganizeError::DestinationUnavailable(
                    self.destination_root.clone(),
                ));
            }

            if Self::copy_one(record) {
                copied += 1;
            }

            for sidecar in record.associated_files_mut() {
                if sidecar.is_eligible_for_copy() && Self::copy_one(sidecar) {
                    copied += 1;
                }
            }

            processed += 1;
            progress(processed, total, record.display_name());
        }

        info!("複製完成: {copied} 個檔案");
        Ok(copied)
    }
}
