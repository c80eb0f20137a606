use super::conflict_resolver::{
    DuplicateHandling, InteractiveResolver, OthersAction, Resolution,
};
use super::file_record::{FileRecord, FileStatus, format_size};
use super::metadata::{ExiftoolExtractor, MetadataExtractor, NoopExtractor};
use super::pipeline::{OrganizePipeline, PipelineReport};
use crate::config::save::{add_recent_path, save_settings};
use crate::config::{Config, Preset};
use crate::tools::{is_exiftool_available, validate_directory_exists};
use anyhow::{Result, bail};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 摘要中列出的目標路徑數
const PREVIEW_TARGETS: usize = 10;

/// 互動式媒體整理元件
pub struct MediaOrganizer {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
    dry_run: bool,
}

impl MediaOrganizer {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>, dry_run: bool) -> Self {
        Self {
            config,
            shutdown_signal,
            dry_run,
        }
    }

    pub fn run(&self) -> Result<()> {
        let title = if self.dry_run {
            "=== 預覽整理結果 ==="
        } else {
            "=== 整理媒體檔案 ==="
        };
        println!("{}", style(title).cyan().bold());

        let Some(source) = prompt_path(
            &self.config.settings.recent_source_paths,
            "請選擇來源資料夾",
            "請輸入來源資料夾路徑",
        )?
        else {
            return Ok(());
        };
        validate_directory_exists(Path::new(&source))?;

        let Some(destination) = prompt_path(
            &self.config.settings.recent_destination_paths,
            "請選擇目的地資料夾",
            "請輸入目的地資料夾路徑",
        )?
        else {
            return Ok(());
        };

        let Some(preset) = self.select_preset()? else {
            return Ok(());
        };

        // 更新路徑歷史並儲存
        {
            let mut settings = self.config.settings.clone();
            add_recent_path(&mut settings.recent_source_paths, &source);
            add_recent_path(&mut settings.recent_destination_paths, &destination);
            if let Err(e) = save_settings(&settings) {
                warn!("無法儲存路徑歷史: {e}");
            }
        }

        let extractor: Box<dyn MetadataExtractor> = if is_exiftool_available() {
            Box::new(ExiftoolExtractor)
        } else {
            println!(
                "{}",
                style("找不到 exiftool，僅依檔案修改時間整理").yellow()
            );
            Box::new(NoopExtractor)
        };

        let pipeline = OrganizePipeline::new(
            preset.clone(),
            PathBuf::from(&source),
            PathBuf::from(&destination),
            Arc::clone(&self.shutdown_signal),
        )
        .with_extractor(extractor);

        let mut resolver =
            (preset.duplicate_handling == DuplicateHandling::Ask).then_some(DialoguerResolver);

        println!("{}", style("分析檔案中...").dim());
        let mut report = pipeline.plan(
            resolver
                .as_mut()
                .map(|r| r as &mut dyn InteractiveResolver),
        )?;

        print_plan_summary(&report);

        if report.pending_count() == 0 {
            println!("{}", style("沒有需要複製的檔案").yellow());
            return Ok(());
        }

        if self.dry_run {
            println!("{}", style("預覽模式，未複製任何檔案").yellow());
            return Ok(());
        }

        if !confirm_copy(report.pending_count())? {
            println!("{}", style("操作已取消").yellow());
            return Ok(());
        }

        if self.shutdown_signal.load(Ordering::SeqCst) {
            warn!("收到中斷訊號，停止處理");
            return Ok(());
        }

        let progress_bar = ProgressBar::new(0);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )?
                .progress_chars("#>-"),
        );
        progress_bar.set_message("複製中...");

        let copied = pipeline.execute(&mut report, |done, total, name| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
            progress_bar.set_message(name.to_string());
        });
        progress_bar.finish_and_clear();

        print_result(&report);
        copied?;

        Ok(())
    }

    fn select_preset(&self) -> Result<Option<Preset>> {
        let presets = self.config.presets();
        if presets.is_empty() {
            bail!("沒有可用的整理組合");
        }

        let default_index = self
            .config
            .selected_preset()
            .and_then(|selected| presets.iter().position(|p| p.name == selected.name))
            .unwrap_or(0);

        let options: Vec<String> = presets
            .iter()
            .map(|p| {
                if p.description.is_empty() {
                    p.name.clone()
                } else {
                    format!("{} - {}", p.name, p.description)
                }
            })
            .collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇整理組合")
            .items(&options)
            .default(default_index)
            .interact_opt()?;

        Ok(selection.map(|idx| presets[idx].clone()))
    }
}

/// 提供最近使用的路徑，或輸入新路徑；ESC 回傳 `None`
fn prompt_path(recent_paths: &[String], select_prompt: &str, input_prompt: &str) -> Result<Option<String>> {
    if recent_paths.is_empty() {
        let path: String = Input::new().with_prompt(input_prompt).interact_text()?;
        return Ok(Some(path.trim().to_string()));
    }

    let mut options: Vec<String> = recent_paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let exists = Path::new(p).exists();
            let indicator = if exists { "✓" } else { "✗" };
            format!("{} [{}] {}", i + 1, indicator, p)
        })
        .collect();
    options.push("輸入新路徑...".to_string());

    println!("{}", style("(按 ESC 返回主選單)").dim());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(select_prompt)
        .items(&options)
        .default(0)
        .interact_opt()?;

    match selection {
        None => Ok(None),
        Some(idx) if idx < recent_paths.len() => Ok(Some(recent_paths[idx].clone())),
        Some(_) => {
            let path: String = Input::new().with_prompt(input_prompt).interact_text()?;
            Ok(Some(path.trim().to_string()))
        }
    }
}

fn confirm_copy(count: usize) -> Result<bool> {
    let confirm = Confirm::new()
        .with_prompt(format!("確定要複製這 {count} 個檔案嗎？"))
        .default(true)
        .interact()?;
    Ok(confirm)
}

fn print_plan_summary(report: &PipelineReport) {
    println!();
    println!(
        "{}",
        style(format!(
            "共 {} 個檔案待複製（{}）",
            report.pending_count(),
            format_size(report.pending_bytes())
        ))
        .green()
    );

    for (kind, count) in report.count_by_kind() {
        println!(
            "  {} {}: {} 個",
            style("→").dim(),
            style(kind.display_name()).cyan(),
            count
        );
    }

    if !report.excluded.is_empty() {
        println!();
        println!(
            "{}",
            style(format!("已排除 {} 個檔案:", report.excluded.len())).yellow()
        );
        for (filter_id, count) in &report.filter_stats.exclusion_by_filter {
            println!("  {} {}: {} 個", style("•").dim(), filter_id, count);
        }
    }

    if report.conflicts.has_conflicts() {
        println!();
        println!(
            "{}",
            style(format!(
                "目標路徑衝突 {} 組（略過 {}、改名 {}）",
                report.conflicts.groups.len(),
                report.conflicts.skipped,
                report.conflicts.renamed
            ))
            .yellow()
        );
    }

    if !report.duplicates.is_empty() {
        let wasted: u64 = report.duplicates.iter().map(|g| g.wasted_bytes()).sum();
        println!();
        println!(
            "{}",
            style(format!(
                "內容重複 {} 組，重複佔用 {}",
                report.duplicates.len(),
                format_size(wasted)
            ))
            .yellow()
        );
    }

    if report.render_failures > 0 {
        println!(
            "{}",
            style(format!("{} 個檔案無法產生目標路徑", report.render_failures)).red()
        );
    }

    let targets: Vec<&FileRecord> = report
        .records
        .iter()
        .filter(|r| r.is_eligible_for_copy())
        .take(PREVIEW_TARGETS)
        .collect();
    if !targets.is_empty() {
        println!();
        println!("{}", style("目標路徑預覽:").dim());
        for record in targets {
            if let Some(target) = record.target_path() {
                println!(
                    "  {} {} {}",
                    record.display_name(),
                    style("→").dim(),
                    target.display()
                );
            }
        }
    }

    println!();
}

fn print_result(report: &PipelineReport) {
    let counts = report.count_by_status();
    let count = |status: FileStatus| counts.get(&status).copied().unwrap_or(0);

    println!();
    println!("{}", style("=== 整理結果 ===").cyan().bold());
    println!("  成功複製: {} 個檔案", style(report.copied).green());

    if count(FileStatus::Skipped) > 0 {
        println!("  已跳過: {} 個檔案", style(count(FileStatus::Skipped)).yellow());
    }
    if count(FileStatus::Error) > 0 {
        println!("  失敗: {} 個檔案", style(count(FileStatus::Error)).red());
        for record in report
            .all_records()
            .filter(|r| r.status() == FileStatus::Error)
        {
            println!(
                "    {} {}: {}",
                style("✗").red(),
                record.display_name(),
                record.error_message().unwrap_or_default()
            );
        }
    }
    if report.cancelled {
        println!(
            "  {}",
            style(format!("已中斷，尚有 {} 個檔案未處理", count(FileStatus::Pending))).yellow()
        );
    }

    info!(
        "整理完成 - 複製: {}, 跳過: {}, 失敗: {}",
        report.copied,
        count(FileStatus::Skipped),
        count(FileStatus::Error)
    );
}

/// 以選單詢問衝突時要保留哪個檔案
pub struct DialoguerResolver;

impl DialoguerResolver {
    fn ask(target: &Path, candidates: &[&FileRecord]) -> Result<Resolution> {
        println!();
        println!(
            "{} {}",
            style("目標路徑衝突:").yellow().bold(),
            target.display()
        );

        let options: Vec<String> = candidates
            .iter()
            .map(|r| {
                format!(
                    "{} ({}, {})",
                    r.source_path().display(),
                    r.size_human_readable(),
                    r.last_modified().format("%Y-%m-%d %H:%M:%S")
                )
            })
            .collect();

        let keep = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("要保留哪個檔案在此路徑？")
            .items(&options)
            .default(0)
            .interact()?;

        let others = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("其餘檔案")
            .items(&["略過", "加上編號另存"])
            .default(1)
            .interact()?;

        Ok(Resolution {
            keep,
            others: if others == 0 {
                OthersAction::Skip
            } else {
                OthersAction::Rename
            },
        })
    }
}

impl InteractiveResolver for DialoguerResolver {
    fn resolve(&mut self, target: &Path, candidates: &[&FileRecord]) -> Resolution {
        Self::ask(target, candidates).unwrap_or_else(|e| {
            warn!("無法詢問衝突處理方式，保留第一個檔案: {e}");
            Resolution {
                keep: 0,
                others: OthersAction::Skip,
            }
        })
    }
}
