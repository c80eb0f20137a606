use crate::config::Config;
use crate::config::save::save_settings;
use crate::menu::handlers::run_media_organizer;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== 媒體檔案整理系統 ===").cyan().bold());
    println!("{}", style("(按 ESC 離開)").dim());

    let options = vec!["整理媒體檔案", "預覽整理結果（不複製）", "設定", "離開"];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_media_organizer(term, shutdown_signal, false)?;
            // 整理流程會更新最近使用的路徑
            *config = Config::new()?;
            Ok(true)
        }
        Some(1) => {
            run_media_organizer(term, shutdown_signal, true)?;
            *config = Config::new()?;
            Ok(true)
        }
        Some(2) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(3) => Ok(false),
        None => Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style("=== 設定 ===").cyan().bold());
        println!("{}", style("(按 ESC 返回)").dim());

        let options = vec!["預設整理組合", "清除最近使用的路徑", "返回"];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇設定項目")
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_preset_menu(term, config)?,
            Some(1) => clear_recent_paths(config)?,
            Some(2) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 預設整理組合選單
fn show_preset_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style("=== 預設整理組合 ===").cyan().bold());
    println!("{}", style("(按 ESC 返回)").dim());

    let names: Vec<String> = config.presets().iter().map(|p| p.name.clone()).collect();
    let current = config.selected_preset().map(|p| p.name.clone());

    if let Some(current) = &current {
        println!("\n{} {}", style("目前設定:").dim(), current);
    }
    println!();

    let items: Vec<String> = config
        .presets()
        .iter()
        .map(|p| {
            let folders = p.folder_structure.len();
            format!("{} ({} 層資料夾, 衝突: {})", p.name, folders, p.duplicate_handling)
        })
        .collect();

    let default_index = current
        .as_ref()
        .and_then(|c| names.iter().position(|n| n == c))
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇預設組合")
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected = names[selection].clone();

    if current.as_ref() != Some(&selected) {
        config.settings.selected_preset = Some(selected.clone());
        save_settings(&config.settings)?;
        println!("\n{} {}", style("已儲存:").green(), selected);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

fn clear_recent_paths(config: &mut Config) -> Result<()> {
    let confirm = Confirm::new()
        .with_prompt("確定要清除所有最近使用的路徑嗎？")
        .default(false)
        .interact()?;

    if confirm {
        config.settings.recent_source_paths.clear();
        config.settings.recent_destination_paths.clear();
        save_settings(&config.settings)?;
        println!("\n{}", style("已清除").green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
