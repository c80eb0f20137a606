use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("無法建立資料夾: {}", path.display()))?;
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

/// 盡量轉為正規化的絕對路徑；尚不存在的路徑以其上層資料夾正規化
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent().map(Path::canonicalize), path.file_name()) {
        (Some(Ok(parent)), Some(name)) => parent.join(name),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// 目的地不可與來源相同；遞迴掃描時也不可位於來源之內
pub fn validate_source_and_destination(
    source: &Path,
    destination: &Path,
    recursive: bool,
) -> Result<()> {
    let source = absolute(source);
    let destination = absolute(destination);

    if source == destination {
        bail!("來源與目的地不可為同一個資料夾: {}", source.display());
    }
    if recursive && destination.starts_with(&source) {
        bail!(
            "目的地位於來源資料夾內，會被重複掃描: {}",
            destination.display()
        );
    }
    Ok(())
}
