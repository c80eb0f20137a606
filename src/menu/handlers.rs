use crate::component::MediaOrganizer;
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_media_organizer(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    dry_run: bool,
) -> Result<()> {
    let config = Config::new()?;
    let organizer = MediaOrganizer::new(config, Arc::clone(shutdown_signal), dry_run);

    if let Err(e) = organizer.run() {
        eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
