use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::core::FFmpegManager;
use crate::ui;

/// Probe summary of a local media file, optionally with loudness levels
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("file")
        .map(PathBuf::from)
        .context("File is required")?;

    if !path.is_file() {
        bail!("File does not exist: {}", path.display());
    }

    let tools = FFmpegManager::new()?.toolchain()?;
    let info = tools.probe(&path)?;
    ui::print_media_info(&info);

    if matches.get_flag("levels") {
        if !info.has_audio() {
            ui::warn("No audio stream, loudness levels are not available");
            return Ok(());
        }

        ui::info("Measuring loudness...");
        let levels = tools.volume_levels(&path)?;
        ui::header("Levels");
        println!("  Peak: {:.1} dBFS", levels.max_db);
        println!("  Mean: {:.1} dBFS", levels.mean_db);
    }

    Ok(())
}
