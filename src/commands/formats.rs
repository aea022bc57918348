use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::download::{self, AuthOptions};
use crate::core::formats::FormatCatalog;
use crate::core::{validation, Config, YtDlpManager};
use crate::ui;

/// Prints the categorized format catalog of a video
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("URL is required")?;
    validation::validate_url(url).with_context(|| format!("Invalid URL: {}", url))?;

    let config = Config::load()?;
    let yt_dlp = YtDlpManager::with_config(config.clone()).ensure_yt_dlp()?;
    let auth = AuthOptions::configured_or_default(&config);

    if matches.get_flag("raw") {
        download::list_formats(&yt_dlp, url, &auth)?;
        return Ok(());
    }

    let info = download::fetch_info(&yt_dlp, url, &auth)
        .context("Could not read video information")?;
    let catalog = FormatCatalog::categorize(&info.formats);

    println!("{} {}", "Title:".white().bold(), info.title());
    print_catalog(&catalog);

    Ok(())
}

fn print_catalog(catalog: &FormatCatalog) {
    if catalog.is_empty() {
        ui::warn("No video formats, 'avtool download' will fall back to 'best'");
    }

    ui::header("Resolutions:");
    for h in catalog.heights() {
        let label = catalog
            .availability(h)
            .map(|a| a.label())
            .unwrap_or_default();
        println!("  {:>5}p  {}", h, label.dimmed());
    }

    ui::header("Muxed (video + audio):");
    for (h, id) in catalog.muxed.iter().rev() {
        println!("  {:>5}p  {}", h, id);
    }

    ui::header("Video only:");
    for (h, id) in catalog.video_only.iter().rev() {
        println!("  {:>5}p  {}", h, id);
    }

    ui::header("Audio only:");
    if catalog.audio.is_empty() {
        ui::dimmed("  none");
    }
    for track in &catalog.audio {
        println!("  {:>6.0}k  {}", track.abr, track.format_id);
    }
}
