use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::commands::download::{resolve_download_dir, TerminalPrompt};
use crate::core::download::{self, AuthOptions, HttpDownload};
use crate::core::formats::{direct_mp4_links, parse_resolution_label, sorted_desc};
use crate::core::retry::{RetryPolicy, DIRECT_MAX_ROUNDS};
use crate::core::{validation, Config, YtDlpManager};
use crate::error::AvError;
use crate::ui;

/// Streams a progressive mp4 straight from the site, skipping yt-dlp's downloader
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("URL is required")?;
    let assume_yes = matches.get_flag("yes");

    validation::validate_url(url).with_context(|| format!("Invalid URL: {}", url))?;

    let config = Config::load()?;
    let yt_dlp = YtDlpManager::with_config(config.clone()).ensure_yt_dlp()?;
    let download_dir = resolve_download_dir(matches.get_one::<String>("dir"), &config)?;
    let auth = AuthOptions::configured_or_default(&config);

    let policy = RetryPolicy::new(
        matches
            .get_one::<u32>("rounds")
            .copied()
            .unwrap_or(DIRECT_MAX_ROUNDS),
        matches
            .get_one::<u32>("retries")
            .copied()
            .unwrap_or(RetryPolicy::direct().max_retries),
    );

    ui::info("Fetching video information...");
    let info = download::fetch_info(&yt_dlp, url, &auth)
        .context("Could not read video information")?;

    let links = direct_mp4_links(&info.formats);
    if links.is_empty() {
        ui::warn("No direct MP4 links were found for this video");
        ui::dimmed("The site may only serve M3U8 playlists, use DRM, or the links expired.");
        ui::dimmed("Try 'avtool download' instead.");
        return Ok(());
    }

    let title = validation::file_stem_or_timestamp(info.title());

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Cancellation requested...".yellow().bold());
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let mut prompt = TerminalPrompt { assume_yes };
    let mut requested = matches.get_one::<String>("resolution").cloned();

    loop {
        let height = match requested.take().and_then(|label| parse_resolution_label(&label)) {
            Some(h) if links.contains_key(&h) => h,
            Some(h) if assume_yes => bail!("{}p has no direct MP4 link", h),
            _ if assume_yes => sorted_desc(&links)[0],
            Some(h) => {
                ui::warn(&format!("{}p has no direct MP4 link", h));
                match choose_link(&links)? {
                    Some(h) => h,
                    None => return Ok(()),
                }
            }
            None => match choose_link(&links)? {
                Some(h) => h,
                None => return Ok(()),
            },
        };

        let path = download_dir.join(format!("{}_{}p.mp4", title, height));
        let download = HttpDownload::new(&links[&height], &path, Some(cancel_flag.clone()))?;

        match download::download_direct(download, policy, &mut prompt) {
            Ok(outcome) if outcome.is_success() => {
                ui::success(&format!("✓ Saved {}", path.display()));
                return Ok(());
            }
            Ok(_) => {}
            Err(AvError::Cancelled) => {
                ui::warn("Download cancelled, partial file removed");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if assume_yes || !ui::confirm("Download failed. Try another resolution?", false)? {
            bail!("Download did not complete");
        }
    }
}

/// Accepts a list number or a label such as `720p`
fn choose_link(links: &BTreeMap<u32, String>) -> Result<Option<u32>> {
    let heights = sorted_desc(links);

    ui::header("Direct MP4 links:");
    for (i, h) in heights.iter().enumerate() {
        println!("  {}. {}p", i + 1, h);
    }

    loop {
        let Some(answer) = ui::read_choice("Choose a number or a resolution like 720p (q to quit)")?
        else {
            return Ok(None);
        };

        if let Some(h) = pick_height(&heights, &answer) {
            return Ok(Some(h));
        }
        ui::error("Not a listed number or resolution");
    }
}

fn pick_height(heights: &[u32], answer: &str) -> Option<u32> {
    let answer = answer.trim();
    if !answer.to_lowercase().ends_with('p') {
        if let Ok(n) = answer.parse::<usize>() {
            if (1..=heights.len()).contains(&n) {
                return Some(heights[n - 1]);
            }
        }
    }

    parse_resolution_label(answer).filter(|h| heights.contains(h))
}
