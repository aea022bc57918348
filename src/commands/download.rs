use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::download::{
    self, AuthOptions, DownloadPrompt, DownloadRequest, Tuning, SUPPORTED_BROWSERS,
};
use crate::core::formats::{
    height_fallback_expression, select_for_height, FormatCatalog, FormatSelection,
};
use crate::core::retry::RetryPolicy;
use crate::core::{validation, Config, YtDlpManager};
use crate::ui;

/// Answers round and format questions on the terminal, or with defaults under `--yes`
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

impl DownloadPrompt for TerminalPrompt {
    fn continue_next_round(&mut self, round: u32) -> crate::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let (question, default) = next_round_question(round);
        ui::confirm(&question, default)
    }

    fn replacement_format(&mut self) -> crate::Result<Option<String>> {
        if self.assume_yes {
            return Ok(None);
        }
        let id = ui::input_text("Format id to download (empty to skip)", None)?;
        Ok((!id.is_empty()).then_some(id))
    }
}

/// Pressing Enter stops after a failed round
fn next_round_question(round: u32) -> (String, bool) {
    (
        format!("Round {} failed. Continue with the next round?", round),
        false,
    )
}

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("URL is required")?;
    let assume_yes = matches.get_flag("yes");

    validation::validate_url(url).with_context(|| format!("Invalid URL: {}", url))?;

    let config = Config::load()?;
    let mut manager = YtDlpManager::with_config(config.clone());
    let yt_dlp = manager.ensure_yt_dlp()?;
    warn_if_outdated(&yt_dlp);

    let download_dir = resolve_download_dir(matches.get_one::<String>("dir"), &config)?;
    let auth = resolve_auth(matches, &config, assume_yes)?;
    let policy = RetryPolicy::new(
        matches
            .get_one::<u32>("rounds")
            .copied()
            .unwrap_or_else(|| config.max_rounds()),
        matches
            .get_one::<u32>("retries")
            .copied()
            .unwrap_or_else(|| config.max_retries()),
    );
    let tuning = (!matches.get_flag("no-tune")).then(Tuning::detect);

    ui::dimmed(&format!("Authentication: {}", auth.describe()));
    ui::dimmed(&format!("Saving to: {}", download_dir.display()));
    ui::info("Fetching video information...");

    let info = download::fetch_info(&yt_dlp, url, &auth)
        .context("Could not read video information")?;
    let catalog = FormatCatalog::categorize(&info.formats);
    let title = validation::file_stem_or_timestamp(info.title());
    let heights = catalog.heights();

    let mut prompt = TerminalPrompt { assume_yes };
    let base = DownloadRequest {
        yt_dlp,
        url: url.clone(),
        output_template: PathBuf::new(),
        format: String::new(),
        auth,
        tuning,
    };

    if heights.is_empty() {
        ui::warn("No video formats with a known resolution, downloading the best available");
        let stem = choose_name(matches.get_one::<String>("name"), &title, assume_yes)?;
        let request = DownloadRequest {
            output_template: download::output_template(&download_dir, &stem),
            format: FormatSelection::Best.expression(),
            ..base
        };
        let outcome = download::download_with_rounds(request, policy, &mut prompt)?;
        if !outcome.is_success() {
            bail!("Download did not complete");
        }
        ui::success(&format!(
            "✓ Download completed: {}",
            download_dir.join(&stem).display()
        ));
        return Ok(());
    }

    let mut requested_height = matches.get_one::<u32>("resolution").copied();
    let mut format_override = matches.get_one::<String>("format").cloned();
    let audio_arg = matches.get_one::<usize>("audio").copied();

    loop {
        let height = match requested_height.take() {
            Some(h) if heights.contains(&h) || assume_yes => h,
            Some(h) => {
                ui::warn(&format!("{}p is not offered for this video", h));
                match choose_height(&catalog, &heights)? {
                    Some(h) => h,
                    None => return Ok(()),
                }
            }
            None if assume_yes => heights[0],
            None => match choose_height(&catalog, &heights)? {
                Some(h) => h,
                None => return Ok(()),
            },
        };

        let stem = choose_stem(matches.get_one::<String>("name"), &title, height, assume_yes)?;

        let selection = match format_override.take() {
            Some(expr) => FormatSelection::Expression(expr),
            None => choose_selection(&catalog, height, audio_arg, assume_yes)?,
        };
        if selection.is_silent() {
            ui::warn("No audio-only track found, the file will have no sound");
        }

        let request = DownloadRequest {
            output_template: download::output_template(&download_dir, &stem),
            format: selection.expression(),
            ..base.clone()
        };
        log::info!("Format expression: {}", request.format);

        let outcome = download::download_with_rounds(request, policy, &mut prompt)?;
        if outcome.is_success() {
            println!();
            ui::success(&format!(
                "✓ Download completed: {}",
                download_dir.join(&stem).display()
            ));
            return Ok(());
        }

        if assume_yes || !ui::confirm("Download failed. Choose another resolution?", false)? {
            bail!("Download did not complete");
        }
    }
}

fn warn_if_outdated(yt_dlp: &Path) {
    match YtDlpManager::version(yt_dlp) {
        Ok(version) if YtDlpManager::is_outdated(&version) => {
            ui::warn(&format!(
                "yt-dlp {} is outdated, downloads may fail. Update it with 'yt-dlp -U'",
                version
            ));
        }
        Ok(version) => log::debug!("yt-dlp {}", version),
        Err(e) => log::warn!("Could not read the yt-dlp version: {}", e),
    }
}

/// `--dir`, then the configured directory; created when missing
pub fn resolve_download_dir(arg: Option<&String>, config: &Config) -> Result<PathBuf> {
    let dir = arg.map(PathBuf::from).unwrap_or_else(|| config.download_dir());

    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;
    } else if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    Ok(dir)
}

/// Command line flags, then the interactive menu, then config, then `./cookies.txt`
fn resolve_auth(
    matches: &clap::ArgMatches,
    config: &Config,
    assume_yes: bool,
) -> Result<AuthOptions> {
    if let Some(file) = matches.get_one::<String>("cookies") {
        let path = PathBuf::from(file);
        if !path.is_file() {
            bail!("Cookie file not found: {}", path.display());
        }
        return Ok(AuthOptions::CookieFile(path));
    }

    if let Some(browser) = matches.get_one::<String>("browser") {
        return Ok(AuthOptions::Browser(browser.to_lowercase()));
    }

    if matches.get_flag("auth") && !assume_yes {
        return choose_auth();
    }

    Ok(AuthOptions::configured_or_default(config))
}

fn choose_auth() -> Result<AuthOptions> {
    let options = [
        "No authentication",
        "Cookie file (cookies.txt)",
        "Cookies from a browser",
    ];

    match ui::select_index("Authentication method", &options, 0)? {
        1 => {
            let path = PathBuf::from(ui::input_text(
                "Path to the cookie file",
                Some(download::DEFAULT_COOKIE_FILE),
            )?);
            if !path.is_file() {
                bail!("Cookie file not found: {}", path.display());
            }
            Ok(AuthOptions::CookieFile(path))
        }
        2 => {
            let idx = ui::select_index("Browser", &SUPPORTED_BROWSERS, 0)?;
            Ok(AuthOptions::Browser(SUPPORTED_BROWSERS[idx].to_string()))
        }
        _ => Ok(AuthOptions::None),
    }
}

/// Lists the heights with their availability; `None` when the user quits
fn choose_height(catalog: &FormatCatalog, heights: &[u32]) -> Result<Option<u32>> {
    ui::header("Available resolutions:");
    for (i, h) in heights.iter().enumerate() {
        let label = catalog
            .availability(*h)
            .map(|a| a.label())
            .unwrap_or_default();
        println!("  {}. {}p {}", i + 1, h, format!("({})", label).dimmed());
    }

    loop {
        let Some(answer) = ui::read_choice("Choose a resolution number (q to quit)")? else {
            return Ok(None);
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=heights.len()).contains(&n) => return Ok(Some(heights[n - 1])),
            _ => ui::error(&format!("Enter a number between 1 and {}", heights.len())),
        }
    }
}

/// `<name or title>_<H>p`
fn choose_stem(
    name: Option<&String>,
    title: &str,
    height: u32,
    assume_yes: bool,
) -> Result<String> {
    let base = choose_name(name, title, assume_yes)?;
    Ok(format!("{}_{}p", base, height))
}

/// `--name`, then the answer to the custom name question, then the title
fn choose_name(name: Option<&String>, title: &str, assume_yes: bool) -> Result<String> {
    let base = match name {
        Some(name) => {
            validation::validate_output_name(name)?;
            validation::sanitize_filename(name)
        }
        None if assume_yes => title.to_string(),
        None => {
            let custom = ui::input_text("Custom file name (Enter keeps the video title)", None)?;
            if custom.is_empty() {
                title.to_string()
            } else {
                validation::validate_output_name(&custom)?;
                validation::sanitize_filename(&custom)
            }
        }
    };

    Ok(base)
}

fn choose_selection(
    catalog: &FormatCatalog,
    height: u32,
    audio_arg: Option<usize>,
    assume_yes: bool,
) -> Result<FormatSelection> {
    if catalog.muxed.contains_key(&height) || !catalog.video_only.contains_key(&height) {
        return Ok(select_for_height(catalog, height, None)
            .unwrap_or_else(|| FormatSelection::Expression(height_fallback_expression(height))));
    }

    let audio_choice = match audio_arg {
        Some(n) if (1..=catalog.audio.len()).contains(&n) => Some(n - 1),
        Some(n) => {
            ui::warn(&format!("Audio track {} does not exist, using the best one", n));
            None
        }
        None if assume_yes || catalog.audio.len() < 2 => None,
        None => choose_audio(catalog)?,
    };

    Ok(select_for_height(catalog, height, audio_choice)
        .unwrap_or_else(|| FormatSelection::Expression(height_fallback_expression(height))))
}

fn choose_audio(catalog: &FormatCatalog) -> Result<Option<usize>> {
    ui::header("Audio tracks:");
    for (i, track) in catalog.audio.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            track.format_id,
            format!("({:.0} kbps)", track.abr).dimmed()
        );
    }

    loop {
        let answer = ui::input_text("Audio track number (Enter for the best)", None)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=catalog.audio.len()).contains(&n) => return Ok(Some(n - 1)),
            _ => ui::error(&format!("Enter a number between 1 and {}", catalog.audio.len())),
        }
    }
}
