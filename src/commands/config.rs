use crate::core::config::CONFIG_KEYS;
use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => handle_show(),
        Some(("set", sub_matches)) => handle_set(sub_matches),
        Some(("reset", _)) => handle_reset(),
        _ => {
            println!("Use 'avtool config --help' for more information.");
            Ok(())
        }
    }
}

fn row(key: &str, value: Option<String>) {
    match value {
        Some(value) => println!("  {:<14} {}", key.white(), value.cyan()),
        None => println!("  {:<14} {}", key.white(), "(not set)".dimmed()),
    }
}

fn handle_show() -> Result<()> {
    let config = Config::load()?;

    println!(
        "{} {}",
        "Config file:".white().bold(),
        Config::get_config_path()?.display()
    );
    println!();

    row(
        "download-dir",
        Some(config.download_dir().display().to_string()),
    );
    row("cookies", config.cookie_file.clone());
    row("browser", config.cookies_from_browser.clone());
    row(
        "rounds",
        Some(format!(
            "{}{}",
            config.max_rounds(),
            default_marker(config.max_rounds.is_none())
        )),
    );
    row(
        "retries",
        Some(format!(
            "{}{}",
            config.max_retries(),
            default_marker(config.max_retries.is_none())
        )),
    );
    row("ffmpeg", config.ffmpeg_path.clone());

    let yt_dlp = config.yt_dlp_path.clone().map(|path| {
        if config.yt_dlp_installed_by_avtool {
            format!("{} (installed by avtool)", path)
        } else {
            path
        }
    });
    row("yt-dlp", yt_dlp);

    Ok(())
}

fn default_marker(is_default: bool) -> &'static str {
    if is_default {
        " (default)"
    } else {
        ""
    }
}

fn handle_set(matches: &clap::ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    println!("{} {} = {}", "✓ Set".green(), key, value.cyan().bold());

    Ok(())
}

fn handle_reset() -> Result<()> {
    Config::default().save()?;
    println!("{}", "✓ Configuration reset to defaults".green());
    println!(
        "{}",
        format!("Valid keys: {}", CONFIG_KEYS.join(", ")).dimmed()
    );
    Ok(())
}
