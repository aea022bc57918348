use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::core::convert::{self, validate_speed, ConversionPlan, MediaKind};
use crate::core::FFmpegManager;
use crate::ui;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let input = match matches.get_one::<String>("input") {
        Some(input) => PathBuf::from(input),
        None => prompt_input()?,
    };

    if !input.is_file() {
        bail!("File does not exist: {}", input.display());
    }

    let kind = MediaKind::from_path(&input).with_context(|| {
        format!(
            "Unsupported input {}. Audio: {}. Video: {}",
            input.display(),
            MediaKind::Audio.extensions().join(", "),
            MediaKind::Video.extensions().join(", ")
        )
    })?;

    let format = match matches.get_one::<String>("to") {
        Some(format) => format.clone(),
        None => {
            let formats = kind.output_formats();
            let idx = ui::select_index(&format!("Convert {} to", kind), formats, 0)?;
            formats[idx].to_string()
        }
    };

    let speed = match matches.get_one::<String>("speed") {
        Some(raw) => parse_speed(raw)?,
        None if matches.get_flag("yes") => 1.0,
        None => parse_speed(&ui::input_text("Playback speed", Some("1.0"))?)?,
    };

    let plan = ConversionPlan::new(&input, &format, speed)?;
    let tools = FFmpegManager::new()?.toolchain()?;

    let input_info = tools.probe(&input)?;
    ui::header("Input");
    ui::print_media_info(&input_info);

    println!();
    println!(
        "{} {} {}",
        "Converting to".cyan(),
        plan.format.to_uppercase().cyan().bold(),
        format!("at {}x", convert::format_speed(plan.speed)).cyan()
    );

    let report = convert::convert(&tools, &plan, &input_info)?;

    ui::header("Output");
    ui::print_media_info(&report.output_info);
    println!();
    ui::success(&format!("✓ Saved {}", report.output.display()));

    Ok(())
}

/// Kind menu, then the path of a file of that kind
fn prompt_input() -> Result<PathBuf> {
    let kinds = [MediaKind::Audio, MediaKind::Video];
    let kind = kinds[ui::select_index("What do you want to convert?", &kinds, 0)?];

    let path = ui::input_text(
        &format!("Path to the {} file ({})", kind, kind.extensions().join(", ")),
        None,
    )?;
    let path = PathBuf::from(path.trim_matches('"'));

    if MediaKind::from_path(&path) != Some(kind) {
        bail!("{} is not a supported {} file", path.display(), kind);
    }

    Ok(path)
}

/// Empty input keeps 1.0, text that is not a number falls back to 1.0 with a warning,
/// and zero or negative values abort
pub fn parse_speed(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1.0);
    }

    match raw.parse::<f64>() {
        Ok(speed) => Ok(validate_speed(speed)?),
        Err(_) => {
            ui::warn(&format!("'{}' is not a number, using speed 1.0", raw));
            Ok(1.0)
        }
    }
}
