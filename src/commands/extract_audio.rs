use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::core::extract::{self, planned_output, AudioFormat};
use crate::core::FFmpegManager;
use crate::ui;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let assume_yes = matches.get_flag("yes");

    let video = match matches.get_one::<String>("video") {
        Some(video) => PathBuf::from(video),
        None => {
            let path = ui::input_text("Path to the video file", None)?;
            PathBuf::from(path.trim_matches('"'))
        }
    };

    let size = extract::check_source(&video)?;
    ui::dimmed(&format!(
        "{} ({})",
        video.display(),
        ui::format_size(size)
    ));

    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse::<AudioFormat>()?,
        None if assume_yes => AudioFormat::default(),
        None => {
            let default = AudioFormat::ALL
                .iter()
                .position(|f| *f == AudioFormat::default())
                .unwrap_or(0);
            AudioFormat::ALL[ui::select_index("Audio format", &AudioFormat::ALL, default)?]
        }
    };

    let output = planned_output(&video, format)?;
    if !assume_yes {
        let (question, default) = extraction_question(format, &output);
        if !ui::confirm(&question, default)? {
            ui::dimmed("Cancelled");
            return Ok(());
        }
    }

    let tools = FFmpegManager::new()?.toolchain()?;
    let report = extract::extract_audio(&tools, &video, format)?;

    if !report.output.is_file() {
        bail!("ffmpeg finished but {} was not written", report.output.display());
    }

    if report.fell_back {
        ui::warn(&format!("{} failed, saved as {} instead", format, report.format));
    }
    ui::success(&format!("✓ Audio saved to {}", report.output.display()));

    Ok(())
}

/// Only an explicit yes starts the extraction
fn extraction_question(format: AudioFormat, output: &Path) -> (String, bool) {
    (
        format!("Extract {} audio to {}?", format, output.display()),
        false,
    )
}
