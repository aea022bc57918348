// Audio/video conversion plans executed by ffmpeg

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::ffmpeg_manager::Toolchain;
use crate::core::probe::MediaInfo;
use crate::error::{AvError, Result};

pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "flac", "ogg", "m4a", "aac"];
pub const VIDEO_EXTENSIONS: [&str; 8] = ["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "m4v"];

pub const AUDIO_OUTPUT_FORMATS: [&str; 6] = ["mp3", "wav", "ogg", "m4a", "flac", "aac"];
pub const VIDEO_OUTPUT_FORMATS: [&str; 8] = ["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm", "m4v"];

/// atempo accepts factors in [0.5, 100]; steps are kept within [0.5, 2.0]
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn output_formats(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &AUDIO_OUTPUT_FORMATS,
            MediaKind::Video => &VIDEO_OUTPUT_FORMATS,
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &AUDIO_EXTENSIONS,
            MediaKind::Video => &VIDEO_EXTENSIONS,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// ffmpeg muxer name for an output extension
pub fn ffmpeg_muxer(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "m4a" => "ipod".to_string(),
        "aac" => "adts".to_string(),
        "mkv" => "matroska".to_string(),
        "wmv" => "asf".to_string(),
        "m4v" => "mp4".to_string(),
        other => other.to_string(),
    }
}

/// Video encoder for a container. WebM only carries VP8/VP9/AV1.
pub fn video_codec_for(ext: &str) -> &'static str {
    if ext.eq_ignore_ascii_case("webm") {
        "libvpx-vp9"
    } else {
        "libx264"
    }
}

pub fn validate_speed(speed: f64) -> Result<f64> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(AvError::InvalidSpeed(speed))
    }
}

/// Speed as shown in file names: always at least one decimal (`2.0`, `1.5`, `0.75`)
pub fn format_speed(speed: f64) -> String {
    if speed.fract() == 0.0 {
        format!("{:.1}", speed)
    } else {
        format!("{}", speed)
    }
}

/// `<stem>[_<speed>x].<format>` next to the input
pub fn output_path(input: &Path, format: &str, speed: f64) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut name = stem;
    if speed != 1.0 {
        name.push_str(&format!("_{}x", format_speed(speed)));
    }
    name.push('.');
    name.push_str(&format.to_lowercase());

    input.with_file_name(name)
}

/// True when both paths name the same file, ignoring case so `clip.MP3` and `clip.mp3`
/// collide the way they do on Windows and macOS
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    a == b || a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
}

/// Splits a tempo factor into atempo steps that each stay within [0.5, 2.0]
pub fn atempo_chain(speed: f64) -> Vec<f64> {
    let mut steps = Vec::new();
    let mut remaining = speed;

    while remaining > ATEMPO_MAX {
        steps.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        steps.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    if (remaining - 1.0).abs() > f64::EPSILON || steps.is_empty() {
        steps.push(remaining);
    }

    steps
}

fn atempo_filter(speed: f64) -> String {
    atempo_chain(speed)
        .iter()
        .map(|step| format!("atempo={}", step))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: MediaKind,
    pub format: String,
    pub speed: f64,
}

impl ConversionPlan {
    pub fn new(input: &Path, format: &str, speed: f64) -> Result<Self> {
        let kind = MediaKind::from_path(input).ok_or_else(|| {
            AvError::UnsupportedFormat(
                input
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "(no extension)".to_string()),
            )
        })?;

        let format = format.trim().trim_start_matches('.').to_lowercase();
        if !kind.output_formats().contains(&format.as_str()) {
            return Err(AvError::UnsupportedFormat(format!(
                "{} (supported {} formats: {})",
                format,
                kind,
                kind.output_formats().join(", ")
            )));
        }

        let speed = validate_speed(speed)?;

        let output = output_path(input, &format, speed);
        if is_same_file(input, &output) {
            return Err(AvError::OutputIsInput(output));
        }

        Ok(Self {
            input: input.to_path_buf(),
            output,
            kind,
            format,
            speed,
        })
    }

    /// Full ffmpeg argument list, using the probed input for sample rate and audio presence
    pub fn ffmpeg_args(&self, input_info: &MediaInfo) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), self.input.clone().into()];
        let speed_changed = self.speed != 1.0;

        match self.kind {
            MediaKind::Audio => {
                args.push("-vn".into());
                if speed_changed {
                    // resample trick: pitch moves together with tempo
                    let rate = input_info
                        .audio
                        .as_ref()
                        .and_then(|a| a.sample_rate)
                        .ok_or_else(|| AvError::probe("input has no audio sample rate"))?;
                    let shifted = (rate as f64 * self.speed).round() as u64;
                    args.push("-filter:a".into());
                    args.push(format!("asetrate={},aresample={}", shifted, rate).into());
                }
            }
            MediaKind::Video => {
                if speed_changed {
                    args.push("-filter:v".into());
                    args.push(format!("setpts=PTS/{}", self.speed).into());
                    if input_info.has_audio() {
                        args.push("-filter:a".into());
                        args.push(atempo_filter(self.speed).into());
                    }
                }
                args.push("-c:v".into());
                args.push(video_codec_for(&self.format).into());
                if self.format == "webm" {
                    args.push("-c:a".into());
                    args.push("libopus".into());
                }
            }
        }

        args.push("-f".into());
        args.push(ffmpeg_muxer(&self.format).into());
        args.push(self.output.clone().into());

        Ok(args)
    }

    /// Expected output duration in seconds
    pub fn expected_duration(&self, input_info: &MediaInfo) -> Option<f64> {
        input_info.duration.map(|d| d / self.speed)
    }
}

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub output_info: MediaInfo,
}

/// Runs a plan and probes the result
pub fn convert(
    tools: &Toolchain,
    plan: &ConversionPlan,
    input_info: &MediaInfo,
) -> Result<ConversionReport> {
    let args = plan.ffmpeg_args(input_info)?;
    log::info!(
        "Converting {} -> {} at {}x",
        plan.input.display(),
        plan.output.display(),
        plan.speed
    );

    tools.run_with_progress(&args, plan.expected_duration(input_info), "Converting")?;

    let output_info = tools.probe(&plan.output)?;
    Ok(ConversionReport {
        output: plan.output.clone(),
        output_info,
    })
}
