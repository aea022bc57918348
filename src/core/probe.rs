// Media metadata through ffprobe's JSON output

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AvError, Result};

/// Extensions treated as lossy when describing audio files
const LOSSY_EXTENSIONS: [&str; 3] = ["mp3", "aac", "m4a"];

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

// ffprobe prints most numbers as strings
#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bits_per_sample: Option<u32>,
    bits_per_raw_sample: Option<String>,
    sample_fmt: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub bit_rate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub bit_rate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub format_name: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Bytes
    pub size: Option<u64>,
    pub bit_rate: Option<u64>,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
}

impl MediaInfo {
    pub fn from_probe_json(path: &Path, json: &str) -> Result<Self> {
        let output: ProbeOutput = serde_json::from_str(json)?;
        let format = output.format.unwrap_or_default();

        // cover art shows up as a one-frame video stream; skip attached pictures by codec
        let video = output
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("video"))
            .find(|s| !matches!(s.codec_name.as_deref(), Some("mjpeg" | "png" | "bmp")))
            .map(|s| VideoStream {
                codec: s.codec_name.clone(),
                width: s.width.unwrap_or(0),
                height: s.height.unwrap_or(0),
                fps: s
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_rate)
                    .or_else(|| s.r_frame_rate.as_deref().and_then(parse_rate)),
                bit_rate: parse_num(&s.bit_rate),
            });

        let audio = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .map(|s| AudioStream {
                codec: s.codec_name.clone(),
                sample_rate: parse_num(&s.sample_rate),
                channels: s.channels,
                bits_per_sample: bits_per_sample(s),
                bit_rate: parse_num(&s.bit_rate),
            });

        Ok(MediaInfo {
            path: path.to_path_buf(),
            format_name: format.format_name,
            duration: format.duration.as_deref().and_then(|d| d.parse().ok()),
            size: parse_num(&format.size),
            bit_rate: parse_num(&format.bit_rate),
            video,
            audio,
        })
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn is_full_hd(&self) -> bool {
        self.video
            .as_ref()
            .is_some_and(|v| v.width == 1920 && v.height == 1080)
    }

    /// Width / height
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.video
            .as_ref()
            .filter(|v| v.height > 0)
            .map(|v| v.width as f64 / v.height as f64)
    }

    /// At least 44.1 kHz and 16 bit
    pub fn is_cd_quality(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| {
            a.sample_rate.unwrap_or(0) >= 44_100 && a.bits_per_sample.unwrap_or(0) >= 16
        })
    }

    /// Stream bitrate, falling back to the container's
    pub fn audio_bit_rate(&self) -> Option<u64> {
        self.audio
            .as_ref()
            .and_then(|a| a.bit_rate)
            .or(self.bit_rate)
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Extension based lossy/lossless label used in info output
pub fn is_lossy_extension(ext: &str) -> bool {
    LOSSY_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Parses ffprobe rates such as `30000/1001` or `25`
pub fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value > 0.0).then_some(value)
}

fn parse_num<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|v| v.parse().ok())
}

fn bits_per_sample(stream: &ProbeStream) -> Option<u32> {
    stream
        .bits_per_sample
        .filter(|b| *b > 0)
        .or_else(|| parse_num::<u32>(&stream.bits_per_raw_sample).filter(|b| *b > 0))
        .or_else(|| match stream.sample_fmt.as_deref()? {
            "u8" | "u8p" => Some(8),
            "s16" | "s16p" => Some(16),
            "s32" | "s32p" | "flt" | "fltp" => Some(32),
            "s64" | "s64p" | "dbl" | "dblp" => Some(64),
            _ => None,
        })
}

/// Runs ffprobe on `path`
pub fn probe(ffprobe: &Path, path: &Path) -> Result<MediaInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AvError::tool_not_found("ffprobe")
            } else {
                AvError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(AvError::probe(format!(
            "ffprobe could not read {} ({})",
            path.display(),
            output.status
        )));
    }

    MediaInfo::from_probe_json(path, &String::from_utf8_lossy(&output.stdout))
}
