// Audio track extraction from video files

use colored::Colorize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::convert::is_same_file;
use crate::core::ffmpeg_manager::Toolchain;
use crate::error::{AvError, Result};

/// Files below this size are treated as damaged downloads
pub const MIN_SOURCE_SIZE: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
    M4a,
    Flac,
    Aac,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Ogg,
        AudioFormat::M4a,
        AudioFormat::Flac,
        AudioFormat::Aac,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
        }
    }

    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Ogg => "libvorbis",
            AudioFormat::M4a | AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

impl FromStr for AudioFormat {
    type Err = AvError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().trim_start_matches('.').to_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or(AvError::UnsupportedFormat(wanted))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub output: PathBuf,
    pub format: AudioFormat,
    /// The requested format failed and mp3 was written instead
    pub fell_back: bool,
}

/// `<dir>/<stem>.<ext>` next to the video
pub fn audio_output_path(video: &Path, format: AudioFormat) -> PathBuf {
    video.with_extension(format.extension())
}

/// Output path for `format`, refusing one that would overwrite the video itself
pub fn planned_output(video: &Path, format: AudioFormat) -> Result<PathBuf> {
    let output = audio_output_path(video, format);
    if is_same_file(video, &output) {
        return Err(AvError::OutputIsInput(output));
    }
    Ok(output)
}

/// Checks that the source exists and is not suspiciously small; returns its size
pub fn check_source(video: &Path) -> Result<u64> {
    let metadata = fs::metadata(video).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            AvError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file does not exist: {}", video.display()),
            ))
        } else {
            AvError::Io(e)
        }
    })?;

    let size = metadata.len();
    if size < MIN_SOURCE_SIZE {
        return Err(AvError::FileTooSmall {
            path: video.to_path_buf(),
            size,
        });
    }

    Ok(size)
}

fn extraction_args(video: &Path, output: &Path, format: AudioFormat) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        video.as_os_str().to_os_string(),
        "-vn".into(),
        "-c:a".into(),
        format.codec().into(),
        output.as_os_str().to_os_string(),
    ]
}

/// Writes the audio track of `video` in `format`, falling back to mp3 once if the
/// requested encoder fails.
pub fn extract_audio(
    tools: &Toolchain,
    video: &Path,
    format: AudioFormat,
) -> Result<ExtractionReport> {
    check_source(video)?;
    let output = planned_output(video, format)?;

    let info = tools.probe(video)?;
    if !info.has_audio() {
        return Err(AvError::NoAudioStream(video.to_path_buf()));
    }

    let args = extraction_args(video, &output, format);

    match tools.run_with_progress(&args, info.duration, "Extracting") {
        Ok(()) => Ok(ExtractionReport {
            output,
            format,
            fell_back: false,
        }),
        Err(e) if format != AudioFormat::Mp3
            && !is_same_file(video, &audio_output_path(video, AudioFormat::Mp3)) =>
        {
            println!(
                "{}",
                format!("Could not write {} audio: {}", format, e).yellow()
            );
            println!("{}", "Retrying as MP3...".cyan());
            let _ = fs::remove_file(&output);

            let fallback = audio_output_path(video, AudioFormat::Mp3);
            let args = extraction_args(video, &fallback, AudioFormat::Mp3);
            tools.run_with_progress(&args, info.duration, "Extracting")?;

            Ok(ExtractionReport {
                output: fallback,
                format: AudioFormat::Mp3,
                fell_back: true,
            })
        }
        Err(e) => Err(e),
    }
}
