// FFmpegManager - Locates ffmpeg/ffprobe and runs them
use anyhow::Result as AnyResult;
use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::core::probe::{self, MediaInfo};
use crate::core::Config;
use crate::error::{AvError, Result};
use crate::ui::{clear_line, show_time_progress};

static MEAN_VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mean_volume:\s*(-?(?:inf|[\d.]+)) dB").expect("valid regex"));
static MAX_VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"max_volume:\s*(-?(?:inf|[\d.]+)) dB").expect("valid regex"));

#[derive(Default)]
pub struct FFmpegManager {
    config: Config,
}

impl FFmpegManager {
    pub fn new() -> AnyResult<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Configured ffmpeg path, if any
    pub fn get_binary_path(&self) -> Option<PathBuf> {
        self.config.get_ffmpeg_path().map(PathBuf::from)
    }

    /// Resolve ffmpeg: configured path first, then the system PATH
    pub fn ensure_ffmpeg(&self) -> Result<PathBuf> {
        if let Some(path) = self.get_binary_path() {
            if path.exists() {
                return Ok(path);
            }
            return Err(AvError::config(format!(
                "configured ffmpeg path does not exist: {}",
                path.display()
            )));
        }

        which::which("ffmpeg").map_err(|_| AvError::tool_not_found("ffmpeg"))
    }

    /// Resolve ffprobe: next to a configured ffmpeg, then the system PATH
    pub fn ensure_ffprobe(&self) -> Result<PathBuf> {
        if let Some(sibling) = self
            .get_binary_path()
            .as_deref()
            .and_then(Path::parent)
            .map(|dir| dir.join(format!("ffprobe{}", std::env::consts::EXE_SUFFIX)))
        {
            if sibling.exists() {
                return Ok(sibling);
            }
        }

        which::which("ffprobe").map_err(|_| AvError::tool_not_found("ffprobe"))
    }

    /// Both binaries, ready to use
    pub fn toolchain(&self) -> Result<Toolchain> {
        Ok(Toolchain {
            ffmpeg: self.ensure_ffmpeg()?,
            ffprobe: self.ensure_ffprobe()?,
        })
    }
}

/// Resolved ffmpeg and ffprobe binaries
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLevels {
    /// Mean (RMS) level in dBFS
    pub mean_db: f64,
    /// Peak level in dBFS
    pub max_db: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ProgressEvent {
    OutTime(f64),
    End,
}

impl Toolchain {
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        probe::probe(&self.ffprobe, path)
    }

    /// Runs ffmpeg with `args`, drawing a progress bar from `-progress pipe:1` output.
    /// `total_secs` is the expected output duration; without it only the final status is shown.
    pub fn run_with_progress(
        &self,
        args: &[OsString],
        total_secs: Option<f64>,
        label: &str,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AvError::tool_not_found("ffmpeg")
            } else {
                AvError::Io(e)
            }
        })?;

        // drain stderr on its own thread so a chatty ffmpeg never blocks on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let total_secs = total_secs.filter(|t| *t > 0.0);

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line?;
                match (parse_progress_line(&line), total_secs) {
                    (Some(ProgressEvent::OutTime(secs)), Some(total)) => {
                        show_time_progress(secs, total, label);
                    }
                    (Some(ProgressEvent::End), Some(total)) => {
                        show_time_progress(total, total, label);
                    }
                    _ => {}
                }
            }
        }

        let status = child.wait()?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if total_secs.is_some() {
            println!();
        } else {
            clear_line();
        }

        if !status.success() {
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            for line in tail.iter().rev() {
                println!("  {}", line.dimmed());
            }
            return Err(AvError::tool_failed("ffmpeg", status));
        }

        Ok(())
    }

    /// Peak and mean level through the `volumedetect` filter
    pub fn volume_levels(&self, path: &Path) -> Result<VolumeLevels> {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostats", "-i"])
            .arg(path)
            .args(["-vn", "-af", "volumedetect", "-f", "null", "-"])
            .output()?;

        if !output.status.success() {
            return Err(AvError::tool_failed("ffmpeg", output.status));
        }

        parse_volumedetect(&String::from_utf8_lossy(&output.stderr))
            .ok_or_else(|| AvError::probe("volumedetect produced no levels"))
    }

    /// `ffmpeg -version` first line
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.ffmpeg).arg("-version").output()?;
        if !output.status.success() {
            return Err(AvError::tool_failed("ffmpeg", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}

fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // both keys carry microseconds
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .map(|us| ProgressEvent::OutTime(us as f64 / 1_000_000.0)),
        "progress" if value == "end" => Some(ProgressEvent::End),
        _ => None,
    }
}

fn parse_level(re: &Regex, text: &str) -> Option<f64> {
    let raw = re.captures(text)?.get(1)?.as_str();
    match raw {
        "-inf" => Some(f64::NEG_INFINITY),
        "inf" => Some(f64::INFINITY),
        _ => raw.parse().ok(),
    }
}

pub fn parse_volumedetect(stderr: &str) -> Option<VolumeLevels> {
    Some(VolumeLevels {
        mean_db: parse_level(&MEAN_VOLUME, stderr)?,
        max_db: parse_level(&MAX_VOLUME, stderr)?,
    })
}
