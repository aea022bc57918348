use colored::Colorize;
use humansize::{format_size as human_size, DECIMAL};

use crate::core::probe::{is_lossy_extension, MediaInfo};

/// Format file size in human-readable format (kB, MB, GB)
pub fn format_size(size: u64) -> String {
    human_size(size, DECIMAL)
}

/// `mm:ss`, or `h:mm:ss` past the hour
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// `123.5 s (2.06 min)`
pub fn format_duration(secs: f64) -> String {
    format!("{:.1} s ({:.2} min)", secs, secs / 60.0)
}

pub fn format_bit_rate(bits_per_sec: u64) -> String {
    if bits_per_sec >= 1_000_000 {
        format!("{:.2} Mb/s", bits_per_sec as f64 / 1_000_000.0)
    } else {
        format!("{} kb/s", bits_per_sec / 1000)
    }
}

fn row(label: &str, value: String) {
    println!("  {:<14} {}", format!("{}:", label).dimmed(), value);
}

/// Prints the probe summary of a media file
pub fn print_media_info(info: &MediaInfo) {
    println!("{} {}", "File:".white().bold(), info.path.display());

    if let Some(duration) = info.duration {
        row("Duration", format_duration(duration));
    }
    if let Some(size) = info.size {
        row("Size", format_size(size));
    }
    if let Some(format) = &info.format_name {
        row("Container", format.clone());
    }

    if let Some(video) = &info.video {
        println!("{}", "Video".cyan());
        let mut resolution = format!("{}x{}", video.width, video.height);
        if info.is_full_hd() {
            resolution.push_str(" (Full HD)");
        }
        row("Resolution", resolution);
        if let Some(ratio) = info.aspect_ratio() {
            row("Aspect ratio", format!("{:.2}", ratio));
        }
        if let Some(fps) = video.fps {
            row("Frame rate", format!("{:.2} fps", fps));
        }
        if let Some(codec) = &video.codec {
            row("Codec", codec.clone());
        }
        if let Some(bit_rate) = video.bit_rate.or(info.bit_rate) {
            row("Bitrate", format_bit_rate(bit_rate));
        }
    }

    match &info.audio {
        Some(audio) => {
            println!("{}", "Audio".cyan());
            if let Some(codec) = &audio.codec {
                row("Codec", codec.clone());
            }
            if let Some(rate) = audio.sample_rate {
                let mut value = format!("{} Hz", rate);
                if info.is_cd_quality() {
                    value.push_str(" (CD quality)");
                }
                row("Sample rate", value);
            }
            if let Some(bits) = audio.bits_per_sample {
                row("Bit depth", format!("{} bit", bits));
            }
            if let Some(channels) = audio.channels {
                let layout = match channels {
                    1 => " (mono)",
                    2 => " (stereo)",
                    _ => "",
                };
                row("Channels", format!("{}{}", channels, layout));
            }
            if let Some(bit_rate) = info.audio_bit_rate() {
                row("Bitrate", format_bit_rate(bit_rate));
            }
            if let Some(ext) = info.extension() {
                let compression = if is_lossy_extension(&ext) {
                    "lossy"
                } else {
                    "lossless or uncompressed"
                };
                row("Compression", compression.to_string());
            }
        }
        None => println!("{}", "No audio stream".dimmed()),
    }
}
