// Input validation and file name sanitizing for download and conversion commands

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{AvError, Result};

/// Maximum URL length accepted by the download commands
const MAX_URL_LENGTH: usize = 2048;

/// Maximum output file name length
const MAX_OUTPUT_LENGTH: usize = 255;

/// Characters that are illegal in file names on at least one of Windows/macOS/Linux
static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid regex"));

/// Returns `AvError::InvalidInput` with the formatted message unless the condition holds
macro_rules! require {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(AvError::invalid_input(format!($($arg)+)));
        }
    };
}

/// Validates a URL before it is handed to yt-dlp or the HTTP client
///
/// The URL must be http(s), parse with the `url` crate and carry a hostname.
/// Shell metacharacters are rejected even though arguments never pass through a shell.
pub fn validate_url(url_str: &str) -> Result<()> {
    let trimmed = url_str.trim();

    require!(!trimmed.is_empty(), "URL cannot be empty");
    require!(
        url_str.len() <= MAX_URL_LENGTH,
        "URL is too long ({} characters, max {})",
        url_str.len(),
        MAX_URL_LENGTH
    );
    require!(
        trimmed.starts_with("http://") || trimmed.starts_with("https://"),
        "URL must start with http:// or https://"
    );
    require!(!url_str.contains('\0'), "URL contains null byte");

    const DANGEROUS_CHARS: [&str; 5] = [";", "|", "`", "\n", "\r"];
    for ch in DANGEROUS_CHARS {
        require!(
            !trimmed.contains(ch),
            "URL contains dangerous character {:?}",
            ch
        );
    }
    require!(
        !trimmed.contains("$("),
        "URL contains command substitution pattern $()"
    );
    // "?a=1&b=2" is fine, "url & whoami" is not
    require!(
        !trimmed.contains("& ") && !trimmed.contains(" &"),
        "URL contains shell operator with space"
    );

    let url = Url::parse(trimmed)
        .map_err(|e| AvError::invalid_input(format!("Invalid URL format: {}", e)))?;
    require!(
        url.scheme() == "http" || url.scheme() == "https",
        "URL must use http or https protocol, got: {}",
        url.scheme()
    );
    require!(url.host_str().is_some(), "URL has no hostname");

    Ok(())
}

/// Validates a user supplied output file name (no directories, no traversal)
pub fn validate_output_name(output: &str) -> Result<()> {
    let trimmed = output.trim();
    require!(!trimmed.is_empty(), "Output name cannot be empty");
    require!(
        !output.contains(".."),
        "Output name contains path traversal (..)"
    );
    require!(
        !output.starts_with('/') && !output.starts_with('\\'),
        "Output name should be relative, not absolute: {}",
        output
    );
    if output.len() >= 2 {
        require!(
            output.chars().nth(1) != Some(':'),
            "Output name should not contain drive letters: {}",
            output
        );
    }
    require!(!output.contains('\0'), "Output name contains null byte");

    const DANGEROUS_CHARS: [char; 7] = ['|', '&', ';', '$', '`', '\n', '\r'];
    for ch in DANGEROUS_CHARS {
        require!(
            !output.contains(ch),
            "Output name contains dangerous character '{}'",
            ch
        );
    }

    require!(
        output.len() <= MAX_OUTPUT_LENGTH,
        "Output name is too long ({} characters, max {})",
        output.len(),
        MAX_OUTPUT_LENGTH
    );

    Ok(())
}

/// Replaces characters that are not allowed in file names with `_` and trims whitespace
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_FILENAME_CHARS
        .replace_all(name, "_")
        .trim()
        .to_string()
}

/// Sanitized title, or a `YYYYmmdd_HHMMSS` timestamp when nothing usable is left
pub fn file_stem_or_timestamp(title: &str) -> String {
    let clean = sanitize_filename(title);
    if clean.is_empty() {
        Local::now().format("%Y%m%d_%H%M%S").to_string()
    } else {
        clean
    }
}
