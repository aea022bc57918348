use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DOWNLOAD_DIR: &str = "./download";
pub const DEFAULT_MAX_ROUNDS: u32 = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub download_dir: Option<String>,
    /// Netscape cookie file passed to yt-dlp
    #[serde(default)]
    pub cookie_file: Option<String>,
    /// Browser to read cookies from (chrome, firefox, ...)
    #[serde(default)]
    pub cookies_from_browser: Option<String>,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub yt_dlp_path: Option<String>,
    #[serde(default)]
    pub yt_dlp_installed_by_avtool: bool,
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path. Missing, empty or unreadable files yield defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("avtool").join("config.json"))
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(
            self.download_dir
                .as_deref()
                .unwrap_or(DEFAULT_DOWNLOAD_DIR),
        )
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn get_yt_dlp_path(&self) -> Option<&String> {
        self.yt_dlp_path.as_ref()
    }

    pub fn set_yt_dlp_path(&mut self, path: String) {
        self.yt_dlp_path = Some(path);
    }

    pub fn set_yt_dlp_installed_by_avtool(&mut self, installed: bool) {
        self.yt_dlp_installed_by_avtool = installed;
    }

    pub fn get_ffmpeg_path(&self) -> Option<&String> {
        self.ffmpeg_path.as_ref()
    }

    /// Apply a `config set <key> <value>` pair
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "download-dir" => self.download_dir = Some(value.to_string()),
            "cookies" => self.cookie_file = Some(value.to_string()),
            "browser" => {
                let browser = value.to_lowercase();
                anyhow::ensure!(
                    crate::core::download::SUPPORTED_BROWSERS.contains(&browser.as_str()),
                    "Unsupported browser '{}'. Supported: {}",
                    value,
                    crate::core::download::SUPPORTED_BROWSERS.join(", ")
                );
                self.cookies_from_browser = Some(browser);
            }
            "rounds" => self.max_rounds = Some(parse_positive(key, value)?),
            "retries" => self.max_retries = Some(parse_positive(key, value)?),
            "ffmpeg" => self.ffmpeg_path = Some(value.to_string()),
            "yt-dlp" => {
                self.yt_dlp_path = Some(value.to_string());
                self.yt_dlp_installed_by_avtool = false;
            }
            _ => anyhow::bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

pub const CONFIG_KEYS: [&str; 7] = [
    "download-dir",
    "cookies",
    "browser",
    "rounds",
    "retries",
    "ffmpeg",
    "yt-dlp",
];

fn parse_positive(key: &str, value: &str) -> Result<u32> {
    let n: u32 = value
        .parse()
        .with_context(|| format!("'{}' expects a whole number, got '{}'", key, value))?;
    anyhow::ensure!(n >= 1, "'{}' must be at least 1", key);
    Ok(n)
}
