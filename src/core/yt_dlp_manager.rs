use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::{ChecksumManager, Config};

const RELEASES_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases";

/// Releases older than this year are reported as outdated
const MIN_RECOMMENDED_YEAR: u32 = 2025;

pub struct YtDlpManager {
    config: Config,
}

impl YtDlpManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Configured binary exists on disk
    pub fn is_installed(&self) -> bool {
        if let Some(path) = self.config.get_yt_dlp_path() {
            Path::new(path).exists()
        } else {
            false
        }
    }

    pub fn get_binary_path(&self) -> Option<PathBuf> {
        self.config.get_yt_dlp_path().map(PathBuf::from)
    }

    /// Release asset for the current platform
    pub fn asset_name() -> &'static str {
        if cfg!(windows) {
            "yt-dlp.exe"
        } else if cfg!(target_os = "macos") {
            "yt-dlp_macos"
        } else {
            "yt-dlp_linux"
        }
    }

    /// Latest release tag, read from the redirect of /releases/latest
    pub fn get_latest_version() -> Result<String> {
        println!("{}", "Checking latest yt-dlp release...".cyan());

        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let response = client.get(format!("{}/latest", RELEASES_URL)).send()?;

        // https://github.com/yt-dlp/yt-dlp/releases/tag/2025.11.12 -> 2025.11.12
        if let Some(location) = response.headers().get("Location") {
            if let Some(version) = location.to_str()?.split("/tag/").nth(1) {
                println!(
                    "{} {}",
                    "Latest release:".green(),
                    version.yellow().bold()
                );
                return Ok(version.to_string());
            }
        }

        Err(anyhow!("Could not determine the latest yt-dlp release"))
    }

    fn release_file(version: &str, name: &str) -> Result<Vec<u8>> {
        let url = format!("{}/download/{}/{}", RELEASES_URL, version, name);
        log::debug!("GET {}", url);

        let response = reqwest::blocking::get(&url)
            .with_context(|| format!("Failed to download {}", name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP {}: could not download {}",
                response.status(),
                name
            ));
        }

        Ok(response.bytes()?.to_vec())
    }

    /// Downloads the platform binary and checks it against the release's SHA2-256SUMS
    pub fn download_binary(version: &str) -> Result<Vec<u8>> {
        let asset = Self::asset_name();

        println!("{}", "Downloading yt-dlp...".cyan());
        let binary = Self::release_file(version, asset)?;
        println!("{} {} bytes", "Downloaded:".green(), binary.len());

        let listing = Self::release_file(version, "SHA2-256SUMS")?;
        let expected =
            ChecksumManager::find_in_listing(&String::from_utf8_lossy(&listing), asset)
                .ok_or_else(|| anyhow!("No checksum published for {}", asset))?;
        ChecksumManager::verify_bytes(&binary, &expected)
            .context("Downloaded yt-dlp failed checksum verification")?;

        println!("{}", "✓ Checksum verified".green());
        Ok(binary)
    }

    /// Installs the latest release into the avtool data directory
    pub fn install(&mut self) -> Result<PathBuf> {
        let version = Self::get_latest_version()?;
        let binary_data = Self::download_binary(&version)?;

        let install_dir = Self::get_install_dir()?;
        fs::create_dir_all(&install_dir)?;

        let binary_path = install_dir.join(Self::asset_name());
        fs::write(&binary_path, binary_data).context("Failed to write yt-dlp binary")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&binary_path, fs::Permissions::from_mode(0o755))
                .context("Failed to mark yt-dlp as executable")?;
        }

        self.config
            .set_yt_dlp_path(binary_path.to_string_lossy().to_string());
        self.config.set_yt_dlp_installed_by_avtool(true);
        self.config.save()?;

        println!("{}", "✓ yt-dlp ready".green());
        println!();

        Ok(binary_path)
    }

    fn get_install_dir() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().context("Could not determine the configuration directory")?;

        Ok(config_dir.join("avtool").join("bin"))
    }

    fn check_system_ytdlp() -> Option<PathBuf> {
        which::which("yt-dlp").ok()
    }

    /// Resolves yt-dlp
    /// 1. Path stored in the configuration
    /// 2. System PATH
    /// 3. Fresh install from GitHub releases
    pub fn ensure_yt_dlp(&mut self) -> Result<PathBuf> {
        if self.is_installed() {
            if let Some(path) = self.get_binary_path() {
                return Ok(path);
            }
        }

        if let Some(system_path) = Self::check_system_ytdlp() {
            return Ok(system_path);
        }

        println!();
        println!("{}", "🔧 yt-dlp not found, installing...".cyan());
        self.install()
    }

    /// `yt-dlp --version`
    pub fn version(yt_dlp: &Path) -> Result<String> {
        let output = Command::new(yt_dlp)
            .arg("--version")
            .output()
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            return Err(anyhow!("yt-dlp --version failed: {}", output.status));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Versions are date based (`2024.12.23`); anything before 2025 is considered stale
    pub fn is_outdated(version: &str) -> bool {
        version
            .split('.')
            .next()
            .and_then(|year| year.trim().parse::<u32>().ok())
            .is_some_and(|year| year < MIN_RECOMMENDED_YEAR)
    }
}
