// Video downloads through yt-dlp and plain HTTP
// Both paths run under run_rounds; every round after the first needs the user's go-ahead

use colored::Colorize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::formats::VideoInfo;
use crate::core::retry::{run_rounds, RetryOutcome, RetryPolicy, RoundDriver};
use crate::core::Config;
use crate::error::{AvError, Result};
use crate::ui::{clear_line, show_transfer_progress};

pub const SUPPORTED_BROWSERS: [&str; 7] = [
    "chrome", "firefox", "edge", "safari", "opera", "brave", "chromium",
];

/// yt-dlp's message when the `-f` expression matches nothing
pub const FORMAT_UNAVAILABLE_MARKER: &str = "Requested format is not available";

pub const DEFAULT_COOKIE_FILE: &str = "cookies.txt";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0.6367.93 Safari/537.36";

const ARIA2C_ARGS: &str = "aria2c:--min-split-size=1M --max-connection-per-server=16 \
--split=32 --auto-file-renaming=false";

const DIRECT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Longest a single read of the body may stall before the attempt fails
pub const DIRECT_READ_TIMEOUT: Duration = Duration::from_secs(15);
const CHUNK_SIZE: usize = 8192;

/// How yt-dlp authenticates against the site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthOptions {
    #[default]
    None,
    CookieFile(PathBuf),
    Browser(String),
}

impl AuthOptions {
    pub fn args(&self) -> Vec<OsString> {
        match self {
            AuthOptions::None => Vec::new(),
            AuthOptions::CookieFile(path) => vec!["--cookies".into(), path.clone().into()],
            AuthOptions::Browser(browser) => {
                vec!["--cookies-from-browser".into(), browser.into()]
            }
        }
    }

    /// `cookies.txt` in `dir` when it exists
    pub fn default_for(dir: &Path) -> Self {
        let file = dir.join(DEFAULT_COOKIE_FILE);
        if file.is_file() {
            AuthOptions::CookieFile(file)
        } else {
            AuthOptions::None
        }
    }

    /// Cookie file first, then browser, from the saved configuration
    pub fn from_config(config: &Config) -> Option<Self> {
        if let Some(file) = &config.cookie_file {
            return Some(AuthOptions::CookieFile(PathBuf::from(file)));
        }
        config
            .cookies_from_browser
            .as_ref()
            .map(|b| AuthOptions::Browser(b.clone()))
    }

    /// Saved configuration, else `cookies.txt` in the working directory
    pub fn configured_or_default(config: &Config) -> Self {
        Self::from_config(config).unwrap_or_else(|| {
            std::env::current_dir()
                .map(|dir| Self::default_for(&dir))
                .unwrap_or_default()
        })
    }

    pub fn describe(&self) -> String {
        match self {
            AuthOptions::None => "none".to_string(),
            AuthOptions::CookieFile(path) => format!("cookie file {}", path.display()),
            AuthOptions::Browser(browser) => format!("cookies from {}", browser),
        }
    }
}

/// `yt-dlp -J`: title and formats without downloading
pub fn fetch_info(yt_dlp: &Path, url: &str, auth: &AuthOptions) -> Result<VideoInfo> {
    let mut cmd = Command::new(yt_dlp);
    cmd.args(["-J", "--skip-download", "--no-warnings", "--no-playlist"])
        .args(auth.args())
        .arg(url);

    log::debug!("Running {:?}", cmd);
    let output = cmd.output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<String> = stderr.lines().map(String::from).collect();
        return Err(classify_failure(&lines, output.status));
    }

    VideoInfo::from_json(&String::from_utf8_lossy(&output.stdout))
}

/// `<dir>/<stem>.%(ext)s`
pub fn output_template(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.%(ext)s", stem))
}

pub fn proxy_from_env() -> Option<String> {
    ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

/// Network options for slow or throttled connections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuning {
    pub proxy: Option<String>,
    /// Use aria2c as the external downloader
    pub aria2c: bool,
}

impl Tuning {
    pub fn detect() -> Self {
        Self {
            proxy: proxy_from_env(),
            aria2c: which::which("aria2c").is_ok(),
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--retries",
            "10",
            "--fragment-retries",
            "10",
            "--throttled-rate",
            "1M",
            "--socket-timeout",
            "300",
            "--retry-sleep",
            "30",
            "--force-ipv4",
            "--no-check-certificates",
            "--extractor-args",
            "youtube:player_client=android_embedded,web_mobile;player_skip=configs;skip=hls,dash,translated_subs",
            "--compat-options",
            "no-live-chat",
            "--user-agent",
            USER_AGENT,
            "--add-header",
            "Accept-Language:en-US,en;q=0.9",
            "--add-header",
            "Referer:https://www.youtube.com/",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }

        if self.aria2c {
            args.push("--downloader".into());
            args.push("aria2c".into());
            args.push("--downloader-args".into());
            args.push(ARIA2C_ARGS.into());
        }

        args
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub yt_dlp: PathBuf,
    pub url: String,
    pub output_template: PathBuf,
    /// yt-dlp `-f` expression
    pub format: String,
    pub auth: AuthOptions,
    pub tuning: Option<Tuning>,
}

impl DownloadRequest {
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            self.format.clone().into(),
            "-o".into(),
            self.output_template.clone().into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "--continue".into(),
            "--no-playlist".into(),
        ];
        args.extend(self.auth.args());
        if let Some(tuning) = &self.tuning {
            args.extend(tuning.args());
        }
        args.push(self.url.clone().into());
        args
    }
}

/// Maps a failed yt-dlp run to an error, recognising the unavailable-format case
pub fn classify_failure(stderr_lines: &[String], status: ExitStatus) -> AvError {
    if let Some(line) = stderr_lines
        .iter()
        .find(|l| l.contains(FORMAT_UNAVAILABLE_MARKER))
    {
        return AvError::FormatUnavailable(line.trim().to_string());
    }

    let reason = stderr_lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status));

    AvError::download_failed(reason)
}

/// Runs one yt-dlp download. Progress output goes straight to the terminal; stderr is
/// echoed line by line and kept for classifying failures.
pub fn run_yt_dlp(request: &DownloadRequest) -> Result<()> {
    let mut cmd = Command::new(&request.yt_dlp);
    cmd.args(request.args())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());

    log::debug!("Running {:?}", cmd);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AvError::tool_not_found("yt-dlp")
        } else {
            AvError::Io(e)
        }
    })?;

    let lines = match child.stderr.take() {
        Some(stderr) => echo_lines(stderr),
        None => Ok(Vec::new()),
    };

    // Reap the child before reporting a read error so no yt-dlp is left running
    let status = child.wait()?;
    let lines = lines?;
    if status.success() {
        Ok(())
    } else {
        Err(classify_failure(&lines, status))
    }
}

/// Echoes every line of `stream` to stderr and collects them; bytes that are not UTF-8
/// (console code pages) are replaced rather than treated as an error
fn echo_lines<R: Read>(stream: R) -> Result<Vec<String>> {
    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        eprintln!("{}", line);
        lines.push(line);
    }

    Ok(lines)
}

/// `yt-dlp -F`, printed for the user to pick a format id from
pub fn list_formats(yt_dlp: &Path, url: &str, auth: &AuthOptions) -> Result<()> {
    let status = Command::new(yt_dlp)
        .args(["-F", "--no-warnings", "--no-playlist"])
        .args(auth.args())
        .arg(url)
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(AvError::tool_failed("yt-dlp", status))
    }
}

/// User decisions needed while a download is retried
pub trait DownloadPrompt {
    /// Start round `round + 1` after round `round` failed?
    fn continue_next_round(&mut self, round: u32) -> Result<bool>;

    /// Format id to use after yt-dlp rejected the requested one; `None` skips recovery
    fn replacement_format(&mut self) -> Result<Option<String>>;
}

struct YtDlpDriver<'a, P: DownloadPrompt + ?Sized> {
    request: DownloadRequest,
    prompt: &'a mut P,
}

impl<P: DownloadPrompt + ?Sized> RoundDriver for YtDlpDriver<'_, P> {
    fn attempt(&mut self, round: u32, retry: u32) -> Result<()> {
        println!();
        println!(
            "{}",
            format!("----- Round {}, attempt {} -----", round, retry).cyan()
        );

        run_yt_dlp(&self.request).inspect_err(|e| {
            println!("{} {}", "Download error:".red(), e);
        })
    }

    fn recover_format(&mut self, _error: &AvError) -> Result<bool> {
        println!(
            "{}",
            "Requested format is not available, listing all formats...".yellow()
        );
        list_formats(&self.request.yt_dlp, &self.request.url, &self.request.auth)?;

        match self.prompt.replacement_format()? {
            Some(format_id) => {
                log::info!("Retrying with user selected format {}", format_id);
                self.request.format = format_id;
                run_yt_dlp(&self.request)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn continue_after_round(&mut self, round: u32) -> Result<bool> {
        self.prompt.continue_next_round(round)
    }
}

/// Downloads `request` with rounds of retries
pub fn download_with_rounds<P: DownloadPrompt + ?Sized>(
    request: DownloadRequest,
    policy: RetryPolicy,
    prompt: &mut P,
) -> Result<RetryOutcome> {
    let mut driver = YtDlpDriver { request, prompt };
    let outcome = run_rounds(policy, &mut driver)?;

    if let RetryOutcome::Exhausted { rounds } = outcome {
        println!(
            "{}",
            format!("Reached the maximum of {} rounds, all attempts failed.", rounds).red()
        );
    }

    Ok(outcome)
}

/// A single file fetched over plain HTTP
pub struct HttpDownload {
    pub url: String,
    pub path: PathBuf,
    client: reqwest::blocking::Client,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl HttpDownload {
    pub fn new(url: &str, path: &Path, cancel_flag: Option<Arc<AtomicBool>>) -> Result<Self> {
        let client = Self::client_builder(DIRECT_READ_TIMEOUT).build()?;
        Ok(Self::with_client(url, path, client, cancel_flag))
    }

    /// Client settings for direct downloads. The blocking client applies `read_timeout`
    /// to every read of the body, so a stalled server fails the attempt instead of hanging.
    pub fn client_builder(read_timeout: Duration) -> reqwest::blocking::ClientBuilder {
        reqwest::blocking::Client::builder()
            .connect_timeout(DIRECT_CONNECT_TIMEOUT)
            .timeout(read_timeout)
            .user_agent(USER_AGENT)
    }

    pub fn with_client(
        url: &str,
        path: &Path,
        client: reqwest::blocking::Client,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            url: url.to_string(),
            path: path.to_path_buf(),
            client,
            cancel_flag,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// `<path>.part`, where the body is written until it is complete
    pub fn part_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        self.path.with_file_name(name)
    }

    /// Streams the body to the part file and renames it to `path` once every byte has
    /// arrived. On error the part file is removed and `path` is left untouched.
    pub fn fetch_once(&self) -> Result<u64> {
        let part = self.part_path();
        match self.stream_to(&part) {
            Ok(written) => {
                fs::rename(&part, &self.path)?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(e)
            }
        }
    }

    fn stream_to(&self, target: &Path) -> Result<u64> {
        let mut response = self.client.get(&self.url).send()?.error_for_status()?;
        let total = response.content_length();

        let mut file = File::create(target)?;
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            if self.is_cancelled() {
                return Err(AvError::Cancelled);
            }

            let n = response.read(&mut buffer).inspect_err(|_| clear_line())?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            written += n as u64;

            if let Some(total) = total {
                show_transfer_progress(written, total, "Downloading");
            }
        }

        file.flush()?;
        if total.is_some() {
            println!();
        } else {
            clear_line();
        }

        if let Some(total) = total {
            if written < total {
                return Err(AvError::download_failed(format!(
                    "connection closed after {} of {} bytes",
                    written, total
                )));
            }
        }

        Ok(written)
    }
}

struct DirectDriver<'a, P: DownloadPrompt + ?Sized> {
    download: HttpDownload,
    max_retries: u32,
    prompt: &'a mut P,
}

impl<P: DownloadPrompt + ?Sized> RoundDriver for DirectDriver<'_, P> {
    fn attempt(&mut self, round: u32, retry: u32) -> Result<()> {
        if retry == 1 {
            println!();
            println!(
                "{}",
                format!(
                    "----- Round {}, up to {} attempts -----",
                    round, self.max_retries
                )
                .cyan()
            );
        }
        println!("{}", format!("[attempt {}/{}]", retry, self.max_retries).dimmed());

        match self.download.fetch_once() {
            Ok(bytes) => {
                log::info!("Wrote {} bytes to {}", bytes, self.download.path.display());
                println!("{}", "✓ Download succeeded".green());
                Ok(())
            }
            Err(e) => {
                if !matches!(e, AvError::Cancelled) {
                    println!("{} {}", "Download error:".red(), e);
                }
                Err(e)
            }
        }
    }

    fn continue_after_round(&mut self, round: u32) -> Result<bool> {
        self.prompt.continue_next_round(round)
    }
}

/// Streams a direct URL to disk with rounds of retries; partial files never replace `path`
pub fn download_direct<P: DownloadPrompt + ?Sized>(
    download: HttpDownload,
    policy: RetryPolicy,
    prompt: &mut P,
) -> Result<RetryOutcome> {
    println!("{} {}", "Source:".dimmed(), download.url.dimmed());
    println!("{} {}", "Saving to:".dimmed(), download.path.display());

    let mut driver = DirectDriver {
        download,
        max_retries: policy.max_retries,
        prompt,
    };
    run_rounds(policy, &mut driver)
}
