// Core business logic module

pub mod checksum_manager;
pub mod config;
pub mod convert;
pub mod download;
pub mod extract;
pub mod ffmpeg_manager;
pub mod formats;
pub mod probe;
pub mod retry;
pub mod validation;
pub mod yt_dlp_manager;

// Re-export commonly used items
pub use checksum_manager::ChecksumManager;
pub use config::Config;
pub use ffmpeg_manager::{FFmpegManager, Toolchain, VolumeLevels};
pub use formats::{FormatCatalog, FormatSelection, VideoInfo};
pub use probe::MediaInfo;
pub use retry::{run_rounds, RetryOutcome, RetryPolicy, RoundDriver};
pub use yt_dlp_manager::YtDlpManager;
