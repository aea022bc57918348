// Command handlers module
pub mod completions;
pub mod config;
pub mod convert;
pub mod direct;
pub mod download;
pub mod extract_audio;
pub mod formats;
pub mod info;
