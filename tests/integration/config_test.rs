use avtool::core::config::{Config, CONFIG_KEYS};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert!(config.cookie_file.is_none());
    assert!(config.cookies_from_browser.is_none());
    assert!(!config.yt_dlp_installed_by_avtool);
    assert_eq!(config.download_dir(), PathBuf::from("./download"));
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("avtool").join("config.json");

    let mut config = Config::default();
    config.set_value("download-dir", "/media/videos").unwrap();
    config.set_value("cookies", "/home/me/cookies.txt").unwrap();
    config.set_value("retries", "7").unwrap();
    config.set_value("ffmpeg", "/opt/ffmpeg/bin/ffmpeg").unwrap();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.download_dir(), PathBuf::from("/media/videos"));
    assert_eq!(loaded.max_retries(), 7);
    assert_eq!(loaded.max_rounds(), 3);
}

#[test]
fn test_config_file_is_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = Config::default();
    config.set_value("browser", "chrome").unwrap();
    config.save_to(&path).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["cookies_from_browser"], "chrome");
}

#[test]
fn test_config_load_nonexistent_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&temp_dir.path().join("missing.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_empty_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "   \n").unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_rejects_bad_values() {
    let mut config = Config::default();

    assert!(config.set_value("browser", "netscape").is_err());
    assert!(config.set_value("rounds", "0").is_err());
    assert!(config.set_value("rounds", "three").is_err());
    assert!(config.set_value("colour", "blue").is_err());

    assert_eq!(config, Config::default());
}

#[test]
fn test_setting_yt_dlp_clears_installed_flag() {
    let mut config = Config {
        yt_dlp_installed_by_avtool: true,
        ..Default::default()
    };
    config.set_value("yt-dlp", "/usr/local/bin/yt-dlp").unwrap();

    assert!(!config.yt_dlp_installed_by_avtool);
    assert_eq!(
        config.get_yt_dlp_path().map(String::as_str),
        Some("/usr/local/bin/yt-dlp")
    );
}

#[test]
fn test_every_key_is_accepted() {
    let samples = [
        ("download-dir", "./out"),
        ("cookies", "cookies.txt"),
        ("browser", "brave"),
        ("rounds", "2"),
        ("retries", "4"),
        ("ffmpeg", "ffmpeg"),
        ("yt-dlp", "yt-dlp"),
    ];
    assert_eq!(samples.len(), CONFIG_KEYS.len());

    let mut config = Config::default();
    for (key, value) in samples {
        assert!(CONFIG_KEYS.contains(&key));
        config
            .set_value(key, value)
            .unwrap_or_else(|e| panic!("{} rejected: {}", key, e));
    }
}
