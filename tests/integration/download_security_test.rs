// Security tests for the download commands
// These tests ensure that URLs and output names are validated before they reach yt-dlp
// or the file system

use avtool::core::download::{output_template, AuthOptions};
use avtool::core::validation;
use std::path::Path;

#[test]
fn test_validate_url_empty() {
    assert!(validation::validate_url("").is_err());
    assert!(validation::validate_url("   ").is_err());
}

#[test]
fn test_validate_url_no_protocol() {
    let urls = vec![
        "example.com",
        "www.youtube.com",
        "ftp://example.com",
        "file:///etc/passwd",
        "javascript:alert(1)",
    ];

    for url in urls {
        assert!(validation::validate_url(url).is_err(), "Should reject: {}", url);
    }
}

#[test]
fn test_validate_url_with_command_injection() {
    let malicious_urls = vec![
        "https://example.com; rm -rf /",
        "https://example.com | cat /etc/passwd",
        "https://example.com & whoami",
        "https://example.com && rm -rf ~",
        "https://example.com`whoami`",
        "https://example.com$(whoami)",
        "https://example.com\ncurl evil.com",
        "https://example.com\r\nmalicious-header: value",
    ];

    for url in malicious_urls {
        let result = validation::validate_url(url);
        assert!(result.is_err(), "Should reject malicious URL: {}", url);
    }
}

#[test]
fn test_validate_url_with_null_bytes() {
    let result = validation::validate_url("https://example.com\0malicious");
    assert!(result.unwrap_err().to_string().contains("null byte"));
}

#[test]
fn test_validate_url_extremely_long() {
    let long_url = format!("https://{}.com", "a".repeat(5000));

    let result = validation::validate_url(&long_url);
    assert!(result.unwrap_err().to_string().contains("too long"));
}

#[test]
fn test_validate_url_accepts_video_sites() {
    let urls = vec![
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
        "https://youtu.be/dQw4w9WgXcQ",
        "https://vimeo.com/123456789",
        "http://localhost:8080/video.mp4",
    ];

    for url in urls {
        assert!(validation::validate_url(url).is_ok(), "Should accept: {}", url);
    }
}

#[test]
fn test_output_name_path_traversal() {
    let names = vec![
        "../../../etc/passwd",
        "..\\..\\windows\\system32",
        "/etc/cron.d/job",
        "\\\\server\\share",
        "C:\\Windows\\evil",
    ];

    for name in names {
        assert!(
            validation::validate_output_name(name).is_err(),
            "Should reject: {}",
            name
        );
    }
}

#[test]
fn test_output_name_shell_characters() {
    let names = vec!["video; rm -rf ~", "video | tee", "$(whoami)", "name`id`", "a&b"];

    for name in names {
        assert!(
            validation::validate_output_name(name).is_err(),
            "Should reject: {}",
            name
        );
    }
}

#[test]
fn test_output_name_too_long() {
    assert!(validation::validate_output_name(&"a".repeat(300)).is_err());
    assert!(validation::validate_output_name("My Holiday 2024").is_ok());
}

#[test]
fn test_titles_become_safe_file_names() {
    let cases = vec![
        ("Rust: The <Good> Parts?", "Rust_ The _Good_ Parts_"),
        ("AC/DC - Live", "AC_DC - Live"),
        ("  spaced  ", "spaced"),
        ("quote\"pipe|star*", "quote_pipe_star_"),
    ];

    for (title, expected) in cases {
        assert_eq!(validation::sanitize_filename(title), expected);
    }
}

#[test]
fn test_empty_title_uses_timestamp() {
    let stem = validation::file_stem_or_timestamp("///");
    assert_eq!(stem, "___");

    let stem = validation::file_stem_or_timestamp("   ");
    assert_eq!(stem.len(), "20240101_120000".len());
    assert!(stem.chars().all(|c| c.is_ascii_digit() || c == '_'));
}

#[test]
fn test_output_template_stays_in_directory() {
    let stem = validation::sanitize_filename("../escape/attempt");
    let template = output_template(Path::new("download"), &stem);

    assert_eq!(template.parent(), Some(Path::new("download")));
    assert!(template.to_string_lossy().ends_with(".._escape_attempt.%(ext)s"));
}

#[test]
fn test_cookie_file_detection() {
    let temp = tempfile::TempDir::new().unwrap();
    assert_eq!(AuthOptions::default_for(temp.path()), AuthOptions::None);

    std::fs::write(temp.path().join("cookies.txt"), "# Netscape HTTP Cookie File\n").unwrap();
    assert_eq!(
        AuthOptions::default_for(temp.path()),
        AuthOptions::CookieFile(temp.path().join("cookies.txt"))
    );
}
