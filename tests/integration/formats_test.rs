use avtool::core::formats::{
    direct_mp4_links, select_for_height, sorted_desc, Availability, FormatCatalog,
    FormatSelection, VideoInfo,
};

// Trimmed `yt-dlp -J` output: storyboard, audio-only, video-only and muxed formats
const SAMPLE_INFO: &str = r#"{
    "id": "abc123",
    "title": "Conference Talk: Rust in Production",
    "duration": 1834,
    "formats": [
        {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "height": 45},
        {"format_id": "139", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.5", "abr": 48.8},
        {"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus", "abr": 135.2},
        {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5},
        {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
         "height": 360, "url": "https://cdn.example.com/18.mp4"},
        {"format_id": "136", "ext": "mp4", "vcodec": "avc1.4d401f", "acodec": "none", "height": 720},
        {"format_id": "247", "ext": "webm", "vcodec": "vp9", "acodec": "none", "height": 720},
        {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080},
        {"format_id": "22", "ext": "mp4", "vcodec": "avc1.64001F", "acodec": "mp4a.40.2",
         "height": 720, "url": "https://cdn.example.com/22.mp4"}
    ]
}"#;

fn sample_catalog() -> (VideoInfo, FormatCatalog) {
    let info = VideoInfo::from_json(SAMPLE_INFO).unwrap();
    let catalog = FormatCatalog::categorize(&info.formats);
    (info, catalog)
}

#[test]
fn test_parse_video_info() {
    let (info, _) = sample_catalog();
    assert_eq!(info.title(), "Conference Talk: Rust in Production");
    assert_eq!(info.formats.len(), 9);
}

#[test]
fn test_categorize_sample() {
    let (_, catalog) = sample_catalog();

    assert_eq!(catalog.muxed.get(&360).map(String::as_str), Some("18"));
    assert_eq!(catalog.muxed.get(&720).map(String::as_str), Some("22"));
    // later formats overwrite earlier ones at the same height
    assert_eq!(catalog.video_only.get(&720).map(String::as_str), Some("247"));
    assert_eq!(catalog.video_only.get(&1080).map(String::as_str), Some("137"));

    let audio_ids: Vec<&str> = catalog.audio.iter().map(|a| a.format_id.as_str()).collect();
    assert_eq!(audio_ids, vec!["251", "140", "139"]);

    assert_eq!(catalog.heights(), vec![1080, 720, 360]);
    assert_eq!(catalog.availability(1080), Some(Availability::NeedsMerge));
    assert_eq!(catalog.availability(720), Some(Availability::Both));
    assert_eq!(catalog.availability(360), Some(Availability::Muxed));
    assert_eq!(catalog.availability(45), None);
}

#[test]
fn test_selection_for_sample() {
    let (_, catalog) = sample_catalog();

    assert_eq!(
        select_for_height(&catalog, 720, None),
        Some(FormatSelection::Muxed("22".into()))
    );

    let best = select_for_height(&catalog, 1080, None).unwrap();
    assert_eq!(best.expression(), "137+251");

    let chosen = select_for_height(&catalog, 1080, Some(1)).unwrap();
    assert_eq!(chosen.expression(), "137+140");

    assert_eq!(select_for_height(&catalog, 480, None), None);
}

#[test]
fn test_direct_links_for_sample() {
    let (info, _) = sample_catalog();
    let links = direct_mp4_links(&info.formats);

    assert_eq!(sorted_desc(&links), vec![720, 360]);
    assert_eq!(links[&720], "https://cdn.example.com/22.mp4");
}

#[test]
fn test_audio_only_video_has_no_heights() {
    let json = r#"{"title": "Podcast", "formats": [
        {"format_id": "a1", "vcodec": "none", "acodec": "mp3", "abr": 128}
    ]}"#;
    let info = VideoInfo::from_json(json).unwrap();
    let catalog = FormatCatalog::categorize(&info.formats);

    assert!(catalog.is_empty());
    assert!(catalog.heights().is_empty());
    assert_eq!(catalog.best_audio().map(|a| a.format_id.as_str()), Some("a1"));
    assert_eq!(FormatSelection::Best.expression(), "best");
}

#[test]
fn test_missing_title_and_formats() {
    let info = VideoInfo::from_json("{}").unwrap();
    assert_eq!(info.title(), "");
    assert!(FormatCatalog::categorize(&info.formats).is_empty());
}
