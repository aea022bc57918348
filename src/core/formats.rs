// Format descriptors reported by yt-dlp and their classification by resolution

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// One entry of the `formats` array in `yt-dlp -J` output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default, deserialize_with = "size_hint")]
    pub height: Option<u32>,
    /// Average audio bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "size_hint")]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub format_note: Option<String>,
}

/// Some extractors report sizes as floats or numeric strings; anything that is not a
/// non-negative number becomes `None` instead of failing the whole dump
fn size_hint<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().and_then(whole)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().and_then(whole),
        _ => None,
    };
    Ok(number.and_then(|n| T::try_from(n).ok()))
}

fn whole(x: f64) -> Option<u64> {
    (x.is_finite() && x >= 0.0).then(|| x.round() as u64)
}

impl FormatDescriptor {
    // yt-dlp reports a missing codec as the literal "none"; an absent field means the same
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|c| c != "none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    fn id(&self) -> String {
        self.format_id.clone().unwrap_or_default()
    }
}

/// Title and formats of a single video
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatDescriptor>,
}

impl VideoInfo {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub abr: f64,
    pub format_id: String,
}

/// How a resolution can be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Both a muxed file and split streams exist
    Both,
    /// Single file including audio
    Muxed,
    /// Video only, audio has to be merged
    NeedsMerge,
}

impl Availability {
    pub fn label(&self) -> &'static str {
        match self {
            Availability::Both => "single file or split streams",
            Availability::Muxed => "single file with audio",
            Availability::NeedsMerge => "audio will be merged",
        }
    }
}

/// Formats grouped into muxed/video-only maps keyed by height plus audio-only tracks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatCatalog {
    pub muxed: BTreeMap<u32, String>,
    pub video_only: BTreeMap<u32, String>,
    /// Sorted by bitrate, highest first
    pub audio: Vec<AudioTrack>,
}

impl FormatCatalog {
    /// Single pass over the descriptors. Later formats with the same height replace
    /// earlier ones; yt-dlp lists formats from worst to best.
    pub fn categorize(formats: &[FormatDescriptor]) -> Self {
        let mut catalog = FormatCatalog::default();

        for f in formats {
            let height = f.height.unwrap_or(0);
            match (f.has_video(), f.has_audio()) {
                (true, true) => {
                    catalog.muxed.insert(height, f.id());
                }
                (true, false) => {
                    catalog.video_only.insert(height, f.id());
                }
                (false, true) => catalog.audio.push(AudioTrack {
                    abr: f.abr.unwrap_or(0.0),
                    format_id: f.id(),
                }),
                (false, false) => {}
            }
        }

        // stable: equal bitrates keep their listing order
        catalog.audio.sort_by(|a, b| b.abr.total_cmp(&a.abr));

        catalog
    }

    /// Known heights (0 excluded), highest first
    pub fn heights(&self) -> Vec<u32> {
        let mut heights: Vec<u32> = self
            .muxed
            .keys()
            .chain(self.video_only.keys())
            .copied()
            .filter(|h| *h > 0)
            .collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();
        heights
    }

    pub fn availability(&self, height: u32) -> Option<Availability> {
        match (
            self.muxed.contains_key(&height),
            self.video_only.contains_key(&height),
        ) {
            (true, true) => Some(Availability::Both),
            (true, false) => Some(Availability::Muxed),
            (false, true) => Some(Availability::NeedsMerge),
            (false, false) => None,
        }
    }

    /// No video formats at all
    pub fn is_empty(&self) -> bool {
        self.muxed.is_empty() && self.video_only.is_empty()
    }

    pub fn best_audio(&self) -> Option<&AudioTrack> {
        self.audio.first()
    }
}

/// The format expression handed to yt-dlp
#[derive(Debug, Clone, PartialEq)]
pub enum FormatSelection {
    Muxed(String),
    Split {
        video: String,
        audio: Option<String>,
    },
    /// Raw expression or format id typed by the user
    Expression(String),
    Best,
}

impl FormatSelection {
    pub fn expression(&self) -> String {
        match self {
            FormatSelection::Muxed(id) => id.clone(),
            FormatSelection::Split {
                video,
                audio: Some(audio),
            } => format!("{}+{}", video, audio),
            FormatSelection::Split { video, audio: None } => video.clone(),
            FormatSelection::Expression(expr) => expr.clone(),
            FormatSelection::Best => "best".to_string(),
        }
    }

    /// Video-only selection without any audio track to merge
    pub fn is_silent(&self) -> bool {
        matches!(self, FormatSelection::Split { audio: None, .. })
    }
}

/// Expression used when only a height is known: prefer H.264 video plus best audio
pub fn height_fallback_expression(height: u32) -> String {
    format!(
        "bestvideo[height={h}][vcodec^=avc1]+bestaudio/best[height={h}]",
        h = height
    )
}

/// Picks the download for `height`: a muxed file wins, otherwise video-only plus the
/// requested audio track (by index into `catalog.audio`) or the best one.
pub fn select_for_height(
    catalog: &FormatCatalog,
    height: u32,
    audio_choice: Option<usize>,
) -> Option<FormatSelection> {
    if let Some(id) = catalog.muxed.get(&height) {
        return Some(FormatSelection::Muxed(id.clone()));
    }

    let video = catalog.video_only.get(&height)?.clone();
    let audio = audio_choice
        .and_then(|idx| catalog.audio.get(idx))
        .or_else(|| catalog.best_audio())
        .map(|track| track.format_id.clone());

    Some(FormatSelection::Split { video, audio })
}

/// Height -> direct URL for progressive mp4 formats
pub fn direct_mp4_links(formats: &[FormatDescriptor]) -> BTreeMap<u32, String> {
    let mut links = BTreeMap::new();
    for f in formats {
        let is_mp4 = f
            .ext
            .as_deref()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if let (true, Some(height), Some(url)) = (is_mp4, f.height, f.url.as_ref()) {
            links.insert(height, url.clone());
        }
    }
    links
}

/// Heights of a link map, highest first
pub fn sorted_desc(links: &BTreeMap<u32, String>) -> Vec<u32> {
    links.keys().rev().copied().collect()
}

/// Parses labels like `720p` or `720`
pub fn parse_resolution_label(label: &str) -> Option<u32> {
    let label = label.trim().to_lowercase();
    label.strip_suffix('p').unwrap_or(&label).parse().ok()
}
