pub mod config;
pub mod error;
pub mod output;
pub mod server;
pub mod youtube;

#[cfg(test)]
mod testing;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use error::TranscriptError;

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Segment as shown to a reader, with a rendered timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySegment {
    pub timestamp: String,
    pub text: String,
    pub start: f64,
}

impl From<&Segment> for DisplaySegment {
    fn from(segment: &Segment) -> Self {
        Self {
            timestamp: format_timestamp(segment.start),
            text: segment.text.clone(),
            start: segment.start,
        }
    }
}

/// Best-effort details scraped from the watch page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub duration_seconds: Option<u64>,
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub segments: Vec<Segment>,
    pub metadata: VideoMetadata,
    /// Timed-text elements dropped because they could not be parsed
    pub skipped_segments: usize,
}

impl Transcript {
    pub fn display_segments(&self) -> Vec<DisplaySegment> {
        self.segments.iter().map(DisplaySegment::from).collect()
    }

    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", self.video_id)
    }
}

static VALID_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

// Host must not be glued to a preceding word, so `notyoutube.com` is rejected.
const BOUNDARY: &str = r"(?:^|[^\w.-])";
// Path-style captures stop at the next URL delimiter; query captures at the next parameter.
const PATH_ID: &str = r"([^&?#/\s]+)";
const QUERY_ID: &str = r"(?:[^#\s]*&)?v=([^&#\s]+)";

// Priority order matters: the first shape whose capture validates wins.
static URL_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID
        format!(r"{BOUNDARY}(?i:(?:https?://)?(?:www\.)?youtube\.com/watch\?){QUERY_ID}"),
        // youtu.be/ID
        format!(r"{BOUNDARY}(?i:(?:https?://)?(?:www\.)?youtu\.be/){PATH_ID}"),
        // youtube.com/embed/ID
        format!(r"{BOUNDARY}(?i:(?:https?://)?(?:www\.)?youtube(?:-nocookie)?\.com/embed/){PATH_ID}"),
        // m., gaming. and music. subdomains
        format!(r"{BOUNDARY}(?i:(?:https?://)?(?:m|gaming|music)\.youtube\.com/watch\?){QUERY_ID}"),
        // youtube.com/shorts/ID, /live/ID, /v/ID
        format!(r"{BOUNDARY}(?i:(?:https?://)?(?:www\.|m\.)?youtube\.com/(?:shorts|live|v)/){PATH_ID}"),
        // Bare 11-character video ID
        r"^([a-zA-Z0-9_-]{11})$".to_string(),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    URL_SHAPES
        .iter()
        .filter_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
        .find(|id| VALID_ID.is_match(id))
}

/// Render an offset in seconds as `m:ss`, or `h:mm:ss` past the first hour
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
