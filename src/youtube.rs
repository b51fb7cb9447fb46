use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, info, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Result, TranscriptError};
use crate::{Segment, Transcript, VideoMetadata};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

static CAPTION_TRACKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*"#).expect("valid regex"));
static META_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta\s+name="title"\s+content="([^"]*)""#).expect("valid regex"));
static DETAILS_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoDetails"\s*:\s*\{[^{}]*?"title"\s*:\s*("(?:[^"\\]|\\.)*")"#).expect("valid regex")
});
static OWNER_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""ownerChannelName"\s*:\s*("(?:[^"\\]|\\.)*")"#).expect("valid regex"));
static AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""author"\s*:\s*("(?:[^"\\]|\\.)*")"#).expect("valid regex"));
static LENGTH_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""lengthSeconds"\s*:\s*"(\d+)""#).expect("valid regex"));

/// Caption track descriptor as listed in the watch page's player response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// "asr" for auto-generated tracks, absent for manual ones
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_lang(&self, lang: &str) -> bool {
        self.language_code == lang
            || self
                .language_code
                .strip_prefix(lang)
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Segments read from a timed-text payload
#[derive(Debug, Default, PartialEq)]
pub struct TimedText {
    pub segments: Vec<Segment>,
    pub skipped: usize,
}

/// Fetches captions from YouTube's public watch page
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    lang: String,
    max_attempts: u32,
}

impl YouTubeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TranscriptError::Internal(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: YOUTUBE_BASE_URL.to_string(),
            lang: config.lang.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Point the client at a different host serving `/watch`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve a user-supplied URL or ID and fetch its transcript
    pub async fn transcript_for_url(&self, input: &str) -> Result<Transcript> {
        let video_id = crate::extract_video_id(input).ok_or_else(|| TranscriptError::InvalidReference {
            input: input.trim().to_string(),
        })?;
        self.fetch_transcript(&video_id).await
    }

    /// Fetch transcript from the caption track advertised on the watch page
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Transcript> {
        // Step 1: Fetch the watch page
        let watch_url = format!("{}/watch?v={video_id}", self.base_url);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .get_text(&watch_url)
            .await
            .map_err(|e| TranscriptError::PageUnavailable {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        // Step 2: Pick a caption track
        let tracks = extract_caption_tracks(&page_html, video_id)?;
        let track = select_track(&tracks, &self.lang).ok_or_else(|| TranscriptError::NoCaptionTracks {
            video_id: video_id.to_string(),
        })?;
        debug!(
            "Using caption track: lang={} kind={}",
            track.language_code,
            track.kind.as_deref().unwrap_or("manual")
        );

        // Step 3: Fetch and parse the timed-text payload
        let caption_xml = self
            .get_text(&track.base_url)
            .await
            .map_err(|e| TranscriptError::TranscriptFetch {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        let TimedText { segments, skipped } = parse_timed_text(&caption_xml);
        if skipped > 0 {
            warn!("Skipped {skipped} malformed timed-text element(s) for {video_id}");
        }
        info!(
            "Fetched {} segment(s) for {video_id} in {}",
            segments.len(),
            track.language_code
        );

        Ok(Transcript {
            video_id: video_id.to_string(),
            language: track.language_code.clone(),
            segments,
            metadata: scrape_metadata(&page_html),
            skipped_segments: skipped,
        })
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        let accept_language = accept_language(&self.lang);
        retry(self.max_attempts, || {
            let request = self.http.get(url).header(ACCEPT_LANGUAGE, accept_language.as_str());
            async move { request.send().await?.error_for_status()?.text().await }
        })
        .await
    }
}

fn accept_language(lang: &str) -> String {
    if lang == "en" {
        lang.to_string()
    } else {
        format!("{lang},en;q=0.8")
    }
}

/// Delay before retrying after the given failed attempt: 500ms doubling, capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let millis = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| factor.checked_mul(500))
        .unwrap_or(u64::MAX);
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// Retry an async operation with exponential backoff
async fn retry<F, Fut, T, E>(max_attempts: u32, operation: F) -> std::result::Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) if attempt < max_attempts => {
                let delay = backoff_delay(attempt);
                debug!("Attempt {attempt} failed: {e}, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Pull the caption-track listing out of the watch page
pub fn extract_caption_tracks(html: &str, video_id: &str) -> Result<Vec<CaptionTrack>> {
    let marker = CAPTION_TRACKS.find(html).ok_or_else(|| TranscriptError::NoCaptions {
        video_id: video_id.to_string(),
    })?;

    // Only the array right after the marker is read; the rest of the page is ignored.
    let mut de = serde_json::Deserializer::from_str(&html[marker.end()..]);
    match Vec::<CaptionTrack>::deserialize(&mut de) {
        Ok(tracks) if !tracks.is_empty() => Ok(tracks),
        Ok(_) => Err(TranscriptError::NoCaptionTracks {
            video_id: video_id.to_string(),
        }),
        Err(e) => {
            warn!("Unreadable caption track listing for {video_id}: {e}");
            Err(TranscriptError::NoCaptionTracks {
                video_id: video_id.to_string(),
            })
        }
    }
}

/// Preferred language auto-generated, then preferred language manual, then the first track
pub fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.matches_lang(lang) && t.is_auto_generated())
        .or_else(|| tracks.iter().find(|t| t.matches_lang(lang) && !t.is_auto_generated()))
        .or_else(|| tracks.first())
}

/// Parse `<text start=".." dur="..">` elements in document order, skipping malformed ones
pub fn parse_timed_text(xml: &str) -> TimedText {
    let mut reader = Reader::from_str(xml);
    let mut parsed = TimedText::default();
    // Timing of the open <text> element (None if its attributes were bad) and its raw text
    let mut open: Option<(Option<(f64, f64)>, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                // A <text> opened inside another one abandons the outer element
                if open.replace((parse_timing(e), String::new())).is_some() {
                    parsed.skipped += 1;
                }
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"text" => {
                parsed.push(parse_timing(e), "");
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, text)) = open.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some((_, text)) = open.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some((timing, text)) = open.take() {
                    parsed.push(timing, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Timed-text payload invalid at byte {}: {e}", reader.error_position());
                parsed.skipped += 1;
                break;
            }
            _ => {}
        }
    }

    parsed
}

impl TimedText {
    fn push(&mut self, timing: Option<(f64, f64)>, raw_text: &str) {
        match timing {
            Some((start, duration)) => self.segments.push(Segment {
                text: decode_text(raw_text),
                start,
                duration,
            }),
            None => self.skipped += 1,
        }
    }
}

fn parse_timing(element: &BytesStart) -> Option<(f64, f64)> {
    let mut start = None;
    let mut dur = Some(0.0);
    for attr in element.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        let number = value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        match attr.key.as_ref() {
            b"start" => start = number,
            b"dur" => dur = number,
            _ => {}
        }
    }
    Some((start?, dur?))
}

// YouTube escapes caption text twice, so entities are decoded in two passes.
fn decode_text(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw);
    let twice = html_escape::decode_html_entities(&once);
    twice.replace('\u{a0}', " ").trim().to_string()
}

/// Title, channel and duration from the watch page; each is independent and optional
pub fn scrape_metadata(html: &str) -> VideoMetadata {
    VideoMetadata {
        title: scrape_title(html),
        channel_name: scrape_channel_name(html),
        duration_seconds: scrape_duration(html),
    }
}

fn scrape_title(html: &str) -> Option<String> {
    META_TITLE
        .captures(html)
        .map(|caps| html_escape::decode_html_entities(&caps[1]).trim().to_string())
        .filter(|title| !title.is_empty())
        .or_else(|| json_string(&DETAILS_TITLE, html))
}

fn scrape_channel_name(html: &str) -> Option<String> {
    json_string(&OWNER_CHANNEL, html).or_else(|| json_string(&AUTHOR, html))
}

fn scrape_duration(html: &str) -> Option<u64> {
    LENGTH_SECONDS.captures(html).and_then(|caps| caps[1].parse().ok())
}

/// First capture of `re`, read as a JSON string literal
fn json_string(re: &Regex, html: &str) -> Option<String> {
    let caps = re.captures(html)?;
    serde_json::from_str::<String>(&caps[1])
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
