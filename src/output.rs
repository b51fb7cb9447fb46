use serde::Serialize;

use crate::{DisplaySegment, Transcript, format_timestamp};

/// The `data` object handed back to callers, camelCased for the browser
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload {
    pub video_id: String,
    pub transcript: Vec<DisplaySegment>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl From<&Transcript> for TranscriptPayload {
    fn from(transcript: &Transcript) -> Self {
        Self {
            video_id: transcript.video_id.clone(),
            transcript: transcript.display_segments(),
            language: transcript.language.clone(),
            title: transcript.metadata.title.clone(),
            duration: transcript.metadata.duration_seconds.map(|secs| format_timestamp(secs as f64)),
            channel_name: transcript.metadata.channel_name.clone(),
            thumbnail: Some(transcript.thumbnail_url()),
        }
    }
}

/// Render transcript as text, one `[m:ss] text` line per segment
pub fn render_text(transcript: &Transcript) -> String {
    transcript
        .display_segments()
        .iter()
        .map(|s| format!("[{}] {}", s.timestamp, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(transcript: &Transcript) -> String {
    serde_json::to_string_pretty(&TranscriptPayload::from(transcript)).unwrap_or_default()
}

/// Render transcript as SubRip cues
pub fn render_srt(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_time(s.start),
                srt_time(s.start + s.duration),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn srt_time(seconds: f64) -> String {
    let millis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02},{:03}",
        millis / 3_600_000,
        (millis / 60_000) % 60,
        (millis / 1000) % 60,
        millis % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Segment, VideoMetadata};

    fn sample_transcript() -> Transcript {
        Transcript {
            video_id: "dQw4w9WgXcQ".to_string(),
            language: "en".to_string(),
            segments: vec![
                Segment {
                    text: "Hello world".to_string(),
                    start: 0.0,
                    duration: 1.5,
                },
                Segment {
                    text: "This is a test".to_string(),
                    start: 3661.25,
                    duration: 2.0,
                },
            ],
            metadata: VideoMetadata {
                title: Some("Test Video".to_string()),
                channel_name: None,
                duration_seconds: Some(3725),
            },
            skipped_segments: 0,
        }
    }

    #[test]
    fn test_render_text() {
        let t = sample_transcript();
        assert_eq!(render_text(&t), "[0:00] Hello world\n[1:01:01] This is a test");
    }

    #[test]
    fn test_render_text_empty() {
        let mut t = sample_transcript();
        t.segments.clear();
        assert_eq!(render_text(&t), "");
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(TranscriptPayload::from(&sample_transcript())).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["language"], "en");
        assert_eq!(json["title"], "Test Video");
        assert_eq!(json["duration"], "1:02:05");
        assert_eq!(json["thumbnail"], "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg");
        assert!(json.get("channelName").is_none());
        assert_eq!(json["transcript"][1]["timestamp"], "1:01:01");
        assert_eq!(json["transcript"][1]["text"], "This is a test");
        assert_eq!(json["transcript"][1]["start"], 3661.25);
    }

    #[test]
    fn test_render_srt() {
        let t = sample_transcript();
        assert_eq!(
            render_srt(&t),
            "1\n00:00:00,000 --> 00:00:01,500\nHello world\n\n2\n01:01:01,250 --> 01:01:03,250\nThis is a test\n"
        );
    }
}
