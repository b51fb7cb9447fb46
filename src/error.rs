use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("YouTube URL is required")]
    MissingUrl,

    #[error("no YouTube video reference in {input:?}")]
    InvalidReference { input: String },

    #[error("watch page for {video_id} unavailable: {reason}")]
    PageUnavailable { video_id: String, reason: String },

    #[error("no caption listing on watch page for {video_id}")]
    NoCaptions { video_id: String },

    #[error("no usable caption track for {video_id}")]
    NoCaptionTracks { video_id: String },

    #[error("timed-text fetch failed for {video_id}: {reason}")]
    TranscriptFetch { video_id: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl TranscriptError {
    /// HTTP status for this failure: caller input problems are 400, everything else 500
    pub fn status(&self) -> StatusCode {
        match self {
            TranscriptError::MissingUrl | TranscriptError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            TranscriptError::MissingUrl => "YouTube URL is required",
            TranscriptError::InvalidReference { .. } => "Invalid YouTube URL",
            TranscriptError::PageUnavailable { .. } => {
                "Failed to fetch video page. The video may be private or unavailable."
            }
            TranscriptError::NoCaptions { .. } => "This video does not have captions available",
            TranscriptError::NoCaptionTracks { .. } => "No caption tracks found",
            TranscriptError::TranscriptFetch { .. } => "Failed to fetch transcript",
            TranscriptError::Internal(_) => "Failed to fetch transcript. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
