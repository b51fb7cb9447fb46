//! Local stand-in for the YouTube watch page and timed-text endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::header::{ACCEPT_LANGUAGE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::youtube::YouTubeClient;

const TIMED_TEXT_EN: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="18.64" dur="3.24">Never gonna give you up</text>
<text start="20" dur="oops">broken</text>
<text start="22.08" dur="4.2">Never gonna let you down</text>
<text start="3725.5" dur="1.5">Rock &amp;amp; roll</text>
</transcript>"#;

const TIMED_TEXT_FR: &str =
    r#"<transcript><text start="0" dur="2">Je ne vais jamais t&amp;#39;abandonner</text></transcript>"#;

/// Watch page with metadata, plus a caption listing when `tracks_json` is given
pub(crate) fn watch_page(tracks_json: Option<&str>) -> String {
    let captions = tracks_json
        .map(|tracks| {
            format!(r#","captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":{tracks},"audioTracks":[{{"captionTrackIndices":[0]}}]}}}}"#)
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html><html><head><title>Never Gonna Give You Up &amp; More - YouTube</title><meta name="title" content="Never Gonna Give You Up &amp; More"></head><body><script>var ytInitialPlayerResponse = {{"videoDetails":{{"videoId":"dQw4w9WgXcQ","title":"Never Gonna Give You Up & More","lengthSeconds":"213","author":"RickAstleyVEVO"}}{captions},"microformat":{{"playerMicroformatRenderer":{{"ownerChannelName":"Rick Astley"}}}}}};</script></body></html>"#
    )
}

/// Headers the fake watch page saw on one request
#[derive(Debug, Clone)]
pub(crate) struct WatchRequest {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
}

#[derive(Clone)]
struct FakeState {
    base_url: String,
    watch_requests: Arc<Mutex<Vec<WatchRequest>>>,
    flaky_hits: Arc<AtomicU32>,
}

pub(crate) struct FakeYouTube {
    pub base_url: String,
    watch_requests: Arc<Mutex<Vec<WatchRequest>>>,
}

impl FakeYouTube {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = FakeState {
            base_url: base_url.clone(),
            watch_requests: Arc::new(Mutex::new(Vec::new())),
            flaky_hits: Arc::new(AtomicU32::new(0)),
        };
        let watch_requests = state.watch_requests.clone();

        let app = Router::new()
            .route("/watch", get(watch))
            .route("/api/timedtext", get(timed_text))
            .with_state(state);

        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            base_url,
            watch_requests,
        }
    }

    pub fn client(&self) -> YouTubeClient {
        self.client_with(&Config::default())
    }

    pub fn client_with(&self, config: &Config) -> YouTubeClient {
        YouTubeClient::new(config).unwrap().with_base_url(&self.base_url)
    }

    pub fn watch_requests(&self) -> Vec<WatchRequest> {
        self.watch_requests.lock().unwrap().clone()
    }
}

fn english_tracks(base: &str, video_id: &str) -> String {
    format!(
        r#"[{{"baseUrl":"{base}/api/timedtext?v={video_id}&lang=fr","name":{{"runs":[{{"text":"French"}}]}},"languageCode":"fr"}},{{"baseUrl":"{base}/api/timedtext?v={video_id}\u0026lang=en\u0026kind=asr","name":{{"runs":[{{"text":"English (auto-generated)"}}]}},"languageCode":"en","kind":"asr"}}]"#
    )
}

async fn watch(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.watch_requests.lock().unwrap().push(WatchRequest {
        user_agent: header(USER_AGENT),
        accept_language: header(ACCEPT_LANGUAGE),
    });

    let base = &state.base_url;
    let tracks = match params.get("v").map(String::as_str) {
        Some("captioned01") => Some(english_tracks(base, "captioned01")),
        // Fails the first time it is asked for, then behaves
        Some("flakypage01") => {
            if state.flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            Some(english_tracks(base, "flakypage01"))
        }
        Some("slowpage001") => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            None
        }
        Some("frenchonly1") => Some(format!(
            r#"[{{"baseUrl":"{base}/api/timedtext?v=frenchonly1&lang=fr","languageCode":"fr"}}]"#
        )),
        Some("brokentrack") => Some(format!(r#"[{{"baseUrl":"{base}/api/missing","languageCode":"en"}}]"#)),
        Some("emptytracks") => Some("[]".to_string()),
        Some("nocaptions1") => None,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Html(watch_page(tracks.as_deref())).into_response()
}

async fn timed_text(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("lang").map(String::as_str) {
        Some("en") => TIMED_TEXT_EN.into_response(),
        Some("fr") => TIMED_TEXT_FR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
