use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use eyre::{Result, WrapErr};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::TranscriptError;
use crate::output::TranscriptPayload;
use crate::youtube::YouTubeClient;

#[derive(Clone)]
struct AppState {
    youtube: Arc<YouTubeClient>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiResponse {
    Success { success: bool, data: TranscriptPayload },
    Failure { success: bool, error: String },
}

impl ApiResponse {
    fn ok(data: TranscriptPayload) -> Self {
        ApiResponse::Success { success: true, data }
    }

    fn failure(message: impl Into<String>) -> Self {
        ApiResponse::Failure {
            success: false,
            error: message.into(),
        }
    }
}

impl IntoResponse for TranscriptError {
    fn into_response(self) -> Response {
        match &self {
            TranscriptError::Internal(_) => error!("Transcript request failed: {self}"),
            _ => warn!("Transcript request failed: {self}"),
        }
        (self.status(), Json(ApiResponse::failure(self.public_message()))).into_response()
    }
}

/// Router serving `POST /` and `POST /transcript` with open CORS
pub fn router(youtube: YouTubeClient) -> Router {
    let state = AppState {
        youtube: Arc::new(youtube),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let transcript = post(fetch_transcript).fallback(method_not_allowed);

    Router::new()
        .route("/", transcript.clone())
        .route("/transcript", transcript)
        .with_state(state)
        .layer(cors)
}

pub async fn serve(youtube: YouTubeClient, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("Transcript service listening on http://{addr}");

    axum::serve(listener, router(youtube))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running transcript service")?;

    info!("Transcript service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {err}");
    }
}

async fn fetch_transcript(
    State(state): State<AppState>,
    body: std::result::Result<Json<TranscriptRequest>, JsonRejection>,
) -> std::result::Result<Json<ApiResponse>, TranscriptError> {
    let url = match body {
        Ok(Json(TranscriptRequest { url: Some(url) })) if !url.trim().is_empty() => url,
        Ok(_) => return Err(TranscriptError::MissingUrl),
        Err(rejection) => {
            warn!("Rejected request body: {rejection}");
            return Err(TranscriptError::MissingUrl);
        }
    };

    info!("Transcript requested for {url}");
    let transcript = state.youtube.transcript_for_url(&url).await?;
    Ok(Json(ApiResponse::ok(TranscriptPayload::from(&transcript))))
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::failure("Method not allowed")),
    )
        .into_response()
}
