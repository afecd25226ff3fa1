//! Request routing
//!
//! | Method | Path                          | Handler                  |
//! |--------|-------------------------------|--------------------------|
//! | GET    | `/health`                     | liveness                 |
//! | POST   | `/api/video_upload/{id}`      | [`VideoIngestor`]        |
//! | POST   | `/api/thumbnail_upload/{id}`  | [`ThumbnailUploader`]    |
//! | GET    | `/assets/{file}`              | stored thumbnails        |
//!
//! [`VideoIngestor`]: crate::ingest::VideoIngestor
//! [`ThumbnailUploader`]: crate::thumbnail::ThumbnailUploader

use super::multipart::MultipartUpload;
use super::response::{
    bytes_response, error_json, error_response, json_response, not_found, HttpResponse,
};
use super::AppState;
use crate::auth::AuthRequest;
use crate::ingest::IngestRequest;
use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub const VIDEO_UPLOAD_PREFIX: &str = "/api/video_upload/";
pub const THUMBNAIL_UPLOAD_PREFIX: &str = "/api/thumbnail_upload/";
pub const ASSETS_PREFIX: &str = "/assets/";

/// Multipart field carrying the video file
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying the thumbnail image
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Entry point for every request on the API listener
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let span = tracing::info_span!(
        "http.request",
        http.method = %req.method(),
        http.target = %req.uri().path(),
        http.status_code = tracing::field::Empty,
    );

    let start = Instant::now();
    let response = route(req, state).instrument(span.clone()).await;

    span.record("http.status_code", response.status().as_u16());
    tracing::debug!(
        parent: &span,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    Ok(response)
}

async fn route(req: Request<Incoming>, state: Arc<AppState>) -> HttpResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::GET, "/health") => bytes_response(StatusCode::OK, "text/plain", "ok"),
        (&Method::GET, p) if p.starts_with(ASSETS_PREFIX) => {
            serve_asset(&state.assets_root, &p[ASSETS_PREFIX.len()..]).await
        }
        (&Method::POST, p) if p.starts_with(VIDEO_UPLOAD_PREFIX) => {
            let id = p[VIDEO_UPLOAD_PREFIX.len()..].to_string();
            upload_video(req, id, &state).await
        }
        (&Method::POST, p) if p.starts_with(THUMBNAIL_UPLOAD_PREFIX) => {
            let id = p[THUMBNAIL_UPLOAD_PREFIX.len()..].to_string();
            upload_thumbnail(req, id, &state).await
        }
        _ => not_found(),
    }
}

async fn upload_video(req: Request<Incoming>, video_id: String, state: &AppState) -> HttpResponse {
    let request = IngestRequest::new(video_id, auth_request(&req));
    let limit = state.ingestor.settings().max_upload_bytes;
    let mut body = MultipartUpload::from_request(req, VIDEO_FIELD, limit);

    match state.ingestor.ingest(&request, &mut body).await {
        Ok(outcome) => json_response(StatusCode::OK, &outcome.video),
        Err(e) => error_response(&e),
    }
}

async fn upload_thumbnail(
    req: Request<Incoming>,
    video_id: String,
    state: &AppState,
) -> HttpResponse {
    let request = IngestRequest::new(video_id, auth_request(&req));
    let limit = state.thumbnails.max_bytes();
    let mut body = MultipartUpload::from_request(req, THUMBNAIL_FIELD, limit);

    match state.thumbnails.upload(&request, &mut body).await {
        Ok(video) => json_response(StatusCode::OK, &video),
        Err(e) => error_response(&e),
    }
}

/// Copy headers into an [`AuthRequest`], names lowercased
fn auth_request(req: &Request<Incoming>) -> AuthRequest {
    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }

    AuthRequest {
        headers,
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
    }
}

/// Whether `name` is a single plain file name
pub fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Content type for a stored asset, by extension
pub fn asset_content_type(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

async fn serve_asset(root: &Path, name: &str) -> HttpResponse {
    if !is_safe_asset_name(name) {
        return not_found();
    }

    match tokio::fs::read(root.join(name)).await {
        Ok(data) => bytes_response(StatusCode::OK, asset_content_type(name), data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(),
        Err(e) => {
            tracing::error!(file = name, error = %e, "Failed to read asset");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
