//! Response helpers

use crate::ingest::IngestError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub type HttpResponse = Response<Full<Bytes>>;

/// Response with `body` and a static content type
pub fn bytes_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => bytes_response(status, "application/json", body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `{"error": message}`
pub fn error_json(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    bytes_response(status, "application/json", body.to_string())
}

/// Map an [`IngestError`] to its status and public message
pub fn error_response(error: &IngestError) -> HttpResponse {
    let status = error.status_code();
    let mut response = error_json(status, &error.public_message());

    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

pub fn not_found() -> HttpResponse {
    error_json(StatusCode::NOT_FOUND, "Not Found")
}
