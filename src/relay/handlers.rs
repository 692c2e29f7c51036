use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::{info, warn};

use super::error::RelayError;
use super::upstream::UpstreamEndpoint;
use super::RelayState;
use crate::capture::DataUrl;
use crate::detection::wire::{AnnotatedImageEnvelope, HealthStatus, PredictRequest};

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub async fn health(State(state): State<RelayState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        healthcheck: Some("ok".to_string()),
        space_url_configured: !state.config.space_url.is_empty(),
        token_configured: state.upstream.has_token(),
        space_url: Some(state.upstream.base_url().to_string()),
        environment: Some(state.config.environment.clone()),
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
    })
}

pub async fn predict_json(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let image = decode_image_payload(&headers, &body, state.config.max_image_bytes)?;
    info!("Image size: {} bytes", image.bytes.len());

    let response = state
        .upstream
        .forward(UpstreamEndpoint::DetectJson, &image)
        .await?;

    let value: Value = response.json().await.map_err(|e| {
        warn!("Inference service returned a non-JSON body: {}", e);
        RelayError::Internal("Inference service returned an invalid JSON response".to_string())
    })?;

    if value.get("detect_objects").is_none() && value.get("detect_objects_names").is_none() {
        warn!("Response missing expected detection keys: {}", value);
    } else {
        info!("Detections received from inference service");
    }

    Ok(Json(value))
}

pub async fn predict_image(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnnotatedImageEnvelope>, RelayError> {
    let image = decode_image_payload(&headers, &body, state.config.max_image_bytes)?;
    info!("Image size: {} bytes", image.bytes.len());

    let response = state
        .upstream
        .forward(UpstreamEndpoint::DetectImage, &image)
        .await?;

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RelayError::Internal(format!("Failed to read annotated image: {}", e)))?;
    info!("Received annotated image: {} bytes ({})", bytes.len(), mime_type);

    let size = bytes.len();
    let image = DataUrl::new(mime_type.clone(), bytes.to_vec()).encode();
    Ok(Json(AnnotatedImageEnvelope {
        image,
        size: Some(size),
        mime_type: Some(mime_type),
    }))
}

/// Bare `OPTIONS` requests get an empty 200; real preflights are answered by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn post_only() -> impl IntoResponse {
    RelayError::MethodNotAllowed("POST")
}

pub async fn get_only() -> impl IntoResponse {
    RelayError::MethodNotAllowed("GET")
}

/// Validate a relay request body and decode its image.
///
/// # Errors
/// Returns [`RelayError::BadRequest`] with a caller-facing message when the
/// content type, JSON body, data URL or image size is unacceptable.
pub fn decode_image_payload(
    headers: &HeaderMap,
    body: &[u8],
    max_image_bytes: usize,
) -> Result<DataUrl, RelayError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    info!("Content-Type: {}", content_type);

    if content_type.contains("multipart/form-data") {
        return Err(RelayError::BadRequest(
            "Please send image as base64 JSON: { \"image\": \"data:image/jpeg;base64,...\" }"
                .to_string(),
        ));
    }
    if !content_type.contains("application/json") {
        return Err(RelayError::BadRequest(
            "Content-Type must be application/json with base64 image".to_string(),
        ));
    }

    let request: PredictRequest = serde_json::from_slice(body)
        .map_err(|e| RelayError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let image = request
        .image
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| RelayError::BadRequest("Missing \"image\" field in request body".to_string()))?;

    let data_url = DataUrl::parse(&image).map_err(|e| match e {
        // Decoder detail stays in the log, callers get the stable message.
        crate::error::ScreeningError::Input(msg) if msg.starts_with("Invalid base64") => {
            warn!("{}", msg);
            RelayError::BadRequest("Invalid base64 image format".to_string())
        }
        other => RelayError::from(other),
    })?;

    if data_url.bytes.len() > max_image_bytes {
        return Err(RelayError::BadRequest(format!(
            "Image too large. Maximum size is {}",
            describe_size(max_image_bytes)
        )));
    }

    Ok(data_url)
}

fn describe_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const MAX: usize = 10 * 1024 * 1024;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn message(result: Result<DataUrl, RelayError>) -> String {
        match result {
            Err(RelayError::BadRequest(msg)) => msg,
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_valid_payload() {
        let body = br#"{"image":"data:image/jpeg;base64,/9j/"}"#;
        let image = decode_image_payload(&json_headers(), body, MAX).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_missing_image_field() {
        assert_eq!(
            message(decode_image_payload(&json_headers(), b"{}", MAX)),
            "Missing \"image\" field in request body"
        );
        assert_eq!(
            message(decode_image_payload(&json_headers(), br#"{"image":""}"#, MAX)),
            "Missing \"image\" field in request body"
        );
    }

    #[test]
    fn test_rejects_non_image_data_url() {
        let body = br#"{"image":"data:text/plain;base64,aGVsbG8="}"#;
        assert_eq!(
            message(decode_image_payload(&json_headers(), body, MAX)),
            "Image must be a valid base64 data URL"
        );
    }

    #[test]
    fn test_rejects_bad_base64() {
        let body = br#"{"image":"data:image/png;base64,@@@"}"#;
        assert_eq!(
            message(decode_image_payload(&json_headers(), body, MAX)),
            "Invalid base64 image format"
        );
        let body = br#"{"image":"data:image/png,abcd"}"#;
        assert_eq!(
            message(decode_image_payload(&json_headers(), body, MAX)),
            "Invalid base64 image format"
        );
    }

    #[test]
    fn test_rejects_oversized_image() {
        let body = br#"{"image":"data:image/jpeg;base64,/9j/"}"#;
        assert_eq!(
            message(decode_image_payload(&json_headers(), body, 2)),
            "Image too large. Maximum size is 2 bytes"
        );
    }

    #[test]
    fn test_content_type_checks() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=x"),
        );
        assert!(message(decode_image_payload(&headers, b"", MAX)).starts_with("Please send image as base64 JSON"));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(
            message(decode_image_payload(&headers, b"{}", MAX)),
            "Content-Type must be application/json with base64 image"
        );
    }

    #[test]
    fn test_describe_size() {
        assert_eq!(describe_size(10 * 1024 * 1024), "10MB");
        assert_eq!(describe_size(2048), "2KB");
        assert_eq!(describe_size(100), "100 bytes");
    }
}
