//! HTTP client for the relay's detection, annotation and health endpoints.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::types::{AnnotatedImage, Detections};
use super::wire::{AnnotatedImageEnvelope, DetectResponse, ErrorEnvelope, HealthStatus, PredictRequest};
use crate::capture::{CapturedImage, DataUrl};
use crate::config::{parse_http_url, ClientConfig};
use crate::error::{Result, ScreeningError};

const HEALTH_PATH: &str = "health";
const PREDICT_JSON_PATH: &str = "predict-json";
const PREDICT_IMAGE_PATH: &str = "predict-image";

/// Longest excerpt of an unexpected body kept in error messages.
const EXCERPT_CHARS: usize = 200;

/// Client for one relay. Single attempt per call; no caching, no retries.
pub struct DetectionClient {
    client: reqwest::Client,
    api_base: Url,
    health_timeout: Duration,
}

impl DetectionClient {
    /// Create a client with the configured per-call timeouts:
    /// - detection/annotation: `request_timeout_secs` (30s default)
    /// - health probe: `health_timeout_secs` (5s default)
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut api_base = parse_http_url("client.api_base_url", &config.api_base_url)?;
        // Url::join drops the last segment unless the base ends with '/'
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("teledent/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ScreeningError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            health_timeout: config.health_timeout(),
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| ScreeningError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Fetch structured detections for one image.
    pub async fn detect(&self, image: &CapturedImage) -> Result<Detections> {
        info!("Requesting detections for {} view", image.view);
        let response = self.post_image(PREDICT_JSON_PATH, image).await?;
        let content_type = content_type_of(&response);
        let body = response
            .text()
            .await
            .map_err(|e| ScreeningError::from_reqwest(e, "Reading detection response"))?;

        let parsed: DetectResponse = parse_json_body(&body, content_type.as_deref(), "detection")?;
        let detections = parsed.into_detections()?;
        info!("{} view: {} detection(s)", image.view, detections.len());
        Ok(detections)
    }

    /// Fetch the annotated image for one capture.
    ///
    /// Accepts either a binary `image/*` body or a JSON envelope carrying a
    /// data URL, and normalizes both into an [`AnnotatedImage`].
    pub async fn annotate(&self, image: &CapturedImage) -> Result<AnnotatedImage> {
        info!("Requesting annotated image for {} view", image.view);
        let response = self.post_image(PREDICT_IMAGE_PATH, image).await?;
        let content_type = content_type_of(&response);

        if let Some(mime) = content_type.as_deref().filter(|ct| ct.starts_with("image/")) {
            let mime = mime.to_string();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ScreeningError::from_reqwest(e, "Reading annotated image"))?;
            if bytes.is_empty() {
                return Err(ScreeningError::Format("Annotated image body is empty".to_string()));
            }
            return Ok(AnnotatedImage::annotated(mime, bytes.to_vec()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScreeningError::from_reqwest(e, "Reading annotation response"))?;
        let envelope: AnnotatedImageEnvelope =
            parse_json_body(&body, content_type.as_deref(), "annotation")?;
        let DataUrl { mime_type, bytes } = DataUrl::parse(&envelope.image).map_err(|e| {
            ScreeningError::Format(format!("Annotation response carries an invalid image: {}", e))
        })?;
        Ok(AnnotatedImage::annotated(mime_type, bytes))
    }

    /// Bounded-time liveness probe. Never errors; any failure reads as unhealthy.
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint(HEALTH_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!("Health check skipped: {}", e);
                return false;
            }
        };

        info!("Checking API health at {}", url);
        let response = match self
            .client
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Health check failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("Health check returned non-OK status: {}", response.status());
            return false;
        }

        match response.json::<HealthStatus>().await {
            Ok(status) if status.is_ok() => {
                info!("Health check passed");
                true
            }
            Ok(_) => {
                warn!("Health check reported an error state");
                false
            }
            Err(e) => {
                warn!("Health check returned an unreadable body: {}", e);
                false
            }
        }
    }

    async fn post_image(&self, path: &str, image: &CapturedImage) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        let body = PredictRequest {
            image: Some(image.to_data_url()),
        };

        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ScreeningError::from_reqwest(e, &format!("POST {}", url)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let content_type = content_type_of(&response);
        let text = response.text().await.unwrap_or_else(|e| {
            warn!("Failed to read error body from {}: {}", url, e);
            String::new()
        });
        warn!("{} view: {} returned {}", image.view, url, status);
        Err(remote_error(status, content_type.as_deref(), &text))
    }
}

fn content_type_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
}

/// Build a `Remote` error from a non-2xx response, preferring the relay's
/// error envelope when the body carries one.
fn remote_error(status: StatusCode, content_type: Option<&str>, body: &str) -> ScreeningError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.details {
            Some(details) if !details.is_empty() => {
                format!("{} ({})", envelope.error, excerpt(&details))
            }
            _ => envelope.error,
        },
        Err(_) if looks_like_html(content_type, body) => html_excerpt(body),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        Err(_) => excerpt(body),
    };

    ScreeningError::Remote {
        status: status.as_u16(),
        message,
        endpoint_missing: status == StatusCode::NOT_FOUND,
    }
}

/// Parse a JSON body, rejecting HTML pages served in place of JSON.
fn parse_json_body<T: DeserializeOwned>(body: &str, content_type: Option<&str>, what: &str) -> Result<T> {
    if looks_like_html(content_type, body) {
        return Err(ScreeningError::Format(format!(
            "Expected JSON {} response but received an HTML page: {}",
            what,
            html_excerpt(body)
        )));
    }
    serde_json::from_str(body).map_err(|e| {
        ScreeningError::Format(format!(
            "Failed to parse {} response as JSON: {}. Body: {}",
            what,
            e,
            excerpt(body)
        ))
    })
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.contains("html")) {
        return true;
    }
    let head = body.trim_start();
    head.starts_with('<')
}

/// Plain-text excerpt of an HTML page for error messages.
fn html_excerpt(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 120).unwrap_or_else(|e| {
        warn!("html2text conversion failed: {}, using raw body", e);
        html.to_string()
    });
    excerpt(&text)
}

fn excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > EXCERPT_CHARS {
        let cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_gets_trailing_slash() {
        let client = DetectionClient::new(&ClientConfig {
            api_base_url: "http://localhost:3000/api".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.api_base().as_str(), "http://localhost:3000/api/");
        assert_eq!(
            client.endpoint(PREDICT_JSON_PATH).unwrap().as_str(),
            "http://localhost:3000/api/predict-json"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base() {
        let result = DetectionClient::new(&ClientConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(ScreeningError::Config(_))));
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html(Some("text/html"), "{}"));
        assert!(looks_like_html(None, "  <!DOCTYPE html><html></html>"));
        assert!(!looks_like_html(Some("application/json"), r#"{"a":1}"#));
    }

    #[test]
    fn test_parse_json_body_rejects_html() {
        let html = "<html><body><h1>502 Bad Gateway</h1></body></html>";
        let err = parse_json_body::<DetectResponse>(html, Some("text/html"), "detection").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ScreeningError::Format(_)));
        assert!(msg.contains("HTML page"), "{}", msg);
        assert!(msg.contains("502 Bad Gateway"), "{}", msg);
        assert!(!msg.contains("<h1>"), "{}", msg);
    }

    #[test]
    fn test_parse_json_body_rejects_garbage() {
        let err = parse_json_body::<DetectResponse>("oops", None, "detection").unwrap_err();
        assert!(err.to_string().contains("Failed to parse detection response"));
    }

    #[test]
    fn test_remote_error_uses_envelope() {
        let body = r#"{"error": "Endpoint not found on inference service", "details": "returned 404"}"#;
        let err = remote_error(StatusCode::NOT_FOUND, Some("application/json"), body);
        match err {
            ScreeningError::Remote {
                status,
                message,
                endpoint_missing,
            } => {
                assert_eq!(status, 404);
                assert!(endpoint_missing);
                assert_eq!(message, "Endpoint not found on inference service (returned 404)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_remote_error_plain_body() {
        let err = remote_error(StatusCode::BAD_GATEWAY, None, "");
        match err {
            ScreeningError::Remote {
                message,
                endpoint_missing,
                ..
            } => {
                assert_eq!(message, "Bad Gateway");
                assert!(!endpoint_missing);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(500);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }
}
