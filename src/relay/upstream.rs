//! Forwarding of a single image to the hosted inference service.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{error, info, warn};

use super::error::RelayError;
use crate::capture::DataUrl;
use crate::config::{parse_http_url, RelayConfig};
use crate::error::ScreeningError;

/// File name the inference service expects on the multipart upload.
const UPLOAD_FILENAME: &str = "dental-image.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamEndpoint {
    /// Structured detections as JSON
    DetectJson,
    /// Annotated image with bounding boxes
    DetectImage,
}

impl UpstreamEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            UpstreamEndpoint::DetectJson => "img_object_detection_to_json",
            UpstreamEndpoint::DetectImage => "img_object_detection_to_img",
        }
    }
}

/// Client for the inference service behind the relay.
pub struct InferenceUpstream {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl InferenceUpstream {
    pub fn new(config: &RelayConfig) -> Result<Self, ScreeningError> {
        parse_http_url("relay.space_url", &config.space_url)?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("teledent-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScreeningError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.space_url.trim_end_matches('/').to_string(),
            token: config.hf_token.clone().filter(|t| !t.is_empty()),
            timeout: config.upstream_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn endpoint_url(&self, endpoint: UpstreamEndpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// POST the image as multipart field `file` and return the successful response.
    ///
    /// Non-2xx statuses, timeouts and connection failures are classified into
    /// [`RelayError`] variants.
    pub async fn forward(
        &self,
        endpoint: UpstreamEndpoint,
        image: &DataUrl,
    ) -> Result<reqwest::Response, RelayError> {
        let url = self.endpoint_url(endpoint);

        let part = Part::bytes(image.bytes.clone())
            .file_name(UPLOAD_FILENAME)
            .mime_str(&image.mime_type)
            .map_err(|e| {
                RelayError::BadRequest(format!("Unsupported image type '{}': {}", image.mime_type, e))
            })?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&url).multipart(form).timeout(self.timeout);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
            info!("Using inference token for authentication");
        }

        info!("Forwarding request to: {}", url);
        let response = request.send().await.map_err(|e| self.classify_send_error(&url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|e| {
            warn!(url = %url, "Failed to read inference error body: {}", e);
            String::new()
        });
        let preview: String = body.chars().take(500).collect();

        if status == StatusCode::NOT_FOUND {
            error!(
                url = %url,
                image_bytes = image.bytes.len(),
                token_sent = self.token.is_some(),
                body = %preview,
                "Inference endpoint returned 404. Verify the Space is running, the endpoint \
                 exists and it accepts multipart/form-data POSTs"
            );
            return Err(RelayError::UpstreamNotFound { url });
        }

        error!(url = %url, status = status.as_u16(), body = %preview, "Inference API error");
        Err(RelayError::Upstream {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            details: body,
            url,
        })
    }

    fn classify_send_error(&self, url: &str, err: reqwest::Error) -> RelayError {
        error!(url = %url, "Error forwarding request: {}", err);
        if err.is_timeout() {
            RelayError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() || err.is_request() {
            RelayError::Unreachable(err.to_string())
        } else {
            RelayError::Internal(err.to_string())
        }
    }
}
