//! JSON bodies exchanged between the client, the relay and the inference service.

use serde::{Deserialize, Serialize};

use super::types::{Detection, Detections};
use crate::error::{Result, ScreeningError};

/// Body of `POST /api/predict-json` and `POST /api/predict-image`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Structured detections as returned by the inference service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_objects_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_objects: Option<Vec<Detection>>,
}

impl DetectResponse {
    pub fn has_expected_keys(&self) -> bool {
        self.detect_objects_names.is_some() || self.detect_objects.is_some()
    }

    pub fn into_detections(self) -> Result<Detections> {
        if !self.has_expected_keys() {
            return Err(ScreeningError::Format(
                "Detection response has neither detect_objects nor detect_objects_names".to_string(),
            ));
        }

        let items = self.detect_objects.unwrap_or_default();
        for d in &items {
            if !d.confidence.is_finite() || !(0.0..=1.0).contains(&d.confidence) {
                return Err(ScreeningError::Format(format!(
                    "Confidence for '{}' is outside [0, 1]: {}",
                    d.label, d.confidence
                )));
            }
        }

        let names = self.detect_objects_names.unwrap_or_else(|| {
            items
                .iter()
                .map(|d| d.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });

        Ok(Detections { names, items })
    }
}

/// Annotated image relayed back as a data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedImageEnvelope {
    pub image: String,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Error body returned by the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub troubleshooting: Option<Vec<String>>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub healthcheck: Option<String>,
    #[serde(default)]
    pub space_url_configured: bool,
    #[serde(default)]
    pub token_configured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    /// Anything other than an explicit `"error"` counts as healthy.
    pub fn is_ok(&self) -> bool {
        self.healthcheck.as_deref() != Some("error")
    }
}
