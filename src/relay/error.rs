use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::detection::wire::ErrorEnvelope;
use crate::error::ScreeningError;

/// Failures the relay reports to its callers.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed. Use {0}.")]
    MethodNotAllowed(&'static str),

    #[error("Endpoint not found on inference service")]
    UpstreamNotFound { url: String },

    #[error("Inference API error: {reason}")]
    Upstream {
        status: u16,
        reason: String,
        details: String,
        url: String,
    },

    #[error("Request timeout ({secs} seconds)")]
    Timeout { secs: u64 },

    #[error("Unable to reach AI service. Please try again later.")]
    Unreachable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::UpstreamNotFound { .. } => StatusCode::NOT_FOUND,
            RelayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::Timeout { .. } | RelayError::Unreachable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.to_string());
        match self {
            RelayError::BadRequest(_) | RelayError::MethodNotAllowed(_) => envelope,
            RelayError::UpstreamNotFound { url } => ErrorEnvelope {
                details: Some(format!("The endpoint {} returned 404", url)),
                requested_url: Some(url.clone()),
                troubleshooting: Some(vec![
                    "Verify the Space is running and accessible".to_string(),
                    "Check if the endpoint path is correct".to_string(),
                    "Ensure the Space API matches the expected interface".to_string(),
                ]),
                ..envelope
            },
            RelayError::Upstream { details, url, .. } => ErrorEnvelope {
                details: Some(details.clone()),
                requested_url: Some(url.clone()),
                ..envelope
            },
            RelayError::Timeout { .. } => {
                envelope.with_details("The AI service took too long to respond")
            }
            RelayError::Unreachable(details) | RelayError::Internal(details) => {
                envelope.with_details(details.clone())
            }
        }
    }
}

impl From<ScreeningError> for RelayError {
    fn from(err: ScreeningError) -> Self {
        match err {
            ScreeningError::Input(msg) => RelayError::BadRequest(msg),
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}
