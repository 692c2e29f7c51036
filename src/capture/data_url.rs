//! `data:<mime>;base64,<payload>` encoding used on the relay wire.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{Result, ScreeningError};

const BASE64_MARKER: &str = ";base64,";

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parse an image data URL. Only `data:image/...;base64,` payloads are accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if !input.starts_with("data:image/") {
            return Err(ScreeningError::Input(
                "Image must be a valid base64 data URL".to_string(),
            ));
        }

        let (header, payload) = input.split_once(BASE64_MARKER).ok_or_else(|| {
            ScreeningError::Input("Invalid base64 image format".to_string())
        })?;
        if payload.is_empty() {
            return Err(ScreeningError::Input("Invalid base64 image format".to_string()));
        }

        let mime_type = header.trim_start_matches("data:").to_string();
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ScreeningError::Input(format!("Invalid base64 image format: {}", e)))?;

        Ok(Self { mime_type, bytes })
    }

    pub fn encode(&self) -> String {
        format!("data:{}{}{}", self.mime_type, BASE64_MARKER, STANDARD.encode(&self.bytes))
    }
}
