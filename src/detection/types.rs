//! Detection results for a single view.

use serde::{Deserialize, Serialize, Serializer};

use crate::capture::{CapturedImage, DataUrl};

/// One labeled finding from the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Condition name (e.g. "Cavity"). Called `name` on the wire.
    #[serde(rename = "name")]
    pub label: String,
    /// Confidence score in [0, 1]
    pub confidence: f32,
}

/// All findings for one image, in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detections {
    /// Comma-separated summary of the detected labels
    pub names: String,
    pub items: Vec<Detection>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Photo overlaid with bounding boxes, or the original photo when annotation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedImage {
    #[serde(rename = "size", serialize_with = "serialize_len")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// True when this is the unannotated capture used as a fallback.
    pub is_original: bool,
}

impl AnnotatedImage {
    pub fn annotated(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            is_original: false,
        }
    }

    /// Fallback visual: the capture itself, byte for byte.
    pub fn original(image: &CapturedImage) -> Self {
        Self {
            bytes: image.bytes.clone(),
            mime_type: image.mime_type.clone(),
            is_original: true,
        }
    }

    pub fn to_data_url(&self) -> String {
        DataUrl::new(self.mime_type.clone(), self.bytes.clone()).encode()
    }
}

fn serialize_len<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

/// Result of analyzing one view. Exactly one per requested view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionOutcome {
    Success {
        detections: Detections,
        annotated: AnnotatedImage,
    },
    Failure {
        reason: String,
    },
}

impl DetectionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DetectionOutcome::Success { .. })
    }

    pub fn detections(&self) -> Option<&Detections> {
        match self {
            DetectionOutcome::Success { detections, .. } => Some(detections),
            DetectionOutcome::Failure { .. } => None,
        }
    }

    pub fn annotated(&self) -> Option<&AnnotatedImage> {
        match self {
            DetectionOutcome::Success { annotated, .. } => Some(annotated),
            DetectionOutcome::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::View;

    #[test]
    fn test_outcome_serialize_success() {
        let outcome = DetectionOutcome::Success {
            detections: Detections {
                names: "Cavity".to_string(),
                items: vec![Detection {
                    label: "Cavity".to_string(),
                    confidence: 0.5,
                }],
            },
            annotated: AnnotatedImage::annotated("image/jpeg", vec![1, 2, 3]),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["detections"]["items"][0]["name"], "Cavity");
        assert_eq!(json["annotated"]["size"], 3);
        assert_eq!(json["annotated"]["is_original"], false);
    }

    #[test]
    fn test_outcome_serialize_failure() {
        let outcome = DetectionOutcome::Failure {
            reason: "timed out".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failure", "reason": "timed out"}));
        assert!(outcome.detections().is_none());
        assert!(outcome.annotated().is_none());
    }

    #[test]
    fn test_original_fallback_is_byte_identical() {
        let capture = CapturedImage {
            view: View::Front,
            bytes: vec![0xFF, 0xD8, 0x00, 0x42],
            mime_type: "image/jpeg".to_string(),
        };
        let fallback = AnnotatedImage::original(&capture);
        assert!(fallback.is_original);
        assert_eq!(fallback.bytes, capture.bytes);
        assert_eq!(fallback.to_data_url(), capture.to_data_url());
    }
}
