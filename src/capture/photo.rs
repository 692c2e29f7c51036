use std::path::Path;

use tracing::info;

use super::data_url::DataUrl;
use super::view::View;
use crate::error::{Result, ScreeningError};

/// Maximum decoded size of a single capture (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// An encoded photo taken for one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub view: View,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CapturedImage {
    /// Build a capture from raw encoded bytes, sniffing the format.
    pub fn from_bytes(view: View, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ScreeningError::Input(format!("Image for {} view is empty", view)));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ScreeningError::Input(format!(
                "Image for {} view is too large ({} bytes). Maximum size is 10MB",
                view,
                bytes.len()
            )));
        }

        let format = image::guess_format(&bytes).map_err(|e| {
            ScreeningError::Input(format!(
                "Unrecognized image format for {} view: {}. Ensure it's a valid JPEG/PNG/WebP.",
                view, e
            ))
        })?;

        Ok(Self {
            view,
            mime_type: format.to_mime_type().to_string(),
            bytes,
        })
    }

    /// Build a capture from a `data:image/...;base64,` URL.
    pub fn from_data_url(view: View, data_url: &str) -> Result<Self> {
        let DataUrl { mime_type, bytes } = DataUrl::parse(data_url)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ScreeningError::Input(
                "Image too large. Maximum size is 10MB".to_string(),
            ));
        }
        Ok(Self {
            view,
            bytes,
            mime_type,
        })
    }

    /// Load a capture from a file on disk (the upload path).
    pub fn from_file(view: View, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ScreeningError::Input(format!("Failed to read {} image '{}': {}", view, path.display(), e))
        })?;
        info!("Loaded {} view from {} ({} bytes)", view, path.display(), bytes.len());
        Self::from_bytes(view, bytes)
    }

    pub fn to_data_url(&self) -> String {
        DataUrl::new(self.mime_type.clone(), self.bytes.clone()).encode()
    }

    /// File extension matching the mime type, for writing results to disk.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    image::ImageFormat::from_mime_type(mime_type)
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn jpeg_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(16, 16);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_from_bytes_sniffs_jpeg() {
        let capture = CapturedImage::from_bytes(View::Front, jpeg_bytes()).unwrap();
        assert_eq!(capture.mime_type, "image/jpeg");
        assert_eq!(capture.extension(), "jpg");
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = CapturedImage::from_bytes(View::Left, b"not an image".to_vec()).unwrap_err();
        assert!(err.to_string().contains("Unrecognized image format for left view"));
    }

    #[test]
    fn test_from_bytes_rejects_empty_and_oversized() {
        assert!(CapturedImage::from_bytes(View::Left, Vec::new()).is_err());

        let mut big = jpeg_bytes();
        big.resize(MAX_IMAGE_BYTES + 1, 0);
        let err = CapturedImage::from_bytes(View::Upper, big).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_data_url_round_trip() {
        let capture = CapturedImage::from_bytes(View::Lower, jpeg_bytes()).unwrap();
        let url = capture.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let back = CapturedImage::from_data_url(View::Lower, &url).unwrap();
        assert_eq!(back, capture);
        assert!(image::load_from_memory(&back.bytes).is_ok());
    }

    #[test]
    fn test_extension_for_unknown_mime() {
        assert_eq!(extension_for_mime("application/octet-stream"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
    }
}
