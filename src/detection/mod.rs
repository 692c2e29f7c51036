//! Remote dental-condition detection through the relay.

pub mod backend;
pub mod client;
pub mod types;
pub mod wire;

pub use backend::DetectionBackend;
pub use client::DetectionClient;
pub use types::{AnnotatedImage, Detection, DetectionOutcome, Detections};
