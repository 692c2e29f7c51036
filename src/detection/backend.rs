use async_trait::async_trait;

use super::client::DetectionClient;
use super::types::{AnnotatedImage, Detections};
use crate::capture::CapturedImage;
use crate::error::Result;

/// The three remote operations the orchestrator needs.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    async fn detect(&self, image: &CapturedImage) -> Result<Detections>;

    async fn annotate(&self, image: &CapturedImage) -> Result<AnnotatedImage>;

    /// Liveness probe. Must not error; unhealthy is `false`.
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl DetectionBackend for DetectionClient {
    async fn detect(&self, image: &CapturedImage) -> Result<Detections> {
        DetectionClient::detect(self, image).await
    }

    async fn annotate(&self, image: &CapturedImage) -> Result<AnnotatedImage> {
        DetectionClient::annotate(self, image).await
    }

    async fn health_check(&self) -> bool {
        DetectionClient::health_check(self).await
    }
}
