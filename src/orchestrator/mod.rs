//! Multi-view screening: one detect/annotate pair per captured view, run
//! concurrently, merged into a single report.
//!
//! 1. Liveness probe; an unhealthy backend aborts the whole run before any
//!    per-view call is made.
//! 2. Every view runs `detect`, then `annotate` if detection succeeded. An
//!    annotation failure keeps the view successful with the original photo.
//! 3. Each view turns its own error into `DetectionOutcome::Failure`; siblings
//!    are never cancelled.
//! 4. The run waits for every view (join-all) and merges by view label.

pub mod progress;
pub mod report;

use std::collections::BTreeMap;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::capture::{CapturedImage, SessionImageSet, View};
use crate::detection::{AnnotatedImage, DetectionBackend, DetectionOutcome};
use crate::error::{Result, ScreeningError};

pub use progress::ProgressState;
pub use report::{ScreeningReport, ScreeningSummary};

/// Runs screening analyses against a detection backend.
pub struct Orchestrator<B> {
    backend: B,
    progress: watch::Sender<ProgressState>,
}

impl<B: DetectionBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        let (progress, _) = watch::channel(ProgressState::default());
        Self { backend, progress }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Watch progress of the current (or next) run.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> ProgressState {
        *self.progress.borrow()
    }

    /// Analyze every populated view of `images`.
    ///
    /// # Errors
    /// - `Input` if `images` is empty
    /// - `Unavailable` if the liveness probe fails (no per-view calls are made)
    ///
    /// Per-view failures never surface here; they become `Failure` outcomes.
    pub async fn run(&self, images: &SessionImageSet) -> Result<ScreeningReport> {
        if images.is_empty() {
            return Err(ScreeningError::Input("No images to analyze".to_string()));
        }

        info!("Checking API health...");
        if !self.backend.health_check().await {
            warn!("Health check failed - analysis service not responding");
            return Err(ScreeningError::Unavailable(
                "Unable to connect to the analysis service. Check your connection and try again."
                    .to_string(),
            ));
        }

        let total = images.len();
        info!("Processing {} images...", total);
        self.progress.send_replace(ProgressState::started(total));

        let tasks = images.iter().map(|image| self.analyze_view(image));
        let settled = join_all(tasks).await;

        self.progress.send_modify(|p| p.active_view = None);

        let outcomes: BTreeMap<View, DetectionOutcome> = settled.into_iter().collect();
        let report = ScreeningReport::from_outcomes(outcomes);
        info!(
            "Analysis complete: {} views, {} succeeded, {} failed, {} detections",
            report.summary.views_analyzed,
            report.summary.succeeded,
            report.summary.failed,
            report.summary.total_detections
        );
        Ok(report)
    }

    /// One view's task. Infallible: every error becomes a `Failure` outcome.
    async fn analyze_view(&self, image: &CapturedImage) -> (View, DetectionOutcome) {
        let view = image.view;
        self.progress.send_modify(|p| p.active_view = Some(view));
        info!("Processing {} view...", view);

        let outcome = match self.backend.detect(image).await {
            Ok(detections) => {
                let annotated = match self.backend.annotate(image).await {
                    Ok(annotated) => annotated,
                    Err(e) => {
                        warn!("Failed to get annotated image for {}: {}. Using original image", view, e);
                        AnnotatedImage::original(image)
                    }
                };
                DetectionOutcome::Success {
                    detections,
                    annotated,
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    warn!("{} view timed out waiting for detections", view);
                }
                warn!("Error processing {} view: {}", view, e);
                DetectionOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        };

        self.progress.send_modify(|p| p.settle_one());
        (view, outcome)
    }
}
