pub mod capture;
pub mod cli;
mod commands;
pub mod config;
pub mod detection;
pub mod error;
pub mod orchestrator;
pub mod relay;

pub use capture::{CaptureStore, CapturedImage, SessionImageSet, View};
pub use detection::{DetectionBackend, DetectionClient, DetectionOutcome};
pub use error::ScreeningError;
pub use orchestrator::{Orchestrator, ProgressState, ScreeningReport};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    commands::dispatch(cli).await
}
