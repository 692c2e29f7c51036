use std::path::Path;

use anyhow::{bail, Context};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::capture::{photo::extension_for_mime, CaptureStore, CapturedImage};
use crate::cli::ScreenArgs;
use crate::config::AppConfig;
use crate::detection::{DetectionClient, DetectionOutcome};
use crate::orchestrator::{Orchestrator, ProgressState, ScreeningReport};

/// Load the supplied photos, screen them and report the results.
pub async fn run_screening(config: &AppConfig, args: &ScreenArgs) -> anyhow::Result<()> {
    let mut store = CaptureStore::new();
    for (view, path) in args.view_paths() {
        let image = CapturedImage::from_file(view, path)?;
        store.set_image(view, image);
    }

    let images = if args.allow_incomplete {
        if store.images().is_empty() {
            bail!("No images supplied. Pass at least one of --front, --left, --right, --upper, --lower");
        }
        let missing = store.missing_views();
        if !missing.is_empty() {
            warn!("Screening without {} view(s)", missing.len());
        }
        store.images().clone()
    } else {
        store.proceed()?
    };

    let client = DetectionClient::new(&config.client)?;
    let orchestrator = Orchestrator::new(client);

    let logger = spawn_progress_logger(orchestrator.subscribe());
    let result = orchestrator.run(&images).await;
    // Closing the channel ends the logger.
    drop(orchestrator);
    join_progress_logger(logger).await;
    let report = result?;

    if let Some(ref dir) = args.out_dir {
        write_annotated_images(&report, dir)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    store.clear();
    Ok(())
}

fn spawn_progress_logger(mut progress: watch::Receiver<ProgressState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow_and_update();
            info!("{}", state.status_line());
        }
    })
}

/// Wait for the logger to drain. Returns false if it panicked or was cancelled.
async fn join_progress_logger(logger: JoinHandle<()>) -> bool {
    match logger.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress logger stopped abnormally: {}", e);
            false
        }
    }
}

fn write_annotated_images(report: &ScreeningReport, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for (view, outcome) in &report.outcomes {
        let Some(annotated) = outcome.annotated() else {
            continue;
        };
        let path = dir.join(format!(
            "{}-annotated.{}",
            view,
            extension_for_mime(&annotated.mime_type)
        ));
        std::fs::write(&path, &annotated.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} view image to {}", view, path.display());
    }
    Ok(())
}

fn print_summary(report: &ScreeningReport) {
    for (view, outcome) in &report.outcomes {
        match outcome {
            DetectionOutcome::Success {
                detections,
                annotated,
            } => {
                let findings = if detections.is_empty() {
                    "no findings".to_string()
                } else {
                    detections
                        .items
                        .iter()
                        .map(|d| format!("{} ({:.0}%)", d.label, d.confidence * 100.0))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let note = if annotated.is_original { " [original image]" } else { "" };
                println!("{:<6} {}{}", view, findings, note);
            }
            DetectionOutcome::Failure { reason } => {
                println!("{:<6} analysis failed: {}", view, reason);
            }
        }
    }

    let summary = &report.summary;
    println!(
        "\n{} of {} views analyzed, {} detection(s) total",
        summary.succeeded, summary.views_analyzed, summary.total_detections
    );
    if summary.has_findings {
        println!("Potential issues detected. Consult a dentist for a full examination.");
    } else if summary.failed == 0 {
        println!("No issues detected. Keep up regular brushing and checkups.");
    }
}
