use std::collections::BTreeMap;

use serde::Serialize;

use crate::capture::View;
use crate::detection::DetectionOutcome;

/// Merged outcomes of one screening run, keyed by view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreeningReport {
    pub outcomes: BTreeMap<View, DetectionOutcome>,
    pub summary: ScreeningSummary,
}

/// Overall status across all analyzed views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScreeningSummary {
    pub views_analyzed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_detections: usize,
    /// True when any successful view reported at least one finding.
    pub has_findings: bool,
}

impl ScreeningReport {
    pub fn from_outcomes(outcomes: BTreeMap<View, DetectionOutcome>) -> Self {
        let summary = ScreeningSummary::from_outcomes(&outcomes);
        Self { outcomes, summary }
    }

    pub fn get(&self, view: View) -> Option<&DetectionOutcome> {
        self.outcomes.get(&view)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl ScreeningSummary {
    fn from_outcomes(outcomes: &BTreeMap<View, DetectionOutcome>) -> Self {
        let mut summary = ScreeningSummary {
            views_analyzed: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes.values() {
            match outcome.detections() {
                Some(detections) => {
                    summary.succeeded += 1;
                    summary.total_detections += detections.len();
                    if !detections.is_empty() {
                        summary.has_findings = true;
                    }
                }
                None => summary.failed += 1,
            }
        }

        summary
    }
}
