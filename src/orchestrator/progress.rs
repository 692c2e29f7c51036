use serde::Serialize;

use crate::capture::View;

/// Progress of one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
    /// View whose task most recently started, while the run is in flight.
    pub active_view: Option<View>,
}

impl ProgressState {
    pub fn started(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            active_view: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// Record one settled view. Never counts past `total`.
    pub(crate) fn settle_one(&mut self) {
        if self.completed < self.total {
            self.completed += 1;
        }
    }

    pub fn status_line(&self) -> String {
        match self.active_view {
            Some(view) if !self.is_finished() => format!(
                "Analyzing {} view... ({}/{})",
                view, self.completed, self.total
            ),
            _ if self.is_finished() => format!("Analysis complete ({}/{})", self.completed, self.total),
            _ => format!("Starting AI analysis of {} images...", self.total),
        }
    }
}
