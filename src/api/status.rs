use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::alert::{AlertStats, AlertStatus};
use crate::detect::{ClassifierMode, Label, CALIBRATING_PROBABILITY};
use crate::pipeline::PipelineStatus;

/// Point-in-time view of the watcher, as served by `GET /status`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub total_alerts: u64,
    pub current_status: AlertStatus,
    pub label: Label,
    pub probability: f32,
    pub classifier: ClassifierMode,
    pub frames_processed: u64,
    /// Candidates reported by the detector in the latest cycle.
    pub candidates: usize,
}

impl StatusSnapshot {
    pub fn new(alerts: AlertStats, pipeline: PipelineStatus, candidates: usize) -> Self {
        Self {
            total_alerts: alerts.total_alerts,
            current_status: alerts.current_status,
            label: pipeline.last.label,
            probability: pipeline.last.probability,
            classifier: pipeline.classifier,
            frames_processed: pipeline.frames_processed,
            candidates,
        }
    }

    pub fn alert_stats(&self) -> AlertStats {
        AlertStats {
            total_alerts: self.total_alerts,
            current_status: self.current_status,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            total_alerts: 0,
            current_status: AlertStatus::Normal,
            label: Label::Calibrating,
            probability: CALIBRATING_PROBABILITY,
            classifier: ClassifierMode::Fallback,
            frames_processed: 0,
            candidates: 0,
        }
    }
}

/// Shared, read-mostly copy of the latest snapshot.
///
/// The processing cycle is the only writer; readers never touch the alert
/// state machine itself.
#[derive(Clone, Debug, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        match self.inner.write() {
            Ok(mut current) => *current = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        match self.inner.read() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
