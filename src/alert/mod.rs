//! Edge-triggered alerting.
//!
//! `AlertStateMachine` moves between `Normal` and `Active` only on observed
//! label changes. Entering `Active` writes exactly one `AlertRecord`; staying
//! there writes nothing, no matter how many event cycles follow. `Calibrating`
//! never changes state.

mod sink;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::detect::{ClassificationResult, Label};

pub use sink::{AlertSink, FileAlertLog, InMemoryAlertLog};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write-once alert entry.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl AlertRecord {
    pub fn new(sequence: u64, message: String) -> Self {
        Self {
            sequence,
            timestamp: Local::now(),
            message,
        }
    }

    /// `[YYYY-MM-DD HH:MM:SS] ALERT: <message>`
    pub fn log_line(&self) -> String {
        format!(
            "[{}] ALERT: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AlertStatus {
    #[default]
    Normal,
    #[serde(rename = "Alert Active")]
    Active,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Normal => f.write_str("Normal"),
            AlertStatus::Active => f.write_str("Alert Active"),
        }
    }
}

/// Read-only view returned by `AlertStateMachine::stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlertStats {
    pub total_alerts: u64,
    pub current_status: AlertStatus,
}

/// What a single observation did to the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum AlertTransition {
    Unchanged,
    Raised(AlertRecord),
    Resolved,
}

pub struct AlertStateMachine {
    status: AlertStatus,
    total_alerts: u64,
    sink: Box<dyn AlertSink>,
    log_failures: u64,
}

impl AlertStateMachine {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            status: AlertStatus::Normal,
            total_alerts: 0,
            sink,
            log_failures: 0,
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn stats(&self) -> AlertStats {
        AlertStats {
            total_alerts: self.total_alerts,
            current_status: self.status,
        }
    }

    /// Alert records that could not be persisted.
    pub fn log_failures(&self) -> u64 {
        self.log_failures
    }

    /// Feed one cycle's classification.
    pub fn observe(&mut self, result: &ClassificationResult) -> AlertTransition {
        match (self.status, result.label) {
            (AlertStatus::Normal, Label::EventDetected) => {
                self.status = AlertStatus::Active;
                AlertTransition::Raised(self.raise(result.probability))
            }
            (AlertStatus::Active, Label::NoEvent) => {
                self.status = AlertStatus::Normal;
                log::info!("violence situation resolved");
                AlertTransition::Resolved
            }
            _ => AlertTransition::Unchanged,
        }
    }

    fn raise(&mut self, probability: f32) -> AlertRecord {
        self.total_alerts += 1;
        let record = AlertRecord::new(
            self.total_alerts,
            format!("Violence detected with probability {:.2}", probability),
        );
        log::warn!("{}", record.log_line());
        if let Err(err) = self.sink.append(&record) {
            self.log_failures += 1;
            log::error!("alert #{} not persisted: {}", record.sequence, err);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;

    fn labelled(label: Label) -> ClassificationResult {
        let probability = match label {
            Label::Calibrating => 0.1,
            Label::NoEvent => 0.2,
            Label::EventDetected => 0.91,
        };
        ClassificationResult { probability, label }
    }

    struct BrokenSink;

    impl AlertSink for BrokenSink {
        fn append(&mut self, _record: &AlertRecord) -> Result<(), WatchError> {
            Err(WatchError::LogWrite {
                path: "/read-only/alerts.log".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn scenario_sequence_raises_two_alerts() {
        let log = InMemoryAlertLog::new();
        let mut machine = AlertStateMachine::new(Box::new(log.clone()));
        let labels = [
            Label::NoEvent,
            Label::EventDetected,
            Label::EventDetected,
            Label::NoEvent,
            Label::EventDetected,
        ];
        let transitions: Vec<AlertTransition> =
            labels.iter().map(|l| machine.observe(&labelled(*l))).collect();

        assert!(matches!(transitions[0], AlertTransition::Unchanged));
        assert!(matches!(transitions[1], AlertTransition::Raised(ref r) if r.sequence == 1));
        assert!(matches!(transitions[2], AlertTransition::Unchanged));
        assert!(matches!(transitions[3], AlertTransition::Resolved));
        assert!(matches!(transitions[4], AlertTransition::Raised(ref r) if r.sequence == 2));
        assert_eq!(machine.stats().total_alerts, 2);
        assert_eq!(machine.status(), AlertStatus::Active);
        assert_eq!(log.lines().len(), 2);
    }

    #[test]
    fn long_event_run_raises_once() {
        let log = InMemoryAlertLog::new();
        let mut machine = AlertStateMachine::new(Box::new(log.clone()));
        for _ in 0..50 {
            machine.observe(&labelled(Label::EventDetected));
        }
        assert_eq!(machine.stats().total_alerts, 1);
        assert_eq!(log.lines().len(), 1);
    }

    #[test]
    fn calibrating_never_transitions() {
        let mut machine = AlertStateMachine::new(Box::new(InMemoryAlertLog::new()));
        assert_eq!(
            machine.observe(&labelled(Label::Calibrating)),
            AlertTransition::Unchanged
        );
        machine.observe(&labelled(Label::EventDetected));
        assert_eq!(
            machine.observe(&labelled(Label::Calibrating)),
            AlertTransition::Unchanged
        );
        assert_eq!(machine.status(), AlertStatus::Active);
    }

    #[test]
    fn no_resolution_while_normal() {
        let mut machine = AlertStateMachine::new(Box::new(InMemoryAlertLog::new()));
        for _ in 0..3 {
            assert_eq!(
                machine.observe(&labelled(Label::NoEvent)),
                AlertTransition::Unchanged
            );
        }
        assert_eq!(machine.stats(), AlertStats::default());
    }

    #[test]
    fn log_failure_still_counts_alert() {
        let mut machine = AlertStateMachine::new(Box::new(BrokenSink));
        let transition = machine.observe(&labelled(Label::EventDetected));
        assert!(matches!(transition, AlertTransition::Raised(_)));
        assert_eq!(machine.stats().total_alerts, 1);
        assert_eq!(machine.status(), AlertStatus::Active);
        assert_eq!(machine.log_failures(), 1);
    }

    #[test]
    fn record_message_carries_probability() {
        let mut machine = AlertStateMachine::new(Box::new(InMemoryAlertLog::new()));
        let AlertTransition::Raised(record) = machine.observe(&labelled(Label::EventDetected))
        else {
            panic!("expected alert");
        };
        assert_eq!(record.message, "Violence detected with probability 0.91");
        let line = record.log_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] ALERT: Violence detected with probability 0.91"));
        // "[YYYY-MM-DD HH:MM:SS]" is 21 characters.
        assert_eq!(line.find(']'), Some(20));
    }

    #[test]
    fn stats_serialize_with_display_status() -> anyhow::Result<()> {
        let stats = AlertStats {
            total_alerts: 3,
            current_status: AlertStatus::Active,
        };
        let json = serde_json::to_string(&stats)?;
        assert_eq!(json, r#"{"total_alerts":3,"current_status":"Alert Active"}"#);
        Ok(())
    }
}
