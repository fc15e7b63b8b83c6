use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::api::StatusSnapshot;
use crate::detect::Label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Operator console line: `Passengers: n | Status: ... | Confidence: p`.
///
/// On a TTY (or with `--ui pretty`) the line is a live spinner. Otherwise a
/// plain line goes to stderr every `plain_every` updates and whenever the
/// label changes.
pub struct StatusLine {
    spinner: Option<ProgressBar>,
    plain_every: u64,
    updates: u64,
    last_label: Option<Label>,
}

impl StatusLine {
    pub fn new(mode: UiMode, is_tty: bool, plain_every: u64) -> Self {
        let use_pretty = match mode {
            UiMode::Pretty => true,
            UiMode::Auto => is_tty,
            UiMode::Plain => false,
        };
        let spinner = use_pretty.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner
        });
        Self {
            spinner,
            plain_every: plain_every.max(1),
            updates: 0,
            last_label: None,
        }
    }

    pub fn is_pretty(&self) -> bool {
        self.spinner.is_some()
    }

    pub fn update(&mut self, snapshot: &StatusSnapshot) {
        let line = render(snapshot);
        self.updates += 1;
        let label_changed = self.last_label != Some(snapshot.label);
        self.last_label = Some(snapshot.label);
        match &self.spinner {
            Some(spinner) => spinner.set_message(line),
            None => {
                if label_changed || self.updates % self.plain_every == 0 {
                    eprintln!("{line}");
                }
            }
        }
    }

    pub fn finish(self, summary: &str) {
        match self.spinner {
            Some(spinner) => spinner.finish_with_message(summary.to_string()),
            None => eprintln!("{summary}"),
        }
    }
}

pub fn render(snapshot: &StatusSnapshot) -> String {
    format!(
        "Passengers: {} | Status: {} | Confidence: {:.2} | Alerts: {} ({})",
        snapshot.candidates,
        snapshot.label,
        snapshot.probability,
        snapshot.total_alerts,
        snapshot.current_status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertStatus;

    #[test]
    fn render_uses_display_labels() {
        let snapshot = StatusSnapshot {
            total_alerts: 1,
            current_status: AlertStatus::Active,
            label: Label::EventDetected,
            probability: 0.876,
            candidates: 2,
            ..StatusSnapshot::default()
        };
        assert_eq!(
            render(&snapshot),
            "Passengers: 2 | Status: Violence Detected | Confidence: 0.88 | Alerts: 1 (Alert Active)"
        );
    }

    #[test]
    fn plain_mode_has_no_spinner() {
        assert!(!StatusLine::new(UiMode::Plain, true, 15).is_pretty());
        assert!(!StatusLine::new(UiMode::Auto, false, 15).is_pretty());
    }
}
