use serde::Serialize;

/// Probability reported while the active classifier has too few frames.
pub const CALIBRATING_PROBABILITY: f32 = 0.1;

/// Discrete classification outcome for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Calibrating,
    NoEvent,
    EventDetected,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Label::Calibrating => "Calibrating...",
            Label::NoEvent => "No Violence",
            Label::EventDetected => "Violence Detected",
        };
        f.write_str(text)
    }
}

/// Probability in [0.0, 1.0] plus the label derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub probability: f32,
    pub label: Label,
}

impl ClassificationResult {
    pub fn calibrating() -> Self {
        Self {
            probability: CALIBRATING_PROBABILITY,
            label: Label::Calibrating,
        }
    }

    /// Apply the shared cutoff: strictly above `threshold` is an event.
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        let label = if probability > threshold {
            Label::EventDetected
        } else {
            Label::NoEvent
        };
        Self { probability, label }
    }
}
