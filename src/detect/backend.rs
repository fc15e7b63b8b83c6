use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::frame::NormalizedFrame;

/// Which strategy produced a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    Primary,
    Fallback,
}

impl std::fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierMode::Primary => f.write_str("primary"),
            ClassifierMode::Fallback => f.write_str("fallback"),
        }
    }
}

/// Input contract shared by the sequence model, the normalizer and the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInputSpec {
    pub sequence_length: usize,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Declared shape of the sequence model's probability vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// `[non_event, event]`
    TwoClass,
    /// `[event]`
    Single,
}

impl OutputShape {
    /// Infer the shape from a model's concrete output dimensions.
    pub fn from_dims(dims: &[usize]) -> Result<Self, WatchError> {
        match dims.last() {
            Some(2) => Ok(OutputShape::TwoClass),
            Some(1) => Ok(OutputShape::Single),
            _ => Err(WatchError::ClassifierUnavailable(format!(
                "unsupported model output shape {:?}",
                dims
            ))),
        }
    }

    pub fn value_count(&self) -> usize {
        match self {
            OutputShape::TwoClass => 2,
            OutputShape::Single => 1,
        }
    }

    /// Pick the event probability out of a prediction.
    pub fn event_probability(&self, outputs: &[f32]) -> Result<f32, WatchError> {
        if outputs.len() != self.value_count() {
            return Err(WatchError::ClassifierUnavailable(format!(
                "model declared {:?} output but produced {} values",
                self,
                outputs.len()
            )));
        }
        let value = match self {
            OutputShape::TwoClass => outputs[1],
            OutputShape::Single => outputs[0],
        };
        if !value.is_finite() {
            return Err(WatchError::ClassifierUnavailable(
                "model produced a non-finite probability".into(),
            ));
        }
        Ok(value.clamp(0.0, 1.0))
    }
}

/// Pretrained sequence classifier, treated as an opaque capability.
///
/// `predict` receives exactly `input_spec().sequence_length` frames in
/// chronological order and returns the raw probability vector.
pub trait SequenceModel: Send {
    fn name(&self) -> &'static str;

    fn input_spec(&self) -> ModelInputSpec;

    fn output_shape(&self) -> OutputShape;

    fn predict(&mut self, frames: &[&NormalizedFrame]) -> Result<Vec<f32>, WatchError>;
}

/// One classification strategy, selected once at startup.
///
/// The dispatcher reports `Calibrating` until the window holds `min_frames`
/// frames, then asks the strategy for an event probability and applies the
/// shared threshold itself.
pub trait WindowClassifier: Send {
    fn name(&self) -> &'static str;

    fn mode(&self) -> ClassifierMode;

    fn min_frames(&self) -> usize;

    /// Model input contract, for strategies backed by a sequence model.
    fn input_spec(&self) -> Option<ModelInputSpec> {
        None
    }

    fn event_probability(&mut self, frames: &[&NormalizedFrame]) -> Result<f32, WatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_class_reads_second_value() -> Result<(), WatchError> {
        assert_eq!(OutputShape::TwoClass.event_probability(&[0.2, 0.8])?, 0.8);
        Ok(())
    }

    #[test]
    fn single_reads_lone_value() -> Result<(), WatchError> {
        assert_eq!(OutputShape::Single.event_probability(&[0.35])?, 0.35);
        Ok(())
    }

    #[test]
    fn mismatched_length_is_unavailable() {
        assert!(matches!(
            OutputShape::TwoClass.event_probability(&[0.9]),
            Err(WatchError::ClassifierUnavailable(_))
        ));
        assert!(matches!(
            OutputShape::Single.event_probability(&[0.1, 0.9]),
            Err(WatchError::ClassifierUnavailable(_))
        ));
    }

    #[test]
    fn non_finite_is_unavailable() {
        assert!(OutputShape::Single.event_probability(&[f32::NAN]).is_err());
    }

    #[test]
    fn shape_inferred_from_last_dimension() -> Result<(), WatchError> {
        assert_eq!(OutputShape::from_dims(&[1, 2])?, OutputShape::TwoClass);
        assert_eq!(OutputShape::from_dims(&[1, 1])?, OutputShape::Single);
        assert!(OutputShape::from_dims(&[1, 3]).is_err());
        assert!(OutputShape::from_dims(&[]).is_err());
        Ok(())
    }
}
