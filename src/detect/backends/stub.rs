use std::collections::VecDeque;

use crate::detect::backend::{ModelInputSpec, OutputShape, SequenceModel};
use crate::error::WatchError;
use crate::frame::NormalizedFrame;

/// Scripted sequence model for tests and dry runs.
///
/// Replays queued outputs (or failures) in order, then repeats the default
/// output forever.
pub struct StubSequenceModel {
    spec: ModelInputSpec,
    shape: OutputShape,
    script: VecDeque<Result<Vec<f32>, String>>,
    default_output: Vec<f32>,
    calls: usize,
}

impl StubSequenceModel {
    pub fn new(spec: ModelInputSpec, shape: OutputShape) -> Self {
        let default_output = match shape {
            OutputShape::TwoClass => vec![1.0, 0.0],
            OutputShape::Single => vec![0.0],
        };
        Self {
            spec,
            shape,
            script: VecDeque::new(),
            default_output,
            calls: 0,
        }
    }

    pub fn with_default_output(mut self, output: Vec<f32>) -> Self {
        self.default_output = output;
        self
    }

    pub fn push_output(&mut self, output: Vec<f32>) {
        self.script.push_back(Ok(output));
    }

    pub fn push_failure(&mut self, message: &str) {
        self.script.push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl SequenceModel for StubSequenceModel {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_spec(&self) -> ModelInputSpec {
        self.spec
    }

    fn output_shape(&self) -> OutputShape {
        self.shape
    }

    fn predict(&mut self, frames: &[&NormalizedFrame]) -> Result<Vec<f32>, WatchError> {
        self.calls += 1;
        if frames.len() != self.spec.sequence_length {
            return Err(WatchError::ClassifierUnavailable(format!(
                "stub model expects {} frames, got {}",
                self.spec.sequence_length,
                frames.len()
            )));
        }
        match self.script.pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(WatchError::ClassifierUnavailable(message)),
            None => Ok(self.default_output.clone()),
        }
    }
}
