use std::path::Path;

use crate::detect::backend::{
    ClassifierMode, ModelInputSpec, OutputShape, SequenceModel, WindowClassifier,
};
use crate::error::WatchError;
use crate::frame::NormalizedFrame;

/// Adapts a `SequenceModel` to the window classifier contract.
///
/// Construction checks that the model was built for the same sequence length
/// and frame size the window and normalizer use; a mismatch keeps the primary
/// path disabled.
pub struct PrimaryClassifier {
    model: Box<dyn SequenceModel>,
    spec: ModelInputSpec,
    shape: OutputShape,
}

impl std::fmt::Debug for PrimaryClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryClassifier")
            .field("model", &self.model.name())
            .field("spec", &self.spec)
            .field("shape", &self.shape)
            .finish()
    }
}

impl PrimaryClassifier {
    pub fn new(
        model: Box<dyn SequenceModel>,
        expected: ModelInputSpec,
    ) -> Result<Self, WatchError> {
        let spec = model.input_spec();
        if spec != expected {
            return Err(WatchError::ClassifierUnavailable(format!(
                "model {} expects {} frames of {}x{}, pipeline uses {} frames of {}x{}",
                model.name(),
                spec.sequence_length,
                spec.frame_width,
                spec.frame_height,
                expected.sequence_length,
                expected.frame_width,
                expected.frame_height
            )));
        }
        let shape = model.output_shape();
        Ok(Self { model, spec, shape })
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }
}

impl WindowClassifier for PrimaryClassifier {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Primary
    }

    fn min_frames(&self) -> usize {
        self.spec.sequence_length
    }

    fn input_spec(&self) -> Option<ModelInputSpec> {
        Some(self.spec)
    }

    fn event_probability(&mut self, frames: &[&NormalizedFrame]) -> Result<f32, WatchError> {
        let outputs = self.model.predict(frames)?;
        self.shape.event_probability(&outputs)
    }
}

/// Load the primary sequence model from `path`.
///
/// Any failure (missing file, backend not compiled in, load error, shape
/// mismatch) is reported as `ClassifierUnavailable`; the caller decides to
/// run in fallback mode.
pub fn load_primary_model(
    path: &Path,
    spec: ModelInputSpec,
    declared_shape: Option<OutputShape>,
) -> Result<Box<dyn SequenceModel>, WatchError> {
    if !path.exists() {
        return Err(WatchError::ClassifierUnavailable(format!(
            "model not found at {}",
            path.display()
        )));
    }

    #[cfg(feature = "backend-tract")]
    {
        let model =
            crate::detect::backends::TractSequenceModel::load(path, spec, declared_shape)?;
        log::info!(
            "sequence model loaded from {} ({} frames of {}x{}, {:?} output)",
            path.display(),
            spec.sequence_length,
            spec.frame_width,
            spec.frame_height,
            model.output_shape()
        );
        Ok(Box::new(model))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        let _ = (spec, declared_shape);
        Err(WatchError::ClassifierUnavailable(format!(
            "model {} present but the backend-tract feature is disabled",
            path.display()
        )))
    }
}
