#![cfg(feature = "backend-tract")]

use std::path::Path;

use tract_onnx::prelude::*;

use crate::detect::backend::{ModelInputSpec, OutputShape, SequenceModel};
use crate::error::WatchError;
use crate::frame::NormalizedFrame;

fn unavailable(context: &str, err: impl std::fmt::Display) -> WatchError {
    WatchError::ClassifierUnavailable(format!("{}: {}", context, err))
}

/// Tract-based sequence classifier for ONNX models.
///
/// The model takes one batch of `[1, N, H, W, 3]` f32 frames in [0.0, 1.0]
/// and returns a probability vector. The output shape is checked once here,
/// at load time, never inferred per prediction.
pub struct TractSequenceModel {
    plan: TypedRunnableModel<TypedModel>,
    spec: ModelInputSpec,
    shape: OutputShape,
}

impl TractSequenceModel {
    /// Load an ONNX model from disk and prepare it for inference.
    ///
    /// `declared_shape` overrides the shape read from the model's output fact;
    /// without it, the model must declare a concrete output shape.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        spec: ModelInputSpec,
        declared_shape: Option<OutputShape>,
    ) -> Result<Self, WatchError> {
        let model_path = model_path.as_ref();
        let typed = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                unavailable(
                    &format!("failed to load ONNX model from {}", model_path.display()),
                    e,
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(
                        1,
                        spec.sequence_length,
                        spec.frame_height as usize,
                        spec.frame_width as usize,
                        3
                    ),
                ),
            )
            .map_err(|e| unavailable("failed to set input fact", e))?
            .into_optimized()
            .map_err(|e| unavailable("failed to optimize ONNX model", e))?;

        let model_shape = typed
            .output_fact(0)
            .map_err(|e| unavailable("model has no output", e))?
            .shape
            .as_concrete()
            .map(|dims| dims.to_vec());

        let shape = match (declared_shape, model_shape) {
            (Some(declared), Some(dims)) => {
                let inferred = OutputShape::from_dims(&dims)?;
                if inferred != declared {
                    return Err(WatchError::ClassifierUnavailable(format!(
                        "configured output {:?} but model declares {:?}",
                        declared, dims
                    )));
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(dims)) => OutputShape::from_dims(&dims)?,
            (None, None) => {
                return Err(WatchError::ClassifierUnavailable(
                    "model output shape is symbolic; set model.output in config".into(),
                ))
            }
        };

        let plan = typed
            .into_runnable()
            .map_err(|e| unavailable("failed to build runnable ONNX model", e))?;

        Ok(Self { plan, spec, shape })
    }

    fn build_input(&self, frames: &[&NormalizedFrame]) -> Result<Tensor, WatchError> {
        if frames.len() != self.spec.sequence_length {
            return Err(WatchError::ClassifierUnavailable(format!(
                "expected {} frames, received {}",
                self.spec.sequence_length,
                frames.len()
            )));
        }
        let (width, height) = (
            self.spec.frame_width as usize,
            self.spec.frame_height as usize,
        );
        for frame in frames {
            if frame.width() as usize != width || frame.height() as usize != height {
                return Err(WatchError::MalformedInput(format!(
                    "frame size {}x{} does not match model input {}x{}",
                    frame.width(),
                    frame.height(),
                    width,
                    height
                )));
            }
        }

        let input = tract_ndarray::Array5::from_shape_fn(
            (1, frames.len(), height, width, 3),
            |(_, t, y, x, c)| frames[t].pixels()[(y * width + x) * 3 + c],
        );
        Ok(input.into_tensor())
    }
}

impl SequenceModel for TractSequenceModel {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_spec(&self) -> ModelInputSpec {
        self.spec
    }

    fn output_shape(&self) -> OutputShape {
        self.shape
    }

    fn predict(&mut self, frames: &[&NormalizedFrame]) -> Result<Vec<f32>, WatchError> {
        let input = self.build_input(frames)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| unavailable("ONNX inference failed", e))?;
        let output = outputs
            .first()
            .ok_or_else(|| WatchError::ClassifierUnavailable("model produced no outputs".into()))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| unavailable("model output tensor was not f32", e))?;
        Ok(scores.iter().copied().collect())
    }
}
