use crate::detect::backend::{ClassifierMode, ModelInputSpec, SequenceModel, WindowClassifier};
use crate::detect::backends::MotionClassifier;
use crate::detect::primary::PrimaryClassifier;
use crate::detect::result::ClassificationResult;
use crate::error::WatchError;
use crate::window::FrameWindow;

/// Routes each cycle's window to the strategy chosen at startup.
///
/// The primary strategy is used only when a model was reported available and
/// matches the pipeline's input contract. A prediction failure swaps in the
/// motion fallback for the rest of the run; the primary path is never retried.
pub struct ClassifierDispatcher {
    active: Box<dyn WindowClassifier>,
    threshold: f32,
    degraded_reason: Option<String>,
}

impl ClassifierDispatcher {
    /// Dispatcher that always uses the motion fallback.
    pub fn fallback_only(threshold: f32) -> Self {
        Self {
            active: Box::new(MotionClassifier::new()),
            threshold,
            degraded_reason: None,
        }
    }

    /// Dispatcher with a primary classifier already validated.
    pub fn with_primary(primary: PrimaryClassifier, threshold: f32) -> Self {
        Self {
            active: Box::new(primary),
            threshold,
            degraded_reason: None,
        }
    }

    /// Select the strategy from the startup availability signal.
    ///
    /// `model` is `None` when the primary classifier failed to initialize.
    pub fn from_availability(
        model: Option<Box<dyn SequenceModel>>,
        expected: ModelInputSpec,
        threshold: f32,
    ) -> Self {
        let Some(model) = model else {
            log::info!("sequence model unavailable; using motion fallback classifier");
            return Self::fallback_only(threshold);
        };
        match PrimaryClassifier::new(model, expected) {
            Ok(primary) => {
                log::info!(
                    "primary sequence classifier enabled (model={}, {} frames)",
                    primary.model_name(),
                    expected.sequence_length
                );
                Self::with_primary(primary, threshold)
            }
            Err(err) => {
                log::warn!("{}; using motion fallback classifier", err);
                Self::fallback_only(threshold)
            }
        }
    }

    pub fn mode(&self) -> ClassifierMode {
        self.active.mode()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.active.name()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Frames the active strategy needs before it stops calibrating.
    pub fn min_frames(&self) -> usize {
        self.active.min_frames()
    }

    /// Input contract of the active primary model; `None` in fallback mode.
    pub fn input_spec(&self) -> Option<ModelInputSpec> {
        self.active.input_spec()
    }

    /// Keep the primary strategy only if its model matches `expected`.
    ///
    /// Returns `true` when the primary path was disabled. The swap happens
    /// before any frame is classified, so it is not recorded as a degradation.
    pub fn require_input_spec(&mut self, expected: ModelInputSpec) -> bool {
        match self.active.input_spec() {
            Some(spec) if spec != expected => {
                log::warn!(
                    "model {} expects {} frames of {}x{}, pipeline uses {} frames of {}x{}; \
                     using motion fallback classifier",
                    self.active.name(),
                    spec.sequence_length,
                    spec.frame_width,
                    spec.frame_height,
                    expected.sequence_length,
                    expected.frame_width,
                    expected.frame_height
                );
                self.active = Box::new(MotionClassifier::new());
                true
            }
            _ => false,
        }
    }

    /// Why the primary path was abandoned mid-run, if it was.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded_reason.as_deref()
    }

    pub fn classify(&mut self, window: &FrameWindow) -> Result<ClassificationResult, WatchError> {
        if window.len() < self.active.min_frames() {
            return Ok(ClassificationResult::calibrating());
        }
        let frames = window.snapshot();
        match self.active.event_probability(&frames) {
            Ok(probability) => Ok(ClassificationResult::from_probability(
                probability,
                self.threshold,
            )),
            Err(err @ WatchError::ClassifierUnavailable(_))
                if self.active.mode() == ClassifierMode::Primary =>
            {
                self.degrade(err.to_string());
                self.classify(window)
            }
            Err(err) => Err(err),
        }
    }

    fn degrade(&mut self, reason: String) {
        log::warn!(
            "primary classifier {} failed ({}); \
             switching to motion fallback for the rest of the run",
            self.active.name(),
            reason
        );
        self.active = Box::new(MotionClassifier::new());
        self.degraded_reason = Some(reason);
    }
}
