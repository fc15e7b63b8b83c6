//! Window classification.
//!
//! Two strategies share one contract (`WindowClassifier`): the primary
//! sequence model, wrapped by `PrimaryClassifier`, and the motion-energy
//! fallback. `ClassifierDispatcher` picks one at startup and applies the
//! single probability cutoff to whichever one ran.

mod backend;
pub mod backends;
mod dispatcher;
mod primary;
mod result;

pub use backend::{ClassifierMode, ModelInputSpec, OutputShape, SequenceModel, WindowClassifier};
pub use backends::{MotionClassifier, MotionStats, StubSequenceModel};
pub use dispatcher::ClassifierDispatcher;
pub use primary::{load_primary_model, PrimaryClassifier};
pub use result::{ClassificationResult, Label, CALIBRATING_PROBABILITY};
