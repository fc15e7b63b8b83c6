pub mod motion;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use motion::{MotionClassifier, MotionStats};
pub use stub::StubSequenceModel;

#[cfg(feature = "backend-tract")]
pub use tract::TractSequenceModel;
