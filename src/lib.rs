//! Passenger Watch
//!
//! Real-time, single-subject violence signalling for a vehicle cabin camera.
//!
//! # Architecture
//!
//! Each captured frame runs one synchronous cycle:
//!
//! 1. **Region selection**: the largest detector candidate in the rear of the frame.
//! 2. **Normalization**: crop, resize to the model frame size, scale to [0, 1].
//! 3. **Window**: append to a fixed-capacity ring of the most recent frames.
//! 4. **Classification**: primary sequence model when available, motion-energy
//!    fallback otherwise, one shared probability cutoff.
//! 5. **Alerting**: edge-triggered state machine, one durable record per
//!    `Normal → Active` transition.
//!
//! # Module Structure
//!
//! - `region`, `frame`, `window`: per-frame inputs and the sliding window
//! - `detect`: classifier strategies and the dispatcher
//! - `alert`: alert state machine and durable alert log
//! - `pipeline`: the cycle itself (`Pipeline`, `WatchSession`)
//! - `ingest`, `api`, `ui`, `config`: daemon plumbing

pub mod alert;
pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod region;
pub mod ui;
pub mod window;

pub use alert::{AlertRecord, AlertStateMachine, AlertStats, AlertStatus, FileAlertLog};
pub use config::WatchConfig;
pub use detect::{ClassificationResult, ClassifierDispatcher, ClassifierMode, Label};
pub use error::WatchError;
pub use frame::{FrameNormalizer, NormalizedFrame, RawFrame, RegionCrop};
pub use pipeline::{CycleReport, Pipeline, PipelineConfig, WatchSession};
pub use region::{select_region, CandidateRegion, LumaBlobDetector, RegionDetector};
pub use window::FrameWindow;
