//! One synchronous processing cycle per captured frame:
//! region selection, crop and normalization, window append, classification,
//! then the alert state machine.
//!
//! The pipeline owns the window and the dispatcher. Alert state is owned by
//! the caller and passed in, so it stays single-writer even when stats are
//! published elsewhere.

use serde::Serialize;

use crate::alert::{AlertStateMachine, AlertStats, AlertTransition};
use crate::api::{StatusBoard, StatusSnapshot};
use crate::detect::{ClassificationResult, ClassifierDispatcher, ClassifierMode, ModelInputSpec};
use crate::error::WatchError;
use crate::frame::{FrameNormalizer, RawFrame};
use crate::region::{select_region, CandidateRegion, RegionDetector};
use crate::window::FrameWindow;

/// Settings fixed for the lifetime of a pipeline.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    pub sequence_length: usize,
    pub frame_size: (u32, u32),
    pub rear_region_fraction: f64,
}

impl From<&crate::config::WatchConfig> for PipelineConfig {
    fn from(cfg: &crate::config::WatchConfig) -> Self {
        Self {
            sequence_length: cfg.sequence_length,
            frame_size: cfg.frame_size,
            rear_region_fraction: cfg.rear_region_fraction,
        }
    }
}

impl PipelineConfig {
    /// Input contract a primary model must match to be used by this pipeline.
    pub fn input_spec(&self) -> ModelInputSpec {
        ModelInputSpec {
            sequence_length: self.sequence_length,
            frame_width: self.frame_size.0,
            frame_height: self.frame_size.1,
        }
    }
}

/// Why a cycle contributed no frame to the window.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    NoEligibleRegion,
    MalformedRegion(String),
}

/// Outcome of one cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub candidates: usize,
    pub region: Option<CandidateRegion>,
    pub skipped: Option<SkipReason>,
    /// Fresh classification from this cycle, if one ran.
    pub classification: Option<ClassificationResult>,
    pub transition: AlertTransition,
}

/// Latest pipeline status for display and polling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub frames_processed: u64,
    pub frames_buffered: usize,
    pub last: ClassificationResult,
    pub classifier: ClassifierMode,
}

pub struct Pipeline {
    window: FrameWindow,
    normalizer: FrameNormalizer,
    dispatcher: ClassifierDispatcher,
    rear_region_fraction: f64,
    last: ClassificationResult,
    frames_processed: u64,
}

impl Pipeline {
    /// A primary model built for another window length or frame size is
    /// replaced by the motion fallback before the first cycle.
    pub fn new(
        config: PipelineConfig,
        mut dispatcher: ClassifierDispatcher,
    ) -> Result<Self, WatchError> {
        dispatcher.require_input_spec(config.input_spec());
        let window = FrameWindow::new(config.sequence_length)?;
        let normalizer = FrameNormalizer::new(config.frame_size.0, config.frame_size.1)?;
        Ok(Self {
            window,
            normalizer,
            dispatcher,
            rear_region_fraction: config.rear_region_fraction,
            last: ClassificationResult::calibrating(),
            frames_processed: 0,
        })
    }

    pub fn window(&self) -> &FrameWindow {
        &self.window
    }

    pub fn dispatcher(&self) -> &ClassifierDispatcher {
        &self.dispatcher
    }

    /// Most recent classification; `Calibrating` until the first one runs.
    pub fn last_classification(&self) -> ClassificationResult {
        self.last
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            frames_processed: self.frames_processed,
            frames_buffered: self.window.len(),
            last: self.last,
            classifier: self.dispatcher.mode(),
        }
    }

    /// Run one full cycle for `frame` and its detector candidates.
    ///
    /// Skipped frames (no eligible region, malformed crop) leave the window
    /// and the alert state untouched. Only a fatal error is returned.
    pub fn process_cycle(
        &mut self,
        frame: &RawFrame,
        candidates: &[CandidateRegion],
        alerts: &mut AlertStateMachine,
    ) -> Result<CycleReport, WatchError> {
        self.frames_processed += 1;
        let mut report = CycleReport {
            candidates: candidates.len(),
            region: None,
            skipped: None,
            classification: None,
            transition: AlertTransition::Unchanged,
        };

        let Some(region) = select_region(candidates, frame.height, self.rear_region_fraction)
        else {
            log::debug!("no rear region among {} candidates", candidates.len());
            report.skipped = Some(SkipReason::NoEligibleRegion);
            return Ok(report);
        };
        report.region = Some(region);

        let normalized = match frame
            .crop(&region)
            .and_then(|crop| self.normalizer.normalize(&crop))
        {
            Ok(normalized) => normalized,
            Err(WatchError::MalformedInput(reason)) => {
                log::debug!("skipping frame: {}", reason);
                report.skipped = Some(SkipReason::MalformedRegion(reason));
                return Ok(report);
            }
            Err(err) => return Err(err),
        };
        self.window.append(normalized);

        let result = match self.dispatcher.classify(&self.window) {
            Ok(result) => result,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::warn!("classification skipped: {}", err);
                return Ok(report);
            }
        };
        self.last = result;
        report.classification = Some(result);
        report.transition = alerts.observe(&result);
        Ok(report)
    }
}

/// Detector, pipeline and alert state driven together, one frame at a time.
///
/// Every step publishes a fresh `StatusSnapshot` to the board.
pub struct WatchSession {
    detector: Box<dyn RegionDetector>,
    pipeline: Pipeline,
    alerts: AlertStateMachine,
    board: StatusBoard,
    frames_classified: u64,
}

impl WatchSession {
    pub fn new(
        detector: Box<dyn RegionDetector>,
        pipeline: Pipeline,
        alerts: AlertStateMachine,
        board: StatusBoard,
    ) -> Self {
        Self {
            detector,
            pipeline,
            alerts,
            board,
            frames_classified: 0,
        }
    }

    pub fn step(&mut self, frame: &RawFrame) -> anyhow::Result<CycleReport> {
        let candidates = match self.detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::warn!("{} detector failed: {}", self.detector.name(), err);
                Vec::new()
            }
        };
        let report = self
            .pipeline
            .process_cycle(frame, &candidates, &mut self.alerts)?;
        if report
            .classification
            .is_some_and(|result| result.label != crate::detect::Label::Calibrating)
        {
            self.frames_classified += 1;
        }
        self.board.publish(StatusSnapshot::new(
            self.alerts.stats(),
            self.pipeline.status(),
            report.candidates,
        ));
        Ok(report)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn alert_stats(&self) -> AlertStats {
        self.alerts.stats()
    }

    pub fn alert_log_failures(&self) -> u64 {
        self.alerts.log_failures()
    }

    /// Cycles that produced a non-calibrating classification.
    pub fn frames_classified(&self) -> u64 {
        self.frames_classified
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }
}
