//! Frame ingestion sources.
//!
//! Every source produces `RawFrame` instances for the processing cycle.
//! Camera and video-file acquisition live outside this crate; the built-in
//! source is the synthetic cabin scene behind `stub://` URLs, used by the
//! demo binary and the tests.
//!
//! Sources MUST NOT:
//! - Store raw frames to disk
//! - Log raw frame content

mod synthetic;

use anyhow::{bail, Result};

use crate::config::SourceSettings;
use crate::frame::RawFrame;

pub use synthetic::{ScenePhase, SceneSchedule, SyntheticSource};

/// A producer of frames, polled once per cycle.
pub trait FrameSource: Send {
    fn connect(&mut self) -> Result<()>;

    fn next_frame(&mut self) -> Result<RawFrame>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Open the source named by `settings.url`.
///
/// `seed` makes the synthetic scene reproducible.
pub fn open_source(
    settings: &SourceSettings,
    schedule: SceneSchedule,
    seed: Option<u64>,
) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(
            settings.clone(),
            schedule,
            seed,
        )?));
    }
    bail!(
        "unsupported source url '{}': only stub:// sources are built in",
        settings.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> SourceSettings {
        SourceSettings {
            url: url.to_string(),
            width: 64,
            height: 48,
            target_fps: 15,
        }
    }

    #[test]
    fn stub_urls_open_synthetic_source() -> Result<()> {
        let mut source =
            open_source(&settings("stub://cabin"), SceneSchedule::default(), Some(1))?;
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(source.stats().frames_captured, 1);
        assert!(source.is_healthy());
        Ok(())
    }

    #[test]
    fn other_urls_are_rejected() {
        let rtsp = settings("rtsp://10.0.0.5/stream");
        assert!(open_source(&rtsp, SceneSchedule::default(), None).is_err());
    }
}
