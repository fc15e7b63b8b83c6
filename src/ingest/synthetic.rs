//! Synthetic cabin scene for `stub://` URLs.
//!
//! A dark cabin with one bright passenger blob seated in the rear of the
//! frame. The scene cycles through a calm phase (static texture, no motion)
//! and an agitated phase (fresh coarse random texture and positional jitter
//! every frame), so both alert transitions can be driven without a camera.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SourceSettings, MAX_SOURCE_DIM};
use crate::frame::{rgb_len, RawFrame};
use crate::ingest::{FrameSource, SourceStats};

const BACKGROUND_LEVEL: u8 = 24;
const MIN_SCENE_DIM: u32 = 8;
/// Both levels stay above the blob detector's luma cutoff.
const AGITATED_LEVELS: [u8; 2] = [80, 255];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenePhase {
    Calm,
    Agitated,
}

/// Length of each phase, repeated for as long as frames are pulled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneSchedule {
    pub calm_frames: u64,
    pub agitated_frames: u64,
}

impl Default for SceneSchedule {
    fn default() -> Self {
        Self {
            calm_frames: 45,
            agitated_frames: 30,
        }
    }
}

impl SceneSchedule {
    /// Phase of the zero-based frame `index`. Calm comes first.
    pub fn phase_at(&self, index: u64) -> ScenePhase {
        let period = self.calm_frames + self.agitated_frames;
        if self.agitated_frames == 0 || period == 0 {
            return ScenePhase::Calm;
        }
        if index % period < self.calm_frames {
            ScenePhase::Calm
        } else {
            ScenePhase::Agitated
        }
    }
}

pub struct SyntheticSource {
    settings: SourceSettings,
    schedule: SceneSchedule,
    rng: StdRng,
    frame_count: u64,
    frame_len: usize,
    blob: BlobGeometry,
}

#[derive(Clone, Copy, Debug)]
struct BlobGeometry {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    jitter: u32,
    /// Side of the square cells of the agitated texture.
    cell: u32,
}

impl SyntheticSource {
    pub fn new(
        settings: SourceSettings,
        schedule: SceneSchedule,
        seed: Option<u64>,
    ) -> Result<Self> {
        let dims = MIN_SCENE_DIM..=MAX_SOURCE_DIM;
        if !dims.contains(&settings.width) || !dims.contains(&settings.height) {
            bail!(
                "synthetic scene needs {}x{} to {}x{} pixels, got {}x{}",
                MIN_SCENE_DIM,
                MIN_SCENE_DIM,
                MAX_SOURCE_DIM,
                MAX_SOURCE_DIM,
                settings.width,
                settings.height
            );
        }
        let frame_len = rgb_len(settings.width, settings.height)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let blob = BlobGeometry::for_frame(settings.width, settings.height);
        Ok(Self {
            settings,
            schedule,
            rng,
            frame_count: 0,
            frame_len,
            blob,
        })
    }

    /// Phase the next frame will be drawn in.
    pub fn current_phase(&self) -> ScenePhase {
        self.schedule.phase_at(self.frame_count)
    }

    fn render(&mut self, phase: ScenePhase) -> Vec<u8> {
        let width = self.settings.width as usize;
        let mut pixels = vec![BACKGROUND_LEVEL; self.frame_len];

        let (x0, y0) = match phase {
            ScenePhase::Calm => (self.blob.x, self.blob.y),
            ScenePhase::Agitated => self.jittered_origin(),
        };
        let cell = self.blob.cell;
        let cells_x = self.blob.width.div_ceil(cell);
        let cells = match phase {
            ScenePhase::Calm => Vec::new(),
            ScenePhase::Agitated => (0..cells_x * self.blob.height.div_ceil(cell))
                .map(|_| AGITATED_LEVELS[self.rng.gen_range(0..AGITATED_LEVELS.len())])
                .collect(),
        };
        for by in 0..self.blob.height {
            for bx in 0..self.blob.width {
                let level = match phase {
                    ScenePhase::Calm => 150 + ((bx * 7 + by * 13) % 64) as u8,
                    ScenePhase::Agitated => cells[((by / cell) * cells_x + bx / cell) as usize],
                };
                let idx = ((y0 + by) as usize * width + (x0 + bx) as usize) * 3;
                pixels[idx..idx + 3].copy_from_slice(&[level; 3]);
            }
        }
        pixels
    }

    fn jittered_origin(&mut self) -> (u32, u32) {
        let j = self.blob.jitter as i64;
        let dx = self.rng.gen_range(-j..=j);
        let dy = self.rng.gen_range(-j..=j);
        let max_x = (self.settings.width - self.blob.width) as i64;
        let max_y = (self.settings.height - self.blob.height) as i64;
        let x = (self.blob.x as i64 + dx).clamp(0, max_x);
        let y = (self.blob.y as i64 + dy).clamp(0, max_y);
        (x as u32, y as u32)
    }
}

impl BlobGeometry {
    /// Centered horizontally, bottom edge at 95% of the frame height.
    fn for_frame(width: u32, height: u32) -> Self {
        let blob_w = (width * 3 / 10).max(2);
        let blob_h = (height * 2 / 5).max(2);
        let x = (width - blob_w) / 2;
        let y = height - blob_h - height / 20;
        Self {
            x,
            y,
            width: blob_w,
            height: blob_h,
            jitter: (width / 40).max(1),
            cell: (blob_w / 24).max(1),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{} @ {} fps)",
            self.settings.url,
            self.settings.width,
            self.settings.height,
            self.settings.target_fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame> {
        let phase = self.current_phase();
        let pixels = self.render(phase);
        self.frame_count += 1;
        Ok(RawFrame::new(pixels, self.settings.width, self.settings.height)?)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}
