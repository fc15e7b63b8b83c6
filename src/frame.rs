//! Frame types for the classification path.
//!
//! - `RawFrame`: one captured RGB24 frame, owned by the cycle that received it.
//! - `RegionCrop`: pixels of the selected region, clamped to frame bounds.
//! - `NormalizedFrame`: fixed-size, [0.0, 1.0] frame held by the window.
//!
//! A `NormalizedFrame` has no mutable accessors; once built it only moves
//! into a window slot and is dropped on eviction.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};

use crate::error::WatchError;
use crate::region::CandidateRegion;

/// ITU-R BT.601 luma, the same weights the grayscale conversion uses.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299_f32 * r as f32 + 0.587_f32 * g as f32 + 0.114_f32 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Byte length of an RGB24 buffer, or `MalformedInput` on overflow.
pub fn rgb_len(width: u32, height: u32) -> Result<usize, WatchError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| WatchError::MalformedInput("frame dimensions overflow".into()))
}

// ----------------------------------------------------------------------------
// RawFrame
// ----------------------------------------------------------------------------

/// Captured RGB24 frame, row-major, 3 bytes per pixel.
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, WatchError> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(WatchError::MalformedInput(format!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy out the pixels under `region`, clamped to the frame.
    ///
    /// Fails with `MalformedInput` when nothing of the region overlaps the frame.
    pub fn crop(&self, region: &CandidateRegion) -> Result<RegionCrop, WatchError> {
        let clamp_x = |v: i64| v.clamp(0, self.width as i64) as usize;
        let clamp_y = |v: i64| v.clamp(0, self.height as i64) as usize;
        let x0 = clamp_x(region.x as i64);
        let x1 = clamp_x(region.x as i64 + region.width as i64);
        let y0 = clamp_y(region.y as i64);
        let y1 = clamp_y(region.bottom());

        if x1 <= x0 || y1 <= y0 {
            return Err(WatchError::MalformedInput(format!(
                "region {}x{} at ({}, {}) has no area inside {}x{} frame",
                region.width, region.height, region.x, region.y, self.width, self.height
            )));
        }

        let row_bytes = (x1 - x0) * 3;
        let stride = self.width as usize * 3;
        let mut data = Vec::with_capacity(row_bytes * (y1 - y0));
        for row in y0..y1 {
            let start = row * stride + x0 * 3;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        RegionCrop::new(data, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

// ----------------------------------------------------------------------------
// RegionCrop
// ----------------------------------------------------------------------------

/// RGB24 pixels of one region of interest, arbitrary size.
#[derive(Clone, Debug)]
pub struct RegionCrop {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl RegionCrop {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, WatchError> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(WatchError::MalformedInput(format!(
                "crop length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// ----------------------------------------------------------------------------
// NormalizedFrame
// ----------------------------------------------------------------------------

/// Fixed-size three-channel frame with values in [0.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedFrame {
    width: u32,
    height: u32,
    data: Box<[f32]>,
}

impl NormalizedFrame {
    /// Build from already-normalized values (row-major, RGB interleaved).
    pub fn from_pixels(width: u32, height: u32, data: Vec<f32>) -> Result<Self, WatchError> {
        let expected = rgb_len(width, height)?;
        if expected == 0 {
            return Err(WatchError::MalformedInput(
                "normalized frame has zero area".into(),
            ));
        }
        if data.len() != expected {
            return Err(WatchError::MalformedInput(format!(
                "normalized frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        if data.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(WatchError::MalformedInput(
                "normalized values must lie in [0.0, 1.0]".into(),
            ));
        }
        Ok(Self {
            width,
            height,
            data: data.into_boxed_slice(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    /// Back to 8-bit intensities.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// 8-bit grayscale plane, one byte per pixel.
    pub fn to_gray8(&self) -> Vec<u8> {
        self.to_rgb8()
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }
}

// ----------------------------------------------------------------------------
// FrameNormalizer
// ----------------------------------------------------------------------------

/// Resizes crops to the model's frame size and rescales to [0.0, 1.0].
#[derive(Clone, Copy, Debug)]
pub struct FrameNormalizer {
    width: u32,
    height: u32,
}

impl FrameNormalizer {
    pub fn new(width: u32, height: u32) -> Result<Self, WatchError> {
        if width == 0 || height == 0 {
            return Err(WatchError::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn normalize(&self, crop: &RegionCrop) -> Result<NormalizedFrame, WatchError> {
        if crop.is_empty() {
            return Err(WatchError::MalformedInput("region crop has zero area".into()));
        }
        let source: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(crop.width, crop.height, crop.data.as_slice())
                .ok_or_else(|| WatchError::MalformedInput("corrupt region crop".into()))?;

        let resized = if crop.width == self.width && crop.height == self.height {
            source.as_raw().to_vec()
        } else {
            imageops::resize(&source, self.width, self.height, FilterType::CatmullRom).into_raw()
        };

        let data: Vec<f32> = resized.iter().map(|&v| v as f32 / 255.0).collect();
        Ok(NormalizedFrame {
            width: self.width,
            height: self.height,
            data: data.into_boxed_slice(),
        })
    }
}
