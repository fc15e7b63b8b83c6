//! Region-of-interest selection.
//!
//! Candidate regions come from an external person detector. Only candidates
//! whose bottom edge reaches into the rear part of the cabin (the lower 40% of
//! the frame by default) are eligible; the largest eligible candidate wins.

use anyhow::Result;

use crate::frame::RawFrame;

/// Fraction of frame height a region's bottom edge must exceed to be eligible.
pub const DEFAULT_REAR_REGION_FRACTION: f64 = 0.6;

/// Axis-aligned candidate box in pixel coordinates plus detector confidence.
///
/// Detector boxes may extend past the frame edges, so `x`/`y` are signed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl CandidateRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// y + height, widened so large boxes cannot overflow.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// True when the bottom edge lies strictly below `fraction * frame_height`.
    pub fn is_rear(&self, frame_height: u32, fraction: f64) -> bool {
        self.bottom() as f64 > frame_height as f64 * fraction
    }
}

/// Pick the region of interest for this cycle.
///
/// Returns `None` when no candidate is eligible; the caller must then skip
/// buffering for the frame. Ties on area keep the first candidate.
pub fn select_region(
    candidates: &[CandidateRegion],
    frame_height: u32,
    rear_fraction: f64,
) -> Option<CandidateRegion> {
    let mut best: Option<CandidateRegion> = None;
    for candidate in candidates
        .iter()
        .filter(|c| c.is_rear(frame_height, rear_fraction))
    {
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

/// External person detector seam.
///
/// Implementations run once per frame and return every candidate they find.
/// The selection policy above is applied by the pipeline, not the detector.
pub trait RegionDetector: Send {
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<CandidateRegion>>;
}

/// Stand-in detector: bounding box of pixels brighter than a luma cutoff.
///
/// Good enough for synthetic scenes where the passenger is the only bright
/// object on a dark background. Confidence is the bright fraction of the box,
/// and boxes below `confidence_threshold` are discarded.
pub struct LumaBlobDetector {
    luma_cutoff: u8,
    confidence_threshold: f32,
}

impl LumaBlobDetector {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            luma_cutoff: 64,
            confidence_threshold,
        }
    }
}

impl RegionDetector for LumaBlobDetector {
    fn name(&self) -> &'static str {
        "luma_blob"
    }

    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<CandidateRegion>> {
        let width = frame.width as usize;
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut bright = 0u64;

        for (idx, px) in frame.pixels().chunks_exact(3).enumerate() {
            if crate::frame::luma(px[0], px[1], px[2]) > self.luma_cutoff {
                let (x, y) = (idx % width, idx / width);
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                bright += 1;
            }
        }

        if bright == 0 {
            return Ok(Vec::new());
        }

        let box_w = (max_x - min_x + 1) as u32;
        let box_h = (max_y - min_y + 1) as u32;
        let confidence = bright as f32 / (box_w as u64 * box_h as u64) as f32;
        if confidence < self.confidence_threshold {
            return Ok(Vec::new());
        }

        Ok(vec![CandidateRegion::new(
            min_x as i32,
            min_y as i32,
            box_w,
            box_h,
            confidence,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_ending_on_threshold_is_rejected() {
        let candidates = [CandidateRegion::new(10, 10, 50, 50, 0.9)];
        assert_eq!(select_region(&candidates, 100, 0.6), None);
    }

    #[test]
    fn region_below_threshold_is_accepted() {
        let candidates = [CandidateRegion::new(10, 70, 50, 50, 0.9)];
        assert_eq!(select_region(&candidates, 100, 0.6), Some(candidates[0]));
    }

    #[test]
    fn largest_rear_region_wins_and_ties_keep_first() {
        let candidates = [
            CandidateRegion::new(0, 0, 100, 100, 0.99),
            CandidateRegion::new(0, 50, 20, 20, 0.8),
            CandidateRegion::new(30, 50, 10, 40, 0.7),
            CandidateRegion::new(60, 50, 40, 10, 0.6),
            CandidateRegion::new(5, 40, 25, 40, 0.5),
        ];
        // 100x100 at y=0 has bottom 100 > 60 and is the largest.
        assert_eq!(select_region(&candidates, 100, 0.6), Some(candidates[0]));

        let rear_only = &candidates[1..];
        // 25x40 = 1000 beats the three 400-area boxes.
        assert_eq!(select_region(rear_only, 100, 0.6), Some(rear_only[3]));

        let tied = &candidates[1..4];
        assert_eq!(select_region(tied, 100, 0.6), Some(tied[0]));
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert_eq!(select_region(&[], 480, DEFAULT_REAR_REGION_FRACTION), None);
    }

    #[test]
    fn selection_never_returns_front_region() {
        for y in -20..120 {
            for h in [0u32, 1, 10, 59, 60, 61] {
                let candidates = [CandidateRegion::new(0, y, 10, h, 0.5)];
                if let Some(region) = select_region(&candidates, 100, 0.6) {
                    assert!(region.bottom() as f64 > 60.0);
                }
            }
        }
    }

    #[test]
    fn luma_blob_detector_boxes_bright_pixels() -> Result<()> {
        let (w, h) = (8u32, 6u32);
        let mut pixels = vec![0u8; (w * h * 3) as usize];
        for y in 3..5 {
            for x in 2..6 {
                let idx = ((y * w + x) * 3) as usize;
                pixels[idx..idx + 3].copy_from_slice(&[200, 200, 200]);
            }
        }
        let frame = RawFrame::new(pixels, w, h)?;
        let mut detector = LumaBlobDetector::new(0.5);
        let regions = detector.detect(&frame)?;
        assert_eq!(regions, vec![CandidateRegion::new(2, 3, 4, 2, 1.0)]);
        Ok(())
    }

    #[test]
    fn luma_blob_detector_honours_confidence_threshold() -> Result<()> {
        let (w, h) = (4u32, 4u32);
        let mut pixels = vec![0u8; (w * h * 3) as usize];
        // Two opposite corners: the box covers the whole frame, 2/16 bright.
        pixels[0..3].copy_from_slice(&[255, 255, 255]);
        let last = pixels.len() - 3;
        pixels[last..].copy_from_slice(&[255, 255, 255]);
        let frame = RawFrame::new(pixels, w, h)?;

        assert!(LumaBlobDetector::new(0.5).detect(&frame)?.is_empty());
        assert_eq!(LumaBlobDetector::new(0.1).detect(&frame)?.len(), 1);
        Ok(())
    }
}
