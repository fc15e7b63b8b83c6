use crate::detect::backend::{ClassifierMode, WindowClassifier};
use crate::error::WatchError;
use crate::frame::NormalizedFrame;

const PROBABILITY_FLOOR: f32 = 0.1;
const PROBABILITY_CEILING: f32 = 0.95;

/// Summary of inter-frame motion across a window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionStats {
    pub avg_motion: f64,
    pub max_motion: f64,
    /// Population variance; zero for a single value.
    pub motion_variance: f64,
}

impl MotionStats {
    /// `None` when there are no motion values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let avg_motion = values.iter().sum::<f64>() / n;
        let max_motion = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let motion_variance = if values.len() > 1 {
            values.iter().map(|v| (v - avg_motion).powi(2)).sum::<f64>() / n
        } else {
            0.0
        };
        Some(Self {
            avg_motion,
            max_motion,
            motion_variance,
        })
    }

    /// Weighted blend of sustained, peak and erratic motion, clamped to [0.1, 0.95].
    pub fn probability(&self) -> f32 {
        let blend = (self.avg_motion / 30.0) * 0.4
            + (self.max_motion / 60.0) * 0.3
            + (self.motion_variance / 100.0) * 0.3;
        if blend.is_nan() {
            return PROBABILITY_FLOOR;
        }
        (blend as f32).clamp(PROBABILITY_FLOOR, PROBABILITY_CEILING)
    }
}

/// Mean absolute grayscale difference between two equally sized planes.
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    total as f64 / a.len() as f64
}

/// Deterministic motion-energy classifier used when no sequence model is available.
#[derive(Default)]
pub struct MotionClassifier;

impl MotionClassifier {
    pub fn new() -> Self {
        Self
    }

    /// One motion value per adjacent pair of frames.
    pub fn motion_values(frames: &[&NormalizedFrame]) -> Result<Vec<f64>, WatchError> {
        let mut values = Vec::with_capacity(frames.len().saturating_sub(1));
        let mut previous: Option<(&NormalizedFrame, Vec<u8>)> = None;
        for &frame in frames {
            let gray = frame.to_gray8();
            if let Some((prev_frame, prev_gray)) = &previous {
                if (prev_frame.width(), prev_frame.height()) != (frame.width(), frame.height()) {
                    return Err(WatchError::MalformedInput(format!(
                        "window mixes frame sizes {}x{} and {}x{}",
                        prev_frame.width(),
                        prev_frame.height(),
                        frame.width(),
                        frame.height()
                    )));
                }
                values.push(mean_abs_diff(prev_gray, &gray));
            }
            previous = Some((frame, gray));
        }
        Ok(values)
    }
}

impl WindowClassifier for MotionClassifier {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Fallback
    }

    fn min_frames(&self) -> usize {
        2
    }

    fn event_probability(&mut self, frames: &[&NormalizedFrame]) -> Result<f32, WatchError> {
        let values = Self::motion_values(frames)?;
        Ok(MotionStats::from_values(&values)
            .map(|stats| stats.probability())
            .unwrap_or(PROBABILITY_FLOOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn gray_frame(level: u8) -> NormalizedFrame {
        let v = level as f32 / 255.0;
        NormalizedFrame::from_pixels(4, 4, vec![v; 48]).expect("valid frame")
    }

    #[test]
    fn identical_frames_clamp_to_floor() -> Result<()> {
        let a = gray_frame(120);
        let b = gray_frame(120);
        let mut classifier = MotionClassifier::new();
        assert_eq!(classifier.event_probability(&[&a, &b])?, 0.1);
        Ok(())
    }

    #[test]
    fn stats_follow_population_variance() {
        let stats = MotionStats::from_values(&[10.0, 20.0, 30.0]).expect("stats");
        assert_eq!(stats.avg_motion, 20.0);
        assert_eq!(stats.max_motion, 30.0);
        assert!((stats.motion_variance - 200.0 / 3.0).abs() < 1e-9);

        let single = MotionStats::from_values(&[42.0]).expect("stats");
        assert_eq!(single.motion_variance, 0.0);
        assert!(MotionStats::from_values(&[]).is_none());
    }

    #[test]
    fn blend_weights_match_formula() {
        // avg 15 -> 0.2, max 30 -> 0.15, variance 0 -> 0.0
        let stats = MotionStats {
            avg_motion: 15.0,
            max_motion: 30.0,
            motion_variance: 0.0,
        };
        assert!((stats.probability() - 0.35).abs() < 1e-6);
    }

    #[test]
    fn probability_stays_in_bounds() {
        for avg in [0.0, 1.0, 12.5, 80.0, 255.0, 1e9] {
            for max in [0.0, 60.0, 255.0, 1e12] {
                for var in [0.0, 50.0, 1e6, f64::MAX] {
                    let p = MotionStats {
                        avg_motion: avg,
                        max_motion: max,
                        motion_variance: var,
                    }
                    .probability();
                    assert!((0.1..=0.95).contains(&p), "p={p}");
                }
            }
        }
    }

    #[test]
    fn strong_motion_saturates() -> Result<()> {
        let frames = [gray_frame(0), gray_frame(255), gray_frame(0)];
        let refs: Vec<&NormalizedFrame> = frames.iter().collect();
        let values = MotionClassifier::motion_values(&refs)?;
        assert_eq!(values, vec![255.0, 255.0]);
        assert_eq!(MotionClassifier::new().event_probability(&refs)?, 0.95);
        Ok(())
    }

    #[test]
    fn mixed_sizes_are_malformed() {
        let small = NormalizedFrame::from_pixels(1, 1, vec![0.0; 3]).expect("valid frame");
        let big = gray_frame(10);
        assert!(matches!(
            MotionClassifier::motion_values(&[&small, &big]),
            Err(WatchError::MalformedInput(_))
        ));
    }
}
