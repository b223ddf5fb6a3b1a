//! Per-frame quality scoring: brightness, sharpness and motion.
//!
//! Scoring is stateless. The caller supplies the metric plane of the
//! previously decoded candidate for the motion check; the scorer never keeps
//! frames between calls.

use crate::config::QualityConfig;
use crate::media::{match_dimensions, metric_luma};

use image::{GrayImage, RgbImage};
use serde::Serialize;
use std::fmt;

/// Which check rejected a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    Brightness,
    Sharpness,
    Motion,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectReason::Brightness => "brightness",
            RejectReason::Sharpness => "sharpness",
            RejectReason::Motion => "motion",
        };
        f.write_str(name)
    }
}

/// Metrics computed for one candidate.
///
/// Checks short-circuit, so metrics after the failing one stay `None`.
/// `motion` is also `None` for the first candidate of a video and when
/// motion detection is off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    /// Mean luma, 0-255
    pub brightness: f64,
    /// Variance of the 3x3 Laplacian response
    pub sharpness: Option<f64>,
    /// Sum of absolute luma differences to the previous candidate
    pub motion: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityVerdict {
    pub score: QualityScore,
    pub rejection: Option<RejectReason>,
}

impl QualityVerdict {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Applies the brightness, sharpness and motion thresholds, in that order.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Luma plane the metrics are computed on (downscaled when fast metrics are on).
    pub fn prepare(&self, frame: &RgbImage) -> GrayImage {
        metric_luma(frame, self.config.fast_metrics, self.config.metric_max_dim)
    }

    /// Scores a prepared metric plane against the previous candidate's plane.
    pub fn score(&self, current: &GrayImage, previous: Option<&GrayImage>) -> QualityVerdict {
        let enforce = self.config.enabled;

        let brightness = mean_brightness(current);
        let mut score = QualityScore {
            brightness,
            sharpness: None,
            motion: None,
        };
        if enforce
            && (brightness < self.config.min_brightness || brightness > self.config.max_brightness)
        {
            return reject(score, RejectReason::Brightness);
        }

        let sharpness = laplacian_variance(current);
        score.sharpness = Some(sharpness);
        if enforce && sharpness < self.config.min_sharpness {
            return reject(score, RejectReason::Sharpness);
        }

        if self.config.detect_motion {
            if let Some(previous) = previous {
                let motion = motion_energy(current, previous);
                score.motion = Some(motion);
                if enforce && motion < self.config.min_motion {
                    return reject(score, RejectReason::Motion);
                }
            }
        }

        QualityVerdict {
            score,
            rejection: None,
        }
    }

    /// Convenience wrapper: prepares `frame` and scores it.
    pub fn score_frame(&self, frame: &RgbImage, previous: Option<&GrayImage>) -> (QualityVerdict, GrayImage) {
        let plane = self.prepare(frame);
        let verdict = self.score(&plane, previous);
        (verdict, plane)
    }
}

fn reject(score: QualityScore, reason: RejectReason) -> QualityVerdict {
    QualityVerdict {
        score,
        rejection: Some(reason),
    }
}

/// Mean luma of a plane. Empty planes count as black.
pub fn mean_brightness(plane: &GrayImage) -> f64 {
    let pixels = plane.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    sum as f64 / pixels.len() as f64
}

/// Variance of the 4-neighbour Laplacian over the interior pixels.
///
/// Planes smaller than 3x3 have no interior and score 0.
pub fn laplacian_variance(plane: &GrayImage) -> f64 {
    let (width, height) = plane.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }
    let w = width as usize;
    let data = plane.as_raw();
    let at = |x: usize, y: usize| data[y * w + x] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for y in 1..height as usize - 1 {
        for x in 1..w - 1 {
            let response = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
            count += 1;
        }
    }
    let mean = sum / count as f64;
    (sum_sq / count as f64 - mean * mean).max(0.0)
}

/// Sum of absolute luma differences. `previous` is resized to the current
/// plane's dimensions when they differ.
pub fn motion_energy(current: &GrayImage, previous: &GrayImage) -> f64 {
    let (width, height) = current.dimensions();
    let previous = match_dimensions(previous, width, height);
    current
        .as_raw()
        .iter()
        .zip(previous.as_raw())
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum::<u64>() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn flat(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    fn checkerboard(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 { Luma([40]) } else { Luma([200]) }
        })
    }

    fn scorer() -> QualityScorer {
        let mut config = QualityConfig::default();
        config.enabled = true;
        config.detect_motion = true;
        config.min_brightness = 30.0;
        config.max_brightness = 225.0;
        config.min_sharpness = 100.0;
        config.min_motion = 500.0;
        QualityScorer::new(&config)
    }

    #[test]
    fn test_flat_plane_has_zero_sharpness() {
        assert_eq!(laplacian_variance(&flat(16, 16, 128)), 0.0);
        assert!(laplacian_variance(&checkerboard(16, 16)) > 1000.0);
    }

    #[test]
    fn test_dark_frame_is_rejected_for_brightness_first() {
        // Dark and flat: both brightness and sharpness fail, brightness is attributed.
        let verdict = scorer().score(&flat(32, 32, 5), None);
        assert_eq!(verdict.rejection, Some(RejectReason::Brightness));
        assert_eq!(verdict.score.sharpness, None);
    }

    #[test]
    fn test_blurred_frame_is_rejected_for_sharpness() {
        let verdict = scorer().score(&flat(32, 32, 128), None);
        assert_eq!(verdict.rejection, Some(RejectReason::Sharpness));
    }

    #[test]
    fn test_first_candidate_passes_motion() {
        let verdict = scorer().score(&checkerboard(32, 32), None);
        assert!(verdict.is_accepted());
        assert_eq!(verdict.score.motion, None);
    }

    #[test]
    fn test_static_scene_is_rejected_for_motion() {
        let frame = checkerboard(32, 32);
        let verdict = scorer().score(&frame, Some(&frame));
        assert_eq!(verdict.rejection, Some(RejectReason::Motion));
        assert_eq!(verdict.score.motion, Some(0.0));
    }

    #[test]
    fn test_disabled_filter_accepts_but_still_measures() {
        let mut config = QualityConfig::default();
        config.enabled = false;
        let verdict = QualityScorer::new(&config).score(&flat(8, 8, 0), None);
        assert!(verdict.is_accepted());
        assert_eq!(verdict.score.brightness, 0.0);
        assert_eq!(verdict.score.sharpness, Some(0.0));
    }

    #[test]
    fn test_motion_energy_resizes_previous() {
        let current = flat(8, 8, 10);
        let previous = flat(16, 16, 0);
        assert_eq!(motion_energy(&current, &previous), 640.0);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let mut config = QualityConfig::default();
        config.enabled = true;
        config.detect_motion = true;
        config.min_sharpness = 0.0;
        config.min_motion = 640.0;
        let verdict = QualityScorer::new(&config).score(&flat(8, 8, 110), Some(&flat(8, 8, 100)));
        assert_eq!(verdict.score.sharpness, Some(0.0));
        assert_eq!(verdict.score.motion, Some(640.0));
        assert!(verdict.is_accepted());
    }
}
