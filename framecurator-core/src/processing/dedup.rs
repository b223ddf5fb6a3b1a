//! Near-duplicate suppression against the last accepted frame of a lane.
//!
//! `DedupState` is an owned value: the lane passes it into [`DedupFilter::filter`]
//! and gets the successor state back. The reference only changes when a
//! frame is accepted, so a rejected frame never becomes the new reference.

use crate::config::DedupConfig;
use crate::processing::similarity::{SimilarityMeasure, select_measure};

use image::GrayImage;

/// Per-video dedup reference. Never shared between lanes.
#[derive(Debug, Clone, Default)]
pub struct DedupState {
    reference: Option<GrayImage>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_none()
    }

    pub fn reference(&self) -> Option<&GrayImage> {
        self.reference.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupDecision {
    /// `similarity` is `None` when there was nothing to compare against
    Accepted { similarity: Option<f64> },
    Rejected { similarity: f64 },
}

impl DedupDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DedupDecision::Accepted { .. })
    }

    pub fn similarity(&self) -> Option<f64> {
        match *self {
            DedupDecision::Accepted { similarity } => similarity,
            DedupDecision::Rejected { similarity } => Some(similarity),
        }
    }
}

pub struct DedupFilter {
    measure: Box<dyn SimilarityMeasure>,
    threshold: f64,
    enabled: bool,
}

impl DedupFilter {
    pub fn new(config: &DedupConfig) -> Self {
        let measure = select_measure(config.similarity_measure);
        log::debug!(
            "Dedup filter using {} similarity (threshold {:.3})",
            measure.name(),
            config.similarity_threshold
        );
        Self {
            measure,
            threshold: config.similarity_threshold,
            enabled: config.skip_similar,
        }
    }

    /// Uses an explicit measure instead of the configured one.
    pub fn with_measure(measure: Box<dyn SimilarityMeasure>, threshold: f64) -> Self {
        Self {
            measure,
            threshold,
            enabled: true,
        }
    }

    pub fn measure_name(&self) -> &'static str {
        self.measure.name()
    }

    /// Decides whether `frame` is a near-duplicate of the lane's reference.
    ///
    /// Rejects iff `similarity >= threshold`. On acceptance the returned state
    /// holds `frame` as the new reference; on rejection it is `state` unchanged.
    pub fn filter(&self, state: DedupState, frame: &GrayImage) -> (DedupDecision, DedupState) {
        let similarity = match (&state.reference, self.enabled) {
            (Some(reference), true) => Some(self.measure.similarity(frame, reference)),
            _ => None,
        };

        if let Some(similarity) = similarity {
            if similarity >= self.threshold {
                return (DedupDecision::Rejected { similarity }, state);
            }
        }

        let next = DedupState {
            reference: Some(frame.clone()),
        };
        (DedupDecision::Accepted { similarity }, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::similarity::DifferenceSimilarity;
    use image::Luma;

    fn filter(threshold: f64) -> DedupFilter {
        DedupFilter::with_measure(Box::new(DifferenceSimilarity), threshold)
    }

    #[test]
    fn test_first_frame_always_passes() {
        let frame = GrayImage::from_pixel(8, 8, Luma([90]));
        let (decision, state) = filter(0.01).filter(DedupState::new(), &frame);
        assert_eq!(decision, DedupDecision::Accepted { similarity: None });
        assert!(!state.is_empty());
    }

    #[test]
    fn test_identical_frame_rejected_and_reference_kept() {
        let first = GrayImage::from_pixel(8, 8, Luma([90]));
        let dedup = filter(0.95);
        let (_, state) = dedup.filter(DedupState::new(), &first);

        let (decision, state) = dedup.filter(state, &first);
        assert_eq!(decision, DedupDecision::Rejected { similarity: 1.0 });
        assert_eq!(state.reference(), Some(&first));
    }

    #[test]
    fn test_similarity_equal_to_threshold_is_rejected() {
        let a = GrayImage::from_pixel(4, 4, Luma([120]));
        let dedup = filter(1.0);
        let (_, state) = dedup.filter(DedupState::new(), &a);
        let (decision, _) = dedup.filter(state, &a);
        assert_eq!(decision, DedupDecision::Rejected { similarity: 1.0 });
    }

    #[test]
    fn test_distinct_frame_replaces_reference() {
        let a = GrayImage::from_pixel(4, 4, Luma([0]));
        let b = GrayImage::from_pixel(4, 4, Luma([255]));
        let dedup = filter(0.5);
        let (_, state) = dedup.filter(DedupState::new(), &a);
        let (decision, state) = dedup.filter(state, &b);
        assert!(decision.is_accepted());
        assert!(decision.similarity().unwrap() < 0.001);
        assert_eq!(state.reference(), Some(&b));
    }

    #[test]
    fn test_disabled_filter_accepts_duplicates() {
        let mut config = DedupConfig::default();
        config.skip_similar = false;
        let dedup = DedupFilter::new(&config);
        let frame = GrayImage::from_pixel(8, 8, Luma([10]));
        let (_, state) = dedup.filter(DedupState::new(), &frame);
        let (decision, _) = dedup.filter(state, &frame);
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_refiltering_kept_frames_rejects_nothing() {
        let dedup = filter(0.9);
        let frames: Vec<GrayImage> = [0u8, 10, 200, 205, 60, 255, 250]
            .iter()
            .map(|v| GrayImage::from_pixel(6, 6, Luma([*v])))
            .collect();

        let run = |input: &[GrayImage]| {
            let mut state = DedupState::new();
            let mut kept = Vec::new();
            for frame in input {
                let (decision, next) = dedup.filter(state, frame);
                state = next;
                if decision.is_accepted() {
                    kept.push(frame.clone());
                }
            }
            kept
        };

        let once = run(&frames);
        assert!(once.len() < frames.len());
        assert_eq!(run(&once), once);
    }
}
