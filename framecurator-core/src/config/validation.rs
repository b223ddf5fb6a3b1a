//! Startup validation of a `CuratorConfig`.
//!
//! Out-of-range thresholds mean the run cannot produce meaningful output, so
//! every check here is fatal and reported as `CoreError::Config`.

use super::{
    AugmentationConfig, CuratorConfig, DedupConfig, QualityConfig, RangedTransform,
    RotationBoxMode, SamplingConfig, SimilarityMeasureChoice,
};
use crate::error::{CoreResult, config_error};

impl CuratorConfig {
    /// Validates every section. Returns the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        validate_sampling(&self.sampling)?;
        validate_quality(&self.quality)?;
        validate_dedup(&self.dedup)?;
        validate_augmentation(&self.augmentation)?;

        if self.parallel_lanes == 0 {
            return Err(config_error("parallel_lanes must be at least 1"));
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(config_error(format!(
                "jpeg_quality must be within 1-100, got {}",
                self.output.jpeg_quality
            )));
        }
        Ok(())
    }
}

fn validate_sampling(sampling: &SamplingConfig) -> CoreResult<()> {
    if sampling.small_interval == 0 || sampling.large_interval == 0 {
        return Err(config_error(format!(
            "sampling intervals must be positive (small={}, large={})",
            sampling.small_interval, sampling.large_interval
        )));
    }
    if sampling.max_frames_per_video == Some(0) {
        return Err(config_error("max_frames_per_video must be positive when set"));
    }
    Ok(())
}

fn validate_quality(quality: &QualityConfig) -> CoreResult<()> {
    for (name, value) in [
        ("min_brightness", quality.min_brightness),
        ("max_brightness", quality.max_brightness),
    ] {
        if !(0.0..=255.0).contains(&value) {
            return Err(config_error(format!("{name} must be within 0-255, got {value}")));
        }
    }
    if quality.min_brightness > quality.max_brightness {
        return Err(config_error(format!(
            "min_brightness ({}) exceeds max_brightness ({})",
            quality.min_brightness, quality.max_brightness
        )));
    }
    if !(quality.min_sharpness >= 0.0) {
        return Err(config_error(format!(
            "min_sharpness must be non-negative, got {}",
            quality.min_sharpness
        )));
    }
    if !(quality.min_motion >= 0.0) {
        return Err(config_error(format!(
            "min_motion must be non-negative, got {}",
            quality.min_motion
        )));
    }
    if quality.fast_metrics && quality.metric_max_dim == 0 {
        return Err(config_error("metric_max_dim must be positive"));
    }
    Ok(())
}

fn validate_dedup(dedup: &DedupConfig) -> CoreResult<()> {
    let threshold = dedup.similarity_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(config_error(format!(
            "similarity_threshold must be within (0, 1], got {threshold}"
        )));
    }
    if dedup.similarity_measure == SimilarityMeasureChoice::Structural
        && !cfg!(feature = "structural-similarity")
    {
        return Err(config_error(
            "similarity_measure 'structural' requires the structural-similarity feature",
        ));
    }
    Ok(())
}

fn validate_probability(name: &str, probability: f64) -> CoreResult<()> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(config_error(format!(
            "{name} probability must be within [0, 1], got {probability}"
        )));
    }
    Ok(())
}

fn validate_ranged(name: &str, transform: &RangedTransform) -> CoreResult<()> {
    validate_probability(name, transform.probability)?;
    if !transform.min().is_finite() || !transform.max().is_finite() {
        return Err(config_error(format!("{name} range must be finite")));
    }
    if transform.min() > transform.max() {
        return Err(config_error(format!(
            "{name} range is inverted: [{}, {}]",
            transform.min(),
            transform.max()
        )));
    }
    Ok(())
}

fn validate_augmentation(aug: &AugmentationConfig) -> CoreResult<()> {
    validate_ranged("brightness", &aug.brightness)?;
    validate_ranged("contrast", &aug.contrast)?;
    validate_probability("flip", aug.flip_probability)?;
    validate_ranged("rotation", &aug.rotation)?;
    validate_ranged("zoom", &aug.zoom)?;
    validate_probability("noise", aug.noise_probability)?;

    if aug.brightness.min() < -255.0 || aug.brightness.max() > 255.0 {
        return Err(config_error("brightness range must lie within [-255, 255]"));
    }
    if aug.contrast.min() <= 0.0 {
        return Err(config_error("contrast factors must be positive"));
    }
    if aug.zoom.min() <= 0.0 {
        return Err(config_error("zoom factors must be positive"));
    }
    if !(aug.noise_std >= 0.0) {
        return Err(config_error(format!(
            "noise_std must be non-negative, got {}",
            aug.noise_std
        )));
    }
    if !(aug.rotation_tolerance_deg >= 0.0) {
        return Err(config_error("rotation_tolerance_deg must be non-negative"));
    }
    if aug.rotation_bbox_mode == RotationBoxMode::Preserve {
        let widest = aug.rotation.min().abs().max(aug.rotation.max().abs());
        if widest > aug.rotation_tolerance_deg {
            return Err(config_error(format!(
                "rotation range reaches {widest} degrees but boxes are only preserved up to {} degrees; \
                 narrow the range or use rotation_bbox_mode 'affine'",
                aug.rotation_tolerance_deg
            )));
        }
    }
    if !(aug.min_box_extent > 0.0 && aug.min_box_extent < 1.0) {
        return Err(config_error(format!(
            "min_box_extent must be within (0, 1), got {}",
            aug.min_box_extent
        )));
    }
    if aug.classes.is_empty() {
        return Err(config_error("class set must contain at least one class"));
    }
    Ok(())
}
