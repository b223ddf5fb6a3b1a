// ============================================================================
// framecurator-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CuratorConfig
//
// Fluent construction of CuratorConfig instances on top of the defaults.
// Building does not validate; call `CuratorConfig::validate` before use.

use super::{
    CuratorConfig, FrameFormat, RangedTransform, RotationBoxMode, SimilarityMeasureChoice,
};

/// Builder for creating CuratorConfig instances.
///
/// # Examples
///
/// ```rust
/// use framecurator_core::config::{CuratorConfigBuilder, RotationBoxMode};
///
/// let config = CuratorConfigBuilder::new()
///     .intervals(2, 5)
///     .max_frames_per_video(200)
///     .brightness_band(40.0, 210.0)
///     .rotation_bbox_mode(RotationBoxMode::Affine)
///     .augmentations_per_image(4)
///     .build();
/// assert_eq!(config.sampling.large_interval, 5);
/// ```
#[derive(Debug, Clone)]
pub struct CuratorConfigBuilder {
    config: CuratorConfig,
}

impl Default for CuratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CuratorConfigBuilder {
    /// Creates a new builder seeded with the default configuration.
    pub fn new() -> Self {
        Self {
            config: CuratorConfig::default(),
        }
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: CuratorConfig) -> Self {
        Self { config }
    }

    /// Sets the small- and large-collection sampling intervals.
    pub fn intervals(mut self, small: u64, large: u64) -> Self {
        self.config.sampling.small_interval = small;
        self.config.sampling.large_interval = large;
        self
    }

    /// Sets the collection size at which the large interval takes over.
    pub fn threshold_videos(mut self, threshold: usize) -> Self {
        self.config.sampling.threshold_videos = threshold;
        self
    }

    /// Caps the number of candidates emitted per video.
    pub fn max_frames_per_video(mut self, max_frames: usize) -> Self {
        self.config.sampling.max_frames_per_video = Some(max_frames);
        self
    }

    /// Enables or disables the quality filter as a whole.
    pub fn quality_filter(mut self, enabled: bool) -> Self {
        self.config.quality.enabled = enabled;
        self
    }

    /// Sets the inclusive mean-luma acceptance band.
    pub fn brightness_band(mut self, min: f64, max: f64) -> Self {
        self.config.quality.min_brightness = min;
        self.config.quality.max_brightness = max;
        self
    }

    pub fn min_sharpness(mut self, min_sharpness: f64) -> Self {
        self.config.quality.min_sharpness = min_sharpness;
        self
    }

    pub fn min_motion(mut self, min_motion: f64) -> Self {
        self.config.quality.min_motion = min_motion;
        self
    }

    pub fn detect_motion(mut self, detect: bool) -> Self {
        self.config.quality.detect_motion = detect;
        self
    }

    /// Enables metric downscaling to at most `max_dim` pixels on the long side.
    pub fn fast_metrics(mut self, enabled: bool, max_dim: u32) -> Self {
        self.config.quality.fast_metrics = enabled;
        self.config.quality.metric_max_dim = max_dim;
        self
    }

    pub fn skip_similar(mut self, skip: bool) -> Self {
        self.config.dedup.skip_similar = skip;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.dedup.similarity_threshold = threshold;
        self
    }

    pub fn similarity_measure(mut self, measure: SimilarityMeasureChoice) -> Self {
        self.config.dedup.similarity_measure = measure;
        self
    }

    pub fn augmentations_per_image(mut self, count: usize) -> Self {
        self.config.augmentation.augmentations_per_image = count;
        self
    }

    pub fn brightness_transform(mut self, transform: RangedTransform) -> Self {
        self.config.augmentation.brightness = transform;
        self
    }

    pub fn contrast_transform(mut self, transform: RangedTransform) -> Self {
        self.config.augmentation.contrast = transform;
        self
    }

    pub fn flip_probability(mut self, probability: f64) -> Self {
        self.config.augmentation.flip_probability = probability;
        self
    }

    pub fn rotation_transform(mut self, transform: RangedTransform) -> Self {
        self.config.augmentation.rotation = transform;
        self
    }

    pub fn zoom_transform(mut self, transform: RangedTransform) -> Self {
        self.config.augmentation.zoom = transform;
        self
    }

    /// Sets the noise activation probability and standard deviation.
    pub fn noise(mut self, probability: f64, std_dev: f64) -> Self {
        self.config.augmentation.noise_probability = probability;
        self.config.augmentation.noise_std = std_dev;
        self
    }

    pub fn rotation_bbox_mode(mut self, mode: RotationBoxMode) -> Self {
        self.config.augmentation.rotation_bbox_mode = mode;
        self
    }

    pub fn rotation_tolerance_deg(mut self, tolerance: f64) -> Self {
        self.config.augmentation.rotation_tolerance_deg = tolerance;
        self
    }

    pub fn min_box_extent(mut self, extent: f64) -> Self {
        self.config.augmentation.min_box_extent = extent;
        self
    }

    /// Replaces the class set.
    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.augmentation.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn frame_format(mut self, format: FrameFormat) -> Self {
        self.config.output.frame_format = format;
        self
    }

    pub fn parallel_lanes(mut self, lanes: usize) -> Self {
        self.config.parallel_lanes = lanes;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CuratorConfig {
        self.config
    }
}
