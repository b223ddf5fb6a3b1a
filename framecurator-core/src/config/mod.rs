//! Configuration structures and constants for the framecurator-core library.
//!
//! This module provides the configuration system for the curation pipeline:
//! sampling cadence, quality thresholds, deduplication, augmentation
//! probabilities and ranges, and output options. Every section has sensible
//! defaults that can be overridden through `FRAMECURATOR_*` environment
//! variables, a JSON configuration file, or the builder.

mod builder;
mod utils;
mod validation;

use crate::error::CoreResult;

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

pub use builder::CuratorConfigBuilder;
pub use utils::*;

// Default constants

/// Frame stride used when the collection holds at most `threshold_videos` videos.
pub const DEFAULT_SMALL_INTERVAL: u64 = 3;

/// Frame stride used for larger collections.
pub const DEFAULT_LARGE_INTERVAL: u64 = 7;

/// Collection size at which sampling switches to the large interval.
pub const DEFAULT_THRESHOLD_VIDEOS: usize = 10;

/// Lower bound of the accepted mean luma band (0-255).
pub const DEFAULT_MIN_BRIGHTNESS: f64 = 30.0;

/// Upper bound of the accepted mean luma band (0-255).
pub const DEFAULT_MAX_BRIGHTNESS: f64 = 225.0;

/// Minimum Laplacian variance; blurrier frames are rejected.
pub const DEFAULT_MIN_SHARPNESS: f64 = 100.0;

/// Minimum summed absolute luma difference to the previous decoded frame.
pub const DEFAULT_MIN_MOTION: f64 = 500.0;

/// Longest side of the downscaled copy used for metric computation.
pub const DEFAULT_METRIC_MAX_DIM: u32 = 640;

/// Similarity at or above which a frame counts as a near-duplicate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Number of augmented variants generated per source image.
pub const DEFAULT_AUGMENTATIONS_PER_IMAGE: usize = 3;

/// Rotation angle (degrees) up to which boxes are kept unchanged.
pub const DEFAULT_ROTATION_TOLERANCE_DEG: f64 = 10.0;

/// Smallest normalized width/height a clipped box may keep.
pub const DEFAULT_MIN_BOX_EXTENT: f64 = 0.001;

/// JPEG quality for written frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default detection classes.
pub const DEFAULT_CLASSES: [&str; 3] = ["ball", "player", "hoop"];

/// Default activation probability and range of each ranged transform.
pub const DEFAULT_BRIGHTNESS: RangedTransform = RangedTransform::new(0.7, -30.0, 30.0);
pub const DEFAULT_CONTRAST: RangedTransform = RangedTransform::new(0.5, 0.8, 1.2);
pub const DEFAULT_ROTATION: RangedTransform = RangedTransform::new(0.3, -10.0, 10.0);
pub const DEFAULT_ZOOM: RangedTransform = RangedTransform::new(0.3, 0.9, 1.1);

/// Similarity measure used by the dedup filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMeasureChoice {
    /// Structural similarity when compiled in, otherwise the difference measure
    #[default]
    Auto,
    /// Always structural similarity (requires the `structural-similarity` feature)
    Structural,
    /// Tile-wise normalized luma difference on the SSIM scale
    Difference,
}

/// How bounding boxes follow an image rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationBoxMode {
    /// Boxes are kept as-is; only valid for angles within the tolerance
    #[default]
    Preserve,
    /// Box corners are rotated and the axis-aligned hull is taken
    Affine,
}

/// Image encoding for persisted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Jpg,
    Png,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Jpg => "jpg",
            FrameFormat::Png => "png",
        }
    }
}

/// Adaptive frame sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Stride for collections with at most `threshold_videos` videos
    pub small_interval: u64,

    /// Stride for larger collections
    pub large_interval: u64,

    /// Cutover point between the two strides
    pub threshold_videos: usize,

    /// Optional cap on emitted candidates per video
    pub max_frames_per_video: Option<usize>,
}

/// Per-frame quality thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// When false every frame is accepted (metrics are still computed)
    pub enabled: bool,

    /// Inclusive mean-luma acceptance band
    pub min_brightness: f64,
    pub max_brightness: f64,

    /// Laplacian-variance blur cutoff. Inclusive: a frame scoring exactly
    /// this value passes.
    pub min_sharpness: f64,

    /// Whether the motion check runs at all
    pub detect_motion: bool,

    /// Stasis cutoff for the summed luma difference. Inclusive like
    /// `min_sharpness`.
    pub min_motion: f64,

    /// Compute metrics on a downscaled copy
    pub fast_metrics: bool,

    /// Longest side of the downscaled copy
    pub metric_max_dim: u32,
}

/// Near-duplicate suppression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// When false the dedup stage accepts everything
    pub skip_similar: bool,

    /// Reject when similarity >= this value
    pub similarity_threshold: f64,

    /// Measure selection, resolved once when the filter is built
    pub similarity_measure: SimilarityMeasureChoice,
}

/// Activation probability and parameter range of one transform kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedTransform {
    pub probability: f64,
    pub range: [f64; 2],
}

impl RangedTransform {
    pub const fn new(probability: f64, min: f64, max: f64) -> Self {
        Self {
            probability,
            range: [min, max],
        }
    }

    pub fn min(&self) -> f64 {
        self.range[0]
    }

    pub fn max(&self) -> f64 {
        self.range[1]
    }
}

/// A ranged transform as written in a config file; missing keys fall back
/// to the defaults of the transform kind.
#[derive(Deserialize)]
struct PartialRangedTransform {
    probability: Option<f64>,
    range: Option<[f64; 2]>,
}

fn ranged_over<'de, D: Deserializer<'de>>(deserializer: D, base: RangedTransform) -> Result<RangedTransform, D::Error> {
    let partial = PartialRangedTransform::deserialize(deserializer)?;
    Ok(RangedTransform {
        probability: partial.probability.unwrap_or(base.probability),
        range: partial.range.unwrap_or(base.range),
    })
}

fn brightness_transform<'de, D: Deserializer<'de>>(d: D) -> Result<RangedTransform, D::Error> {
    ranged_over(d, DEFAULT_BRIGHTNESS)
}

fn contrast_transform<'de, D: Deserializer<'de>>(d: D) -> Result<RangedTransform, D::Error> {
    ranged_over(d, DEFAULT_CONTRAST)
}

fn rotation_transform<'de, D: Deserializer<'de>>(d: D) -> Result<RangedTransform, D::Error> {
    ranged_over(d, DEFAULT_ROTATION)
}

fn zoom_transform<'de, D: Deserializer<'de>>(d: D) -> Result<RangedTransform, D::Error> {
    ranged_over(d, DEFAULT_ZOOM)
}

/// Augmentation engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    pub enabled: bool,
    pub augmentations_per_image: usize,

    /// Additive delta on the HSV value channel
    #[serde(deserialize_with = "brightness_transform")]
    pub brightness: RangedTransform,

    /// Multiplicative factor around the image mean
    #[serde(deserialize_with = "contrast_transform")]
    pub contrast: RangedTransform,

    pub flip_probability: f64,

    /// Rotation angle in degrees (positive is counter-clockwise)
    #[serde(deserialize_with = "rotation_transform")]
    pub rotation: RangedTransform,

    /// Zoom factor (> 1 crops in, < 1 pads out)
    #[serde(deserialize_with = "zoom_transform")]
    pub zoom: RangedTransform,

    pub noise_probability: f64,

    /// Standard deviation of the additive Gaussian noise
    pub noise_std: f64,

    pub rotation_bbox_mode: RotationBoxMode,

    /// Largest rotation (degrees) tolerated by the `preserve` box mode
    pub rotation_tolerance_deg: f64,

    /// Boxes whose clipped width or height falls below this are dropped
    pub min_box_extent: f64,

    /// Fixed class set; annotation class ids index into it
    pub classes: Vec<String>,
}

/// Output options for persisted frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub frame_format: FrameFormat,
    pub jpeg_quality: u8,

    /// Write each video's frames into its own `<id>__skip<N>` folder
    pub organize_by_video: bool,
}

/// Main configuration structure for the framecurator-core library.
///
/// Typically created by the CLI (from defaults, a JSON file, or the builder)
/// and validated once with [`CuratorConfig::validate`] before any work starts.
/// After validation the configuration is shared read-only by every lane.
///
/// # Examples
///
/// ```rust
/// use framecurator_core::config::CuratorConfigBuilder;
///
/// let config = CuratorConfigBuilder::new()
///     .intervals(3, 7)
///     .threshold_videos(10)
///     .similarity_threshold(0.9)
///     .seed(42)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub sampling: SamplingConfig,
    pub quality: QualityConfig,
    pub dedup: DedupConfig,
    pub augmentation: AugmentationConfig,
    pub output: OutputConfig,

    /// Number of video lanes processed concurrently
    pub parallel_lanes: usize,

    /// Base seed for augmentation; random when absent
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            small_interval: get_env_u64("FRAMECURATOR_SMALL_INTERVAL", DEFAULT_SMALL_INTERVAL),
            large_interval: get_env_u64("FRAMECURATOR_LARGE_INTERVAL", DEFAULT_LARGE_INTERVAL),
            threshold_videos: get_env_usize(
                "FRAMECURATOR_THRESHOLD_VIDEOS",
                DEFAULT_THRESHOLD_VIDEOS,
            ),
            max_frames_per_video: get_env_opt_usize("FRAMECURATOR_MAX_FRAMES_PER_VIDEO"),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: get_env_bool("FRAMECURATOR_QUALITY_FILTER", true),
            min_brightness: get_env_f64("FRAMECURATOR_MIN_BRIGHTNESS", DEFAULT_MIN_BRIGHTNESS),
            max_brightness: get_env_f64("FRAMECURATOR_MAX_BRIGHTNESS", DEFAULT_MAX_BRIGHTNESS),
            min_sharpness: get_env_f64("FRAMECURATOR_MIN_SHARPNESS", DEFAULT_MIN_SHARPNESS),
            detect_motion: get_env_bool("FRAMECURATOR_DETECT_MOTION", true),
            min_motion: get_env_f64("FRAMECURATOR_MIN_MOTION", DEFAULT_MIN_MOTION),
            fast_metrics: get_env_bool("FRAMECURATOR_FAST_METRICS", true),
            metric_max_dim: get_env_u32("FRAMECURATOR_METRIC_MAX_DIM", DEFAULT_METRIC_MAX_DIM),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            skip_similar: get_env_bool("FRAMECURATOR_SKIP_SIMILAR", true),
            similarity_threshold: get_env_f64(
                "FRAMECURATOR_SIMILARITY_THRESHOLD",
                DEFAULT_SIMILARITY_THRESHOLD,
            ),
            similarity_measure: SimilarityMeasureChoice::default(),
        }
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            enabled: get_env_bool("FRAMECURATOR_AUGMENTATION", true),
            augmentations_per_image: get_env_usize(
                "FRAMECURATOR_AUGMENTATIONS_PER_IMAGE",
                DEFAULT_AUGMENTATIONS_PER_IMAGE,
            ),
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
            flip_probability: 0.5,
            rotation: DEFAULT_ROTATION,
            zoom: DEFAULT_ZOOM,
            noise_probability: 0.2,
            noise_std: 10.0,
            rotation_bbox_mode: RotationBoxMode::default(),
            rotation_tolerance_deg: DEFAULT_ROTATION_TOLERANCE_DEG,
            min_box_extent: DEFAULT_MIN_BOX_EXTENT,
            classes: DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_format: FrameFormat::default(),
            jpeg_quality: get_env_u8("FRAMECURATOR_JPEG_QUALITY", DEFAULT_JPEG_QUALITY),
            organize_by_video: true,
        }
    }
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            quality: QualityConfig::default(),
            dedup: DedupConfig::default(),
            augmentation: AugmentationConfig::default(),
            output: OutputConfig::default(),
            parallel_lanes: get_env_usize("FRAMECURATOR_PARALLEL_LANES", num_cpus::get()),
            seed: get_env_opt_u64("FRAMECURATOR_SEED"),
        }
    }
}

impl CuratorConfig {
    /// Loads a configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: CuratorConfig = serde_json::from_str(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "sampling": { "small_interval": 5 }, "seed": 7 }"#;
        let config: CuratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sampling.small_interval, 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.dedup.similarity_measure, SimilarityMeasureChoice::Auto);
        assert_eq!(config.augmentation.rotation_bbox_mode, RotationBoxMode::Preserve);
    }

    #[test]
    fn test_partial_transform_entry_keeps_kind_defaults() {
        let json = r#"{ "augmentation": { "zoom": { "probability": 0.5 }, "rotation": { "range": [-5.0, 5.0] } } }"#;
        let config: CuratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.augmentation.zoom, RangedTransform::new(0.5, 0.9, 1.1));
        assert_eq!(config.augmentation.rotation, RangedTransform::new(0.3, -5.0, 5.0));
        assert_eq!(config.augmentation.contrast, DEFAULT_CONTRAST);
    }

    #[test]
    fn test_enum_serialization_is_lowercase() {
        let value = serde_json::to_value(RotationBoxMode::Affine).unwrap();
        assert_eq!(value, serde_json::json!("affine"));
        assert_eq!(FrameFormat::Png.extension(), "png");
    }
}
