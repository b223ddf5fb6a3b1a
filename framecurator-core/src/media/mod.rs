// ============================================================================
// framecurator-core/src/media/mod.rs
// ============================================================================
//
// MEDIA ACCESS: Video Assets, Decoded Frames and Luma Planes
//
// This module defines the data the curation pipeline flows over and the seams
// at which frame decoding plugs in. The pipeline never talks to ffmpeg
// directly; it asks a `VideoOpener` for a `FrameSource` and consumes decoded
// frames in index order.
//
// KEY COMPONENTS:
// - VideoAsset: identifier, decode path and probed stream properties
// - FrameCandidate: one decoded frame awaiting filtering
// - FrameSource / VideoOpener: decoding collaborator traits
// - Luma helpers shared by the quality scorer and the dedup filter
//
// AI-ASSISTANT-INFO: Media types and decoding traits for frame curation

pub mod decoder;
pub mod probe;

use crate::error::CoreResult;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};

pub use decoder::{FfmpegOpener, ImageSequenceOpener};
pub use probe::{parse_frame_rate, probe_video};

// ============================================================================
// VIDEO ASSETS AND CANDIDATES
// ============================================================================

/// A video to sample frames from. Immutable once sampling starts.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAsset {
    /// Identifier used in output folder and file names (the file stem)
    pub id: String,

    /// Path handed to the decoder
    pub path: PathBuf,

    /// Frames per second; 0.0 when unknown
    pub frame_rate: f64,

    /// Total frame count; 0 when unknown, in which case the source is read to exhaustion
    pub frame_count: u64,

    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Why probing failed, if it did. Such an asset is never decoded.
    pub probe_error: Option<String>,
}

impl VideoAsset {
    /// Creates an asset with unknown stream properties, identified by the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = asset_id_for(&path);
        Self {
            id,
            path,
            frame_rate: 0.0,
            frame_count: 0,
            width: None,
            height: None,
            probe_error: None,
        }
    }

    /// An asset whose probe failed. It counts toward the collection size
    /// but its lane is skipped.
    pub fn unprobed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            probe_error: Some(reason.into()),
            ..Self::new(path)
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Presentation time of a frame index in seconds.
    pub fn timestamp_for(&self, index: u64) -> f64 {
        if self.frame_rate > 0.0 {
            index as f64 / self.frame_rate
        } else {
            0.0
        }
    }
}

/// Derives an asset identifier from a path: the file stem, or the
/// directory name for image sequences.
pub fn asset_id_for(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// A decoded frame that has not yet been accepted or rejected.
#[derive(Debug, Clone)]
pub struct FrameCandidate {
    pub video_id: String,
    pub index: u64,
    pub timestamp: f64,
    pub image: RgbImage,
}

// ============================================================================
// DECODING COLLABORATOR
// ============================================================================

/// Result of decoding one frame index.
#[derive(Debug)]
pub enum DecodedFrame {
    Frame { index: u64, image: RgbImage },
    /// The index exists but its pixels could not be produced
    Corrupt { index: u64, reason: String },
}

impl DecodedFrame {
    pub fn index(&self) -> u64 {
        match self {
            DecodedFrame::Frame { index, .. } | DecodedFrame::Corrupt { index, .. } => *index,
        }
    }
}

/// Sequential reader over a video's frames in increasing index order.
///
/// Returns `None` once the stream is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<DecodedFrame>;

    /// Asset-level failure found after the stream ended without yielding
    /// any frame, e.g. a decoder that opened but could not read the input.
    fn failure(&self) -> Option<String> {
        None
    }
}

/// Opens video assets for decoding. Shared by all lanes.
pub trait VideoOpener: Send + Sync {
    /// Fills in stream properties the opener can discover cheaply.
    fn probe(&self, path: &Path) -> CoreResult<VideoAsset>;

    /// Opens a frame source. Errors are asset errors: the lane is skipped.
    fn open(&self, asset: &VideoAsset) -> CoreResult<Box<dyn FrameSource>>;
}

// ============================================================================
// LUMA HELPERS
// ============================================================================

/// Rec.601 luma of one RGB pixel, in integer arithmetic.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Converts an RGB frame to its luma plane.
pub fn to_luma(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let data = image
        .pixels()
        .map(|p| luma(p[0], p[1], p[2]))
        .collect::<Vec<u8>>();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Luma plane used for metric computation, downscaled so the longest side
/// is at most `max_dim` when requested.
pub fn metric_luma(image: &RgbImage, downscale: bool, max_dim: u32) -> GrayImage {
    let gray = to_luma(image);
    if !downscale {
        return gray;
    }
    let (width, height) = gray.dimensions();
    let longest = width.max(height);
    if longest <= max_dim || max_dim == 0 {
        return gray;
    }
    let scale = max_dim as f64 / longest as f64;
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);
    imageops::resize(&gray, new_w, new_h, FilterType::Triangle)
}

/// Resizes `plane` to the given dimensions unless it already matches.
pub fn match_dimensions(plane: &GrayImage, width: u32, height: u32) -> GrayImage {
    if plane.dimensions() == (width, height) {
        plane.clone()
    } else {
        imageops::resize(plane, width, height, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_metric_luma_downscales_longest_side() {
        let image = RgbImage::new(1280, 720);
        let plane = metric_luma(&image, true, 640);
        assert_eq!(plane.dimensions(), (640, 360));

        let untouched = metric_luma(&image, false, 640);
        assert_eq!(untouched.dimensions(), (1280, 720));
    }

    #[test]
    fn test_timestamp_with_unknown_frame_rate() {
        let asset = VideoAsset::new("/videos/game.mp4");
        assert_eq!(asset.id, "game");
        assert_eq!(asset.timestamp_for(30), 0.0);
        assert_eq!(asset.with_frame_rate(30.0).timestamp_for(45), 1.5);
    }
}
