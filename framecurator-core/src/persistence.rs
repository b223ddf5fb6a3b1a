// ============================================================================
// framecurator-core/src/persistence.rs
// ============================================================================
//
// PERSISTENCE: Writing Accepted Frames and Their Metadata
//
// Lanes hand accepted candidates to a `FrameSink`. The default sink writes
// one image per accepted frame plus a `frames.json` metadata file per video:
//
//   <out>/<video_id>__skip<interval>/<video_id>_frame_<index:06>.<ext>
//   <out>/<video_id>__skip<interval>/frames.json
//
// With `organize_by_video` off, every frame lands directly in <out> and the
// metadata file is named `<video_id>_frames.json`.

use crate::config::{FrameFormat, OutputConfig};
use crate::error::CoreResult;
use crate::media::{FrameCandidate, VideoAsset};
use crate::processing::QualityScore;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// An accepted frame and where it was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub video_id: String,
    pub frame_index: u64,
    pub timestamp: f64,
    pub path: PathBuf,
    pub quality: QualityScore,
    /// Similarity to the previous dedup reference, if there was one
    pub similarity: Option<f64>,
}

/// Persistence collaborator for accepted frames. Shared by all lanes.
pub trait FrameSink: Send + Sync {
    /// Stores one accepted frame.
    fn persist(
        &self,
        asset: &VideoAsset,
        interval: u64,
        candidate: &FrameCandidate,
        quality: &QualityScore,
        similarity: Option<f64>,
    ) -> CoreResult<FrameRecord>;

    /// Called once per lane after the last frame.
    fn finish(&self, _asset: &VideoAsset, _interval: u64, _records: &[FrameRecord]) -> CoreResult<()> {
        Ok(())
    }
}

/// Writes frames below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSink {
    root: PathBuf,
    output: OutputConfig,
}

impl DirectoryFrameSink {
    pub fn new(root: impl Into<PathBuf>, output: &OutputConfig) -> Self {
        Self {
            root: root.into(),
            output: output.clone(),
        }
    }

    pub fn video_dir(&self, asset: &VideoAsset, interval: u64) -> PathBuf {
        if self.output.organize_by_video {
            self.root.join(format!("{}__skip{}", asset.id, interval))
        } else {
            self.root.clone()
        }
    }

    fn metadata_path(&self, asset: &VideoAsset, interval: u64) -> PathBuf {
        let dir = self.video_dir(asset, interval);
        if self.output.organize_by_video {
            dir.join("frames.json")
        } else {
            dir.join(format!("{}_frames.json", asset.id))
        }
    }
}

impl FrameSink for DirectoryFrameSink {
    fn persist(
        &self,
        asset: &VideoAsset,
        interval: u64,
        candidate: &FrameCandidate,
        quality: &QualityScore,
        similarity: Option<f64>,
    ) -> CoreResult<FrameRecord> {
        let dir = self.video_dir(asset, interval);
        fs::create_dir_all(&dir)?;
        let path = dir.join(frame_file_name(
            &asset.id,
            candidate.index,
            self.output.frame_format,
        ));
        save_rgb_image(&path, &candidate.image, self.output.frame_format, self.output.jpeg_quality)?;
        log::trace!("Wrote frame {} of '{}' to {}", candidate.index, asset.id, path.display());

        Ok(FrameRecord {
            video_id: asset.id.clone(),
            frame_index: candidate.index,
            timestamp: candidate.timestamp,
            path,
            quality: quality.clone(),
            similarity,
        })
    }

    fn finish(&self, asset: &VideoAsset, interval: u64, records: &[FrameRecord]) -> CoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.metadata_path(asset, interval);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(file, records)?;
        log::debug!("Wrote metadata for {} frames to {}", records.len(), path.display());
        Ok(())
    }
}

/// `<video_id>_frame_<index:06>.<ext>`
pub fn frame_file_name(video_id: &str, index: u64, format: FrameFormat) -> String {
    format!("{}_frame_{:06}.{}", video_id, index, format.extension())
}

/// Encodes an RGB image to `path` in the given format.
pub fn save_rgb_image(path: &Path, image: &RgbImage, format: FrameFormat, jpeg_quality: u8) -> CoreResult<()> {
    match format {
        FrameFormat::Jpg => {
            let mut writer = BufWriter::new(File::create(path)?);
            let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
            image.write_with_encoder(encoder)?;
        }
        FrameFormat::Png => image.save_with_format(path, ImageFormat::Png)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_frame_file_name_is_zero_padded() {
        assert_eq!(frame_file_name("game", 42, FrameFormat::Jpg), "game_frame_000042.jpg");
        assert_eq!(frame_file_name("game", 1234567, FrameFormat::Png), "game_frame_1234567.png");
    }

    #[test]
    fn test_directory_sink_layout() {
        let dir = tempdir().unwrap();
        let mut output = OutputConfig::default();
        output.frame_format = FrameFormat::Png;
        output.organize_by_video = true;
        let sink = DirectoryFrameSink::new(dir.path(), &output);

        let asset = VideoAsset::new("/videos/game.mp4").with_frame_rate(30.0);
        let candidate = FrameCandidate {
            video_id: asset.id.clone(),
            index: 21,
            timestamp: 0.7,
            image: RgbImage::new(6, 4),
        };
        let quality = QualityScore {
            brightness: 0.0,
            sharpness: Some(0.0),
            motion: None,
        };

        let record = sink.persist(&asset, 7, &candidate, &quality, None).unwrap();
        assert_eq!(record.path, dir.path().join("game__skip7").join("game_frame_000021.png"));
        assert!(record.path.exists());

        sink.finish(&asset, 7, &[record]).unwrap();
        let metadata = fs::read_to_string(dir.path().join("game__skip7").join("frames.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(parsed[0]["frame_index"], 21);
    }
}
