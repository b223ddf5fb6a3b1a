// ============================================================================
// framecurator-core/src/media/decoder.rs
// ============================================================================
//
// FRAME DECODERS: VideoOpener Implementations
//
// Two decoding collaborators are provided:
// - FfmpegOpener: pipes raw RGB24 frames out of ffmpeg via ffmpeg-sidecar
// - ImageSequenceOpener: treats a directory of numbered images as a video,
//   one file per frame index
//
// Both yield frames strictly in increasing index order.

use crate::discovery::find_image_files_flat;
use crate::error::{CoreError, CoreResult};
use crate::media::{DecodedFrame, FrameSource, VideoAsset, VideoOpener, asset_id_for, probe_video};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::RgbImage;
use std::path::{Path, PathBuf};

// ============================================================================
// FFMPEG
// ============================================================================

/// Opens video files through ffprobe (metadata) and ffmpeg (pixels).
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegOpener;

impl VideoOpener for FfmpegOpener {
    fn probe(&self, path: &Path) -> CoreResult<VideoAsset> {
        probe_video(path)
    }

    fn open(&self, asset: &VideoAsset) -> CoreResult<Box<dyn FrameSource>> {
        let asset_error = |reason: String| CoreError::AssetOpen {
            id: asset.id.clone(),
            reason,
        };

        log::debug!("Spawning ffmpeg (sidecar) raw decoder for {}", asset.path.display());

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(asset.path.as_os_str())
            .rawvideo()
            .spawn()
            .map_err(|e| asset_error(format!("failed to start ffmpeg: {e}")))?;

        let events = child
            .iter()
            .map_err(|e| asset_error(format!("failed to read ffmpeg output: {e}")))?;

        Ok(Box::new(FfmpegFrameSource {
            id: asset.id.clone(),
            child,
            events,
            next_index: 0,
            errors: Vec::new(),
            ended: false,
        }))
    }
}

struct FfmpegFrameSource {
    id: String,
    child: FfmpegChild,
    events: FfmpegIterator,
    next_index: u64,
    /// Error-level lines from ffmpeg, kept until the first frame arrives
    errors: Vec<String>,
    ended: bool,
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Option<DecodedFrame> {
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let index = self.next_index;
                    self.next_index += 1;

                    let expected = frame.width as usize * frame.height as usize * 3;
                    if frame.data.len() != expected {
                        return Some(DecodedFrame::Corrupt {
                            index,
                            reason: format!(
                                "short frame buffer: {} of {} bytes",
                                frame.data.len(),
                                expected
                            ),
                        });
                    }
                    return Some(match RgbImage::from_raw(frame.width, frame.height, frame.data) {
                        Some(image) => DecodedFrame::Frame { index, image },
                        None => DecodedFrame::Corrupt {
                            index,
                            reason: "frame buffer does not match dimensions".to_string(),
                        },
                    });
                }
                FfmpegEvent::Error(message) | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => {
                    log::warn!("ffmpeg reported an error while decoding '{}': {}", self.id, message);
                    if self.next_index == 0 {
                        self.errors.push(message);
                    }
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }
        if !self.ended {
            self.ended = true;
            if self.next_index == 0 {
                match self.child.wait() {
                    Ok(status) if !status.success() => self.errors.push(format!("ffmpeg exited with {status}")),
                    Err(e) => self.errors.push(format!("failed to wait for ffmpeg: {e}")),
                    _ => {}
                }
            }
        }
        None
    }

    fn failure(&self) -> Option<String> {
        if !self.ended || self.next_index > 0 {
            return None;
        }
        self.errors
            .first()
            .map(|last| format!("ffmpeg produced no frames: {last}"))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        // The lane may stop early (frame cap); don't leave ffmpeg blocked on a full pipe.
        if self.child.kill().is_ok() {
            let _ = self.child.wait();
        }
    }
}

// ============================================================================
// IMAGE SEQUENCES
// ============================================================================

/// Opens a directory of frame images (sorted by file name) as a video.
#[derive(Debug, Clone, Copy)]
pub struct ImageSequenceOpener {
    frame_rate: f64,
}

impl ImageSequenceOpener {
    /// `frame_rate` is used for timestamps only; pass 0.0 when unknown.
    pub fn new(frame_rate: f64) -> Self {
        Self { frame_rate }
    }
}

impl Default for ImageSequenceOpener {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ImageSequenceOpener {
    fn list_frames(&self, dir: &Path) -> CoreResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(CoreError::AssetOpen {
                id: asset_id_for(dir),
                reason: format!("{} is not a directory", dir.display()),
            });
        }
        let mut frames = find_image_files_flat(dir).map_err(|e| CoreError::AssetOpen {
            id: asset_id_for(dir),
            reason: e.to_string(),
        })?;
        frames.sort();
        Ok(frames)
    }
}

impl VideoOpener for ImageSequenceOpener {
    fn probe(&self, path: &Path) -> CoreResult<VideoAsset> {
        let frames = self.list_frames(path)?;
        Ok(VideoAsset::new(path)
            .with_frame_rate(self.frame_rate)
            .with_frame_count(frames.len() as u64))
    }

    fn open(&self, asset: &VideoAsset) -> CoreResult<Box<dyn FrameSource>> {
        let frames = self.list_frames(&asset.path)?;
        if frames.is_empty() {
            return Err(CoreError::AssetOpen {
                id: asset.id.clone(),
                reason: "image sequence contains no frames".to_string(),
            });
        }
        Ok(Box::new(ImageSequenceSource {
            frames: frames.into_iter(),
            next_index: 0,
        }))
    }
}

struct ImageSequenceSource {
    frames: std::vec::IntoIter<PathBuf>,
    next_index: u64,
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<DecodedFrame> {
        let path = self.frames.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(match image::open(&path) {
            Ok(decoded) => DecodedFrame::Frame {
                index,
                image: decoded.to_rgb8(),
            },
            Err(e) => DecodedFrame::Corrupt {
                index,
                reason: format!("{}: {e}", path.display()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_image_sequence_reports_corrupt_frames_in_order() {
        let dir = tempdir().unwrap();
        let seq = dir.path().join("clip");
        fs::create_dir(&seq).unwrap();
        RgbImage::new(4, 4).save(seq.join("0000.png")).unwrap();
        fs::write(seq.join("0001.png"), b"not a png").unwrap();
        RgbImage::new(4, 4).save(seq.join("0002.png")).unwrap();

        let opener = ImageSequenceOpener::new(10.0);
        let asset = opener.probe(&seq).unwrap();
        assert_eq!(asset.id, "clip");
        assert_eq!(asset.frame_count, 3);

        let mut source = opener.open(&asset).unwrap();
        assert!(matches!(source.next_frame(), Some(DecodedFrame::Frame { index: 0, .. })));
        assert!(matches!(source.next_frame(), Some(DecodedFrame::Corrupt { index: 1, .. })));
        assert!(matches!(source.next_frame(), Some(DecodedFrame::Frame { index: 2, .. })));
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_missing_sequence_is_asset_error() {
        let dir = tempdir().unwrap();
        let opener = ImageSequenceOpener::default();
        let asset = VideoAsset::new(dir.path().join("missing"));
        assert!(matches!(opener.open(&asset), Err(CoreError::AssetOpen { .. })));
    }

    #[test]
    fn test_ffmpeg_missing_input_is_an_asset_failure() {
        let dir = tempdir().unwrap();
        let asset = VideoAsset::new(dir.path().join("no such clip.mp4"));
        match FfmpegOpener.open(&asset) {
            // No ffmpeg binary on this machine
            Err(e) => assert!(matches!(e, CoreError::AssetOpen { .. })),
            Ok(mut source) => {
                assert!(source.next_frame().is_none());
                assert!(source.failure().is_some());
            }
        }
    }
}
