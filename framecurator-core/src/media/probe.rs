//! FFprobe integration for video asset discovery.
//!
//! Reads frame rate, frame count and dimensions of the first video stream.
//! Missing values are not fatal: an unknown frame count makes the lane read
//! the decoder to exhaustion and an unknown frame rate yields zero timestamps.

use crate::error::{CoreError, CoreResult};
use crate::media::{VideoAsset, asset_id_for};

use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Probes a video file and builds its `VideoAsset`.
pub fn probe_video(path: &Path) -> CoreResult<VideoAsset> {
    log::debug!("Running ffprobe (via crate) on: {}", path.display());
    let metadata = ffprobe(path).map_err(|err| map_ffprobe_error(path, err))?;

    let video_stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CoreError::AssetOpen {
            id: asset_id_for(path),
            reason: "no video stream found".to_string(),
        })?;

    let frame_rate = parse_frame_rate(&video_stream.avg_frame_rate)
        .filter(|fps| *fps > 0.0)
        .or_else(|| parse_frame_rate(&video_stream.r_frame_rate))
        .unwrap_or(0.0);

    // Containers without nb_frames (mkv, webm) leave the count unknown; the
    // lane then reads the decoder to exhaustion.
    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|f| f.parse::<u64>().ok())
        .unwrap_or(0);

    let mut asset = VideoAsset::new(path)
        .with_frame_rate(frame_rate)
        .with_frame_count(frame_count);
    asset.width = video_stream.width.filter(|w| *w > 0).map(|w| w as u32);
    asset.height = video_stream.height.filter(|h| *h > 0).map(|h| h as u32);
    Ok(asset)
}

/// Parses ffprobe's rational (`30000/1001`) or decimal frame rate notation.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    rate.is_finite().then_some(rate)
}

fn map_ffprobe_error(path: &Path, err: FfProbeError) -> CoreError {
    let reason = match err {
        FfProbeError::Io(io_err) => format!("failed to start ffprobe: {io_err}"),
        FfProbeError::Status(output) => format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        FfProbeError::Deserialize(err) => format!("unreadable ffprobe output: {err}"),
        other => format!("ffprobe error: {other:?}"),
    };
    CoreError::AssetOpen {
        id: asset_id_for(path),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_parsing() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
