//! Lane behaviour of the adaptive sampler, driven by an in-memory decoder.

use framecurator_core::config::{CuratorConfig, CuratorConfigBuilder};
use framecurator_core::error::{CoreError, CoreResult};
use framecurator_core::media::{DecodedFrame, FrameCandidate, FrameSource, VideoAsset, VideoOpener};
use framecurator_core::persistence::{DirectoryFrameSink, FrameRecord, FrameSink};
use framecurator_core::processing::{
    AdaptiveFrameSampler, LaneStatus, QualityScore, sample_indices,
};
use framecurator_core::reporting::{NullReporter, Reporter};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ---- Fakes ----

/// `None` entries decode as corrupt frames.
type FakeVideo = Vec<Option<RgbImage>>;

struct FakeOpener {
    videos: HashMap<String, FakeVideo>,
    report_frame_count: bool,
    /// Ids whose probe fails
    unprobeable: Vec<String>,
    /// Ids that open but end without frames and report a decoder failure
    failing_streams: Vec<String>,
}

impl FakeOpener {
    fn new(videos: Vec<(&str, FakeVideo)>) -> Self {
        Self {
            videos: videos.into_iter().map(|(id, v)| (id.to_string(), v)).collect(),
            report_frame_count: true,
            unprobeable: Vec::new(),
            failing_streams: Vec::new(),
        }
    }
}

struct FakeSource {
    frames: std::vec::IntoIter<Option<RgbImage>>,
    next_index: u64,
    failure: Option<String>,
}

impl FrameSource for FakeSource {
    fn next_frame(&mut self) -> Option<DecodedFrame> {
        let frame = self.frames.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(match frame {
            Some(image) => DecodedFrame::Frame { index, image },
            None => DecodedFrame::Corrupt {
                index,
                reason: "checksum mismatch".to_string(),
            },
        })
    }

    fn failure(&self) -> Option<String> {
        self.failure.clone()
    }
}

impl VideoOpener for FakeOpener {
    fn probe(&self, path: &Path) -> CoreResult<VideoAsset> {
        let asset = VideoAsset::new(path).with_frame_rate(30.0);
        if self.unprobeable.contains(&asset.id) {
            return Err(CoreError::OperationFailed("Invalid data found when processing input".to_string()));
        }
        let count = match self.videos.get(&asset.id) {
            Some(frames) if self.report_frame_count => frames.len() as u64,
            _ => 0,
        };
        Ok(asset.with_frame_count(count))
    }

    fn open(&self, asset: &VideoAsset) -> CoreResult<Box<dyn FrameSource>> {
        if self.failing_streams.contains(&asset.id) {
            return Ok(Box::new(FakeSource {
                frames: Vec::new().into_iter(),
                next_index: 0,
                failure: Some("No such file or directory".to_string()),
            }));
        }
        let frames = self.videos.get(&asset.id).ok_or_else(|| CoreError::AssetOpen {
            id: asset.id.clone(),
            reason: "moov atom not found".to_string(),
        })?;
        Ok(Box::new(FakeSource {
            frames: frames.clone().into_iter(),
            next_index: 0,
            failure: None,
        }))
    }
}

#[derive(Default)]
struct MemorySink {
    persisted: Mutex<Vec<(String, u64)>>,
}

impl FrameSink for MemorySink {
    fn persist(
        &self,
        asset: &VideoAsset,
        _interval: u64,
        candidate: &FrameCandidate,
        quality: &QualityScore,
        similarity: Option<f64>,
    ) -> CoreResult<FrameRecord> {
        self.persisted
            .lock()
            .unwrap()
            .push((asset.id.clone(), candidate.index));
        Ok(FrameRecord {
            video_id: asset.id.clone(),
            frame_index: candidate.index,
            timestamp: candidate.timestamp,
            path: PathBuf::from(format!("{}/{}", asset.id, candidate.index)),
            quality: quality.clone(),
            similarity,
        })
    }
}

#[derive(Default)]
struct RecordingReporter {
    warnings: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

// ---- Frame factories ----

/// Sharp, mid-brightness random texture; distinct seeds give dissimilar frames.
fn textured(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(64, 48, |_, _| {
        let v: u8 = rng.random_range(30..=230);
        Rgb([v, v, v])
    })
}

fn dark() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([5, 5, 5]))
}

fn blurred() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([128, 128, 128]))
}

fn distinct_frames(count: u64) -> FakeVideo {
    (0..count).map(|i| Some(textured(1000 + i))).collect()
}

fn config(small: u64, large: u64, threshold: usize) -> CuratorConfig {
    CuratorConfigBuilder::new()
        .intervals(small, large)
        .threshold_videos(threshold)
        .parallel_lanes(2)
        .seed(7)
        .build()
}

fn paths(ids: &[&str]) -> Vec<PathBuf> {
    ids.iter().map(|id| PathBuf::from(format!("/videos/{id}.mp4"))).collect()
}

// ---- Tests ----

#[test]
fn test_unopenable_asset_is_skipped_and_batch_continues() {
    let opener = FakeOpener::new(vec![("good", distinct_frames(4))]);
    let reporter = RecordingReporter::default();
    let config = config(1, 1, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &reporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["broken", "good"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    assert_eq!(summary.total_videos(), 2);
    assert!(matches!(summary.lanes[0].status, LaneStatus::Skipped { .. }));
    assert_eq!(summary.lanes[0].video_id, "broken");
    assert_eq!(summary.lanes[1].status, LaneStatus::Completed);
    assert_eq!(summary.lanes[1].accepted(), 4);
    assert_eq!(summary.skipped_videos(), 1);

    let warnings = reporter.warnings.lock().unwrap();
    assert!(warnings.iter().any(|w| w.contains("broken")));
}

#[test]
fn test_unprobeable_asset_counts_toward_collection_and_is_skipped() {
    let mut opener = FakeOpener::new(vec![
        ("bad", distinct_frames(10)),
        ("a", distinct_frames(10)),
        ("b", distinct_frames(10)),
    ]);
    opener.unprobeable.push("bad".to_string());
    let reporter = RecordingReporter::default();
    let config = config(2, 5, 2);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &reporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["bad", "a", "b"]));
    assert!(assets[0].probe_error.is_some());
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    assert_eq!(summary.interval, 5);
    assert!(matches!(summary.lanes[0].status, LaneStatus::Skipped { .. }));
    assert_eq!(summary.lanes[0].candidates, 0);
    assert_eq!(summary.skipped_videos(), 1);
    assert_eq!(summary.completed_videos(), 2);
    assert!(sink.persisted.lock().unwrap().iter().all(|(id, _)| id != "bad"));

    let warnings = reporter.warnings.lock().unwrap();
    assert!(warnings.iter().any(|w| w.contains("Could not probe") && w.contains("bad")));
    assert!(warnings.iter().any(|w| w.starts_with("Skipping video 'bad'")));
}

#[test]
fn test_stream_failing_before_first_frame_skips_lane() {
    let mut opener = FakeOpener::new(vec![("gone", Vec::new()), ("good", distinct_frames(3))]);
    opener.failing_streams.push("gone".to_string());
    let reporter = RecordingReporter::default();
    let config = config(1, 1, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &reporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["gone", "good"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    match &summary.lanes[0].status {
        LaneStatus::Skipped { reason } => assert!(reason.contains("No such file"), "{reason}"),
        other => panic!("expected a skipped lane, got {other:?}"),
    }
    assert_eq!(summary.lanes[1].accepted(), 3);
    assert_eq!(summary.skipped_videos(), 1);
    assert!(reporter.warnings.lock().unwrap().iter().any(|w| w.contains("gone")));
}

#[test]
fn test_corrupt_frame_is_skipped_and_lane_continues() {
    let frames = vec![Some(textured(1)), None, Some(textured(2))];
    let opener = FakeOpener::new(vec![("clip", frames)]);
    let config = config(1, 1, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["clip"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    let lane = &summary.lanes[0];
    assert_eq!(lane.candidates, 3);
    assert_eq!(lane.corrupt_frames, 1);
    let indices: Vec<u64> = lane.records.iter().map(|r| r.frame_index).collect();
    assert_eq!(indices, vec![0, 2]);
}

#[test]
fn test_lane_follows_cadence_and_cap() {
    let opener = FakeOpener::new(vec![("clip", distinct_frames(20))]);
    let mut config = config(3, 7, 10);
    config.sampling.max_frames_per_video = Some(4);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["clip"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    assert_eq!(summary.interval, 3);
    let indices: Vec<u64> = summary.lanes[0].records.iter().map(|r| r.frame_index).collect();
    assert_eq!(indices, sample_indices(20, 3, Some(4)));
    assert_eq!(indices, vec![0, 3, 6, 9]);
}

#[test]
fn test_large_collection_uses_large_interval() {
    let opener = FakeOpener::new(vec![
        ("a", distinct_frames(12)),
        ("b", distinct_frames(12)),
        ("c", distinct_frames(12)),
    ]);
    let config = config(2, 5, 2);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["a", "b", "c"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    assert_eq!(summary.interval, 5);
    let ids: Vec<&str> = summary.lanes.iter().map(|l| l.video_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    for lane in &summary.lanes {
        let indices: Vec<u64> = lane.records.iter().map(|r| r.frame_index).collect();
        assert_eq!(indices, vec![0, 5, 10]);
    }
    assert_eq!(sink.persisted.lock().unwrap().len(), 9);
}

#[test]
fn test_rejections_are_attributed_per_check() {
    let a = textured(11);
    let b = textured(12);
    let frames = vec![
        Some(a.clone()), // 0 accepted
        Some(dark()),    // 1 brightness
        Some(blurred()), // 2 sharpness
        Some(a),         // 3 moves relative to frame 2, duplicate of frame 0
        Some(b.clone()), // 4 accepted
        Some(b),         // 5 no motion relative to frame 4
    ];
    let opener = FakeOpener::new(vec![("clip", frames)]);
    let config = config(1, 1, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["clip"]));
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();
    let lane = &summary.lanes[0];

    let indices: Vec<u64> = lane.records.iter().map(|r| r.frame_index).collect();
    assert_eq!(indices, vec![0, 4]);
    assert_eq!(lane.rejections.brightness, 1);
    assert_eq!(lane.rejections.sharpness, 1);
    assert_eq!(lane.rejections.duplicates, 1);
    assert_eq!(lane.rejections.motion, 1);

    assert_eq!(lane.records[0].quality.motion, None);
    assert!(lane.records[1].similarity.unwrap() < 0.95);
}

#[test]
fn test_unknown_frame_count_reads_until_exhaustion() {
    let mut opener = FakeOpener::new(vec![("stream", distinct_frames(9))]);
    opener.report_frame_count = false;
    let config = config(4, 4, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = MemorySink::default();

    let assets = sampler.load_assets(&paths(&["stream"]));
    assert_eq!(assets[0].frame_count, 0);
    let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();

    let indices: Vec<u64> = summary.lanes[0].records.iter().map(|r| r.frame_index).collect();
    assert_eq!(indices, vec![0, 4, 8]);
}

#[test]
fn test_sampling_is_deterministic_across_runs() {
    let run = || {
        let opener = FakeOpener::new(vec![("x", distinct_frames(15)), ("y", distinct_frames(15))]);
        let config = config(2, 2, 10);
        let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
        let sink = MemorySink::default();
        let assets = sampler.load_assets(&paths(&["x", "y"]));
        let summary = sampler.run_batch(&assets, &sink, "memory").unwrap();
        summary
            .lanes
            .iter()
            .map(|l| l.records.iter().map(|r| r.frame_index).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_directory_sink_writes_frames_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let opener = FakeOpener::new(vec![("game", distinct_frames(6))]);
    let config = config(2, 2, 10);
    let sampler = AdaptiveFrameSampler::new(&config, &opener, &NullReporter);
    let sink = DirectoryFrameSink::new(dir.path(), &config.output);

    let assets = sampler.load_assets(&paths(&["game"]));
    let summary = sampler.run_batch(&assets, &sink, &dir.path().display().to_string()).unwrap();

    let video_dir = dir.path().join("game__skip2");
    for index in [0, 2, 4] {
        assert!(video_dir.join(format!("game_frame_{index:06}.jpg")).exists());
    }
    assert!(video_dir.join("frames.json").exists());
    assert_eq!(summary.lanes[0].records[1].timestamp, 2.0 / 30.0);
}
