//! Adaptive frame sampling and batch orchestration.
//!
//! The sampling interval depends on how many videos the run covers: small
//! collections are sampled densely, large ones sparsely. The interval is
//! resolved once per batch and shared by every lane.

use crate::config::{CuratorConfig, SamplingConfig};
use crate::error::{CoreError, CoreResult};
use crate::media::{VideoAsset, VideoOpener};
use crate::persistence::FrameSink;
use crate::processing::dedup::DedupFilter;
use crate::processing::lane::{BatchSummary, LaneContext, run_lane};
use crate::processing::quality::QualityScorer;
use crate::reporting::{BatchStartInfo, Reporter};

use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Picks the sampling stride for a collection of `video_count` videos.
pub fn resolve_interval(video_count: usize, sampling: &SamplingConfig) -> u64 {
    let interval = if video_count <= sampling.threshold_videos {
        sampling.small_interval
    } else {
        sampling.large_interval
    };
    interval.max(1)
}

/// Whether frame `index` falls on the sampling cadence.
#[inline]
pub fn is_sampled(index: u64, interval: u64) -> bool {
    index % interval.max(1) == 0
}

/// Frame indices a lane visits for a video with `frame_count` frames.
///
/// Deterministic: the same inputs always give the same sequence.
pub fn sample_indices(frame_count: u64, interval: u64, cap: Option<usize>) -> Vec<u64> {
    let step = interval.max(1) as usize;
    let indices = (0..frame_count).step_by(step);
    match cap {
        Some(cap) => indices.take(cap).collect(),
        None => indices.collect(),
    }
}

/// Drives per-video lanes through quality scoring and deduplication.
pub struct AdaptiveFrameSampler<'a> {
    config: &'a CuratorConfig,
    opener: &'a dyn VideoOpener,
    reporter: &'a dyn Reporter,
    scorer: QualityScorer,
    dedup: DedupFilter,
}

impl<'a> AdaptiveFrameSampler<'a> {
    /// The configuration is expected to be validated already.
    pub fn new(config: &'a CuratorConfig, opener: &'a dyn VideoOpener, reporter: &'a dyn Reporter) -> Self {
        Self {
            config,
            opener,
            reporter,
            scorer: QualityScorer::new(&config.quality),
            dedup: DedupFilter::new(&config.dedup),
        }
    }

    /// Probes every path. A failed probe is reported and the asset is kept
    /// as unprobed, so that it still counts toward the collection size and
    /// its lane is skipped without decoding.
    pub fn load_assets(&self, paths: &[PathBuf]) -> Vec<VideoAsset> {
        paths
            .iter()
            .map(|path| match self.opener.probe(path) {
                Ok(asset) => asset,
                Err(e) => {
                    let message = format!("Could not probe {}: {}", path.display(), e);
                    log::warn!("{message}");
                    self.reporter.warning(&message);
                    VideoAsset::unprobed(path.clone(), e.to_string())
                }
            })
            .collect()
    }

    /// Runs one lane per asset on a pool of `parallel_lanes` threads.
    ///
    /// Lane summaries come back in input order. Asset and decode failures
    /// are recorded in the summaries; only a pool setup failure is an error.
    pub fn run_batch(&self, assets: &[VideoAsset], sink: &dyn FrameSink, output_label: &str) -> CoreResult<BatchSummary> {
        let start = Instant::now();
        let interval = resolve_interval(assets.len(), &self.config.sampling);
        let lanes = self.config.parallel_lanes.max(1);

        log::info!(
            "Sampling {} videos every {} frames on {} lanes",
            assets.len(),
            interval,
            lanes
        );
        self.reporter.batch_started(&BatchStartInfo {
            total_videos: assets.len(),
            interval,
            parallel_lanes: lanes,
            output_dir: output_label.to_string(),
            video_ids: assets.iter().map(|a| a.id.clone()).collect(),
        });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(lanes)
            .thread_name(|i| format!("framecurator-lane-{i}"))
            .build()
            .map_err(|e| CoreError::OperationFailed(format!("failed to build lane pool: {e}")))?;

        let context = LaneContext {
            scorer: &self.scorer,
            dedup: &self.dedup,
            opener: self.opener,
            sink,
            reporter: self.reporter,
            interval,
            cap: self.config.sampling.max_frames_per_video,
        };

        let lane_summaries = pool.install(|| {
            assets
                .par_iter()
                .map(|asset| run_lane(&context, asset))
                .collect::<Vec<_>>()
        });

        let summary = BatchSummary {
            interval,
            lanes: lane_summaries,
            elapsed: start.elapsed(),
        };
        log::info!(
            "Batch complete: {} frames accepted from {} of {} videos",
            summary.total_accepted(),
            summary.completed_videos(),
            summary.total_videos()
        );
        self.reporter.batch_complete(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampling(small: u64, large: u64, threshold: usize) -> SamplingConfig {
        SamplingConfig {
            small_interval: small,
            large_interval: large,
            threshold_videos: threshold,
            max_frames_per_video: None,
        }
    }

    #[test]
    fn test_interval_switches_above_threshold() {
        let config = sampling(3, 7, 10);
        assert_eq!(resolve_interval(1, &config), 3);
        assert_eq!(resolve_interval(10, &config), 3);
        assert_eq!(resolve_interval(11, &config), 7);
    }

    #[test]
    fn test_sample_indices_respects_cap() {
        assert_eq!(sample_indices(10, 3, None), vec![0, 3, 6, 9]);
        assert_eq!(sample_indices(100, 7, Some(3)), vec![0, 7, 14]);
        assert!(sample_indices(0, 3, None).is_empty());
    }

    #[test]
    fn test_hundred_frames_at_interval_seven() {
        let expected: Vec<u64> = vec![0, 7, 14, 21, 28, 35, 42, 49, 56, 63, 70, 77, 84, 91, 98];
        assert_eq!(sample_indices(100, 7, None), expected);
    }

    #[test]
    fn test_sample_indices_match_cadence_predicate() {
        let indices = sample_indices(50, 4, None);
        let expected: Vec<u64> = (0..50).filter(|&k| is_sampled(k, 4)).collect();
        assert_eq!(indices, expected);
        assert_eq!(sample_indices(50, 4, None), indices);
    }
}
