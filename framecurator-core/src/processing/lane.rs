// ============================================================================
// framecurator-core/src/processing/lane.rs
// ============================================================================
//
// LANE: Sequential Per-Video Curation Pipeline
//
// A lane owns everything that is per-video: the frame source, the metric
// plane of the previous decoded candidate (for motion) and the DedupState.
// Nothing in here is shared with other lanes except the read-only scorer,
// dedup filter, sink and reporter.
//
//   decode -> cadence check -> quality score -> dedup -> persist
//
// Asset errors skip the lane; decode errors skip one index; write errors
// drop one record. None of them abort the batch.

use crate::error::CoreError;
use crate::media::{DecodedFrame, FrameCandidate, VideoAsset, VideoOpener};
use crate::persistence::{FrameRecord, FrameSink};
use crate::processing::dedup::{DedupDecision, DedupFilter, DedupState};
use crate::processing::quality::{QualityScorer, RejectReason};
use crate::processing::sampler::is_sampled;
use crate::reporting::Reporter;

use image::GrayImage;
use serde::Serialize;
use std::time::{Duration, Instant};

// ============================================================================
// SUMMARIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LaneStatus {
    Completed,
    Skipped { reason: String },
}

/// Rejection counts by attributable cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub brightness: usize,
    pub sharpness: usize,
    pub motion: usize,
    pub duplicates: usize,
}

impl RejectionCounts {
    fn record(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::Brightness => self.brightness += 1,
            RejectReason::Sharpness => self.sharpness += 1,
            RejectReason::Motion => self.motion += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.brightness + self.sharpness + self.motion + self.duplicates
    }

    fn merge(&mut self, other: &RejectionCounts) {
        self.brightness += other.brightness;
        self.sharpness += other.sharpness;
        self.motion += other.motion;
        self.duplicates += other.duplicates;
    }
}

/// Outcome of one video's lane.
#[derive(Debug, Clone, Serialize)]
pub struct LaneSummary {
    pub video_id: String,
    pub interval: u64,
    #[serde(flatten)]
    pub status: LaneStatus,
    /// Sampled indices visited, corrupt ones included
    pub candidates: usize,
    pub corrupt_frames: usize,
    pub rejections: RejectionCounts,
    pub write_failures: usize,
    pub records: Vec<FrameRecord>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl LaneSummary {
    fn new(asset: &VideoAsset, interval: u64) -> Self {
        Self {
            video_id: asset.id.clone(),
            interval,
            status: LaneStatus::Completed,
            candidates: 0,
            corrupt_frames: 0,
            rejections: RejectionCounts::default(),
            write_failures: 0,
            records: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, LaneStatus::Skipped { .. })
    }
}

/// Outcome of a whole sampling run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub interval: u64,
    pub lanes: Vec<LaneSummary>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn total_videos(&self) -> usize {
        self.lanes.len()
    }

    pub fn completed_videos(&self) -> usize {
        self.lanes.iter().filter(|l| !l.is_skipped()).count()
    }

    pub fn skipped_videos(&self) -> usize {
        self.total_videos() - self.completed_videos()
    }

    pub fn total_candidates(&self) -> usize {
        self.lanes.iter().map(|l| l.candidates).sum()
    }

    pub fn total_accepted(&self) -> usize {
        self.lanes.iter().map(LaneSummary::accepted).sum()
    }

    pub fn rejections(&self) -> RejectionCounts {
        let mut counts = RejectionCounts::default();
        for lane in &self.lanes {
            counts.merge(&lane.rejections);
        }
        counts
    }
}

// ============================================================================
// LANE EXECUTION
// ============================================================================

/// Shared, read-only collaborators of every lane in a batch.
pub(crate) struct LaneContext<'a> {
    pub scorer: &'a QualityScorer,
    pub dedup: &'a DedupFilter,
    pub opener: &'a dyn VideoOpener,
    pub sink: &'a dyn FrameSink,
    pub reporter: &'a dyn Reporter,
    pub interval: u64,
    pub cap: Option<usize>,
}

pub(crate) fn run_lane(ctx: &LaneContext<'_>, asset: &VideoAsset) -> LaneSummary {
    let start = Instant::now();
    let mut summary = LaneSummary::new(asset, ctx.interval);
    ctx.reporter.lane_started(&asset.id, ctx.interval);

    if let Some(reason) = &asset.probe_error {
        let error = CoreError::AssetOpen {
            id: asset.id.clone(),
            reason: format!("probe failed: {reason}"),
        };
        return skip_lane(ctx, summary, start, error);
    }

    let mut source = match ctx.opener.open(asset) {
        Ok(source) => source,
        Err(e) => return skip_lane(ctx, summary, start, e),
    };

    let mut previous: Option<GrayImage> = None;
    let mut dedup_state = DedupState::new();

    while let Some(decoded) = source.next_frame() {
        let index = decoded.index();
        if asset.frame_count > 0 && index >= asset.frame_count {
            break;
        }
        if !is_sampled(index, ctx.interval) {
            continue;
        }
        if ctx.cap.is_some_and(|cap| summary.candidates >= cap) {
            break;
        }
        summary.candidates += 1;

        let image = match decoded {
            DecodedFrame::Frame { image, .. } => image,
            DecodedFrame::Corrupt { reason, .. } => {
                let error = CoreError::FrameDecode {
                    id: asset.id.clone(),
                    index,
                    reason,
                };
                let message = format!("Skipping frame: {error}");
                log::warn!("{message}");
                ctx.reporter.warning(&message);
                summary.corrupt_frames += 1;
                continue;
            }
        };

        let candidate = FrameCandidate {
            video_id: asset.id.clone(),
            index,
            timestamp: asset.timestamp_for(index),
            image,
        };

        let (verdict, plane) = ctx.scorer.score_frame(&candidate.image, previous.as_ref());
        if let Some(reason) = verdict.rejection {
            log::debug!(
                "Frame {} of '{}' rejected for {} ({:?})",
                index,
                asset.id,
                reason,
                verdict.score
            );
            summary.rejections.record(reason);
            previous = Some(plane);
            continue;
        }

        let (decision, next_state) = ctx.dedup.filter(dedup_state, &plane);
        dedup_state = next_state;
        previous = Some(plane);

        let similarity = match decision {
            DedupDecision::Rejected { similarity } => {
                log::debug!(
                    "Frame {} of '{}' rejected as near-duplicate (similarity {:.3})",
                    index,
                    asset.id,
                    similarity
                );
                summary.rejections.duplicates += 1;
                continue;
            }
            DedupDecision::Accepted { similarity } => similarity,
        };

        match ctx
            .sink
            .persist(asset, ctx.interval, &candidate, &verdict.score, similarity)
        {
            Ok(record) => summary.records.push(record),
            Err(e) => {
                let message = format!("Failed to write frame {} of '{}': {}", index, asset.id, e);
                log::warn!("{message}");
                ctx.reporter.warning(&message);
                summary.write_failures += 1;
            }
        }
    }

    if let Some(reason) = source.failure() {
        let error = CoreError::AssetOpen {
            id: asset.id.clone(),
            reason,
        };
        return skip_lane(ctx, summary, start, error);
    }

    if let Err(e) = ctx.sink.finish(asset, ctx.interval, &summary.records) {
        let message = format!("Failed to write metadata for '{}': {}", asset.id, e);
        log::warn!("{message}");
        ctx.reporter.warning(&message);
    }

    summary.elapsed = start.elapsed();
    log::info!(
        "{}: {} of {} candidates accepted ({} rejected, {} corrupt) in {:.1}s",
        asset.id,
        summary.accepted(),
        summary.candidates,
        summary.rejections.total(),
        summary.corrupt_frames,
        summary.elapsed.as_secs_f64()
    );
    ctx.reporter.lane_complete(&summary);
    summary
}

fn skip_lane(ctx: &LaneContext<'_>, mut summary: LaneSummary, start: Instant, error: CoreError) -> LaneSummary {
    let message = format!("Skipping video '{}': {}", summary.video_id, error);
    log::warn!("{message}");
    ctx.reporter.warning(&message);
    summary.status = LaneStatus::Skipped {
        reason: error.to_string(),
    };
    summary.elapsed = start.elapsed();
    ctx.reporter.lane_complete(&summary);
    summary
}
