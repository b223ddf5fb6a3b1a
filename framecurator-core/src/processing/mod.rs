// ============================================================================
// framecurator-core/src/processing/mod.rs
// ============================================================================
//
// FRAME CURATION: Sampling, Quality Scoring and Deduplication
//
// This module turns a collection of videos into a set of usable training
// frames. Each video runs in its own lane:
//
// 1. AdaptiveFrameSampler picks the cadence once for the whole collection
// 2. QualityScorer rejects dark/overexposed, blurred and static frames
// 3. DedupFilter rejects near-duplicates of the lane's last accepted frame
// 4. Accepted frames go to a FrameSink
//
// AI-ASSISTANT-INFO: Frame curation pipeline (sampler, quality, dedup)

pub mod dedup;
pub mod lane;
pub mod quality;
pub mod sampler;
pub mod similarity;

pub use dedup::{DedupDecision, DedupFilter, DedupState};
pub use lane::{BatchSummary, LaneStatus, LaneSummary, RejectionCounts};
pub use quality::{QualityScore, QualityScorer, QualityVerdict, RejectReason};
pub use sampler::{AdaptiveFrameSampler, is_sampled, resolve_interval, sample_indices};
pub use similarity::{DifferenceSimilarity, SimilarityMeasure, select_measure};

#[cfg(feature = "structural-similarity")]
pub use similarity::StructuralSimilarity;
