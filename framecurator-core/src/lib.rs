//! Core library for curating object-detection training frames from video.
//!
//! This crate samples frames from video collections at an adaptive cadence,
//! filters them for brightness, sharpness and motion, suppresses
//! near-duplicates, and synthesizes annotation-consistent augmented variants
//! of labelled images.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use framecurator_core::config::CuratorConfigBuilder;
//! use framecurator_core::media::FfmpegOpener;
//! use framecurator_core::persistence::DirectoryFrameSink;
//! use framecurator_core::processing::AdaptiveFrameSampler;
//! use framecurator_core::reporting::NullReporter;
//! use std::path::Path;
//!
//! let config = CuratorConfigBuilder::new().intervals(3, 7).seed(42).build();
//! config.validate().unwrap();
//!
//! let videos = framecurator_core::find_video_files(Path::new("/data/raw_videos"), false).unwrap();
//! let sampler = AdaptiveFrameSampler::new(&config, &FfmpegOpener, &NullReporter);
//! let assets = sampler.load_assets(&videos);
//! let sink = DirectoryFrameSink::new("/data/frames", &config.output);
//! let summary = sampler.run_batch(&assets, &sink, "/data/frames").unwrap();
//! println!("kept {} frames", summary.total_accepted());
//! ```

pub mod augment;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod media;
pub mod persistence;
pub mod processing;
pub mod reporting;

// Re-exports for public API
pub use augment::{
    AnnotationTransformEngine, Annotation, AugmentationSummary, ClassSet, TransformSpec,
    augment_directory,
};
pub use config::{CuratorConfig, CuratorConfigBuilder};
pub use discovery::{find_image_files, find_image_sequence_dirs, find_video_files};
pub use error::{CoreError, CoreResult};
pub use media::{FfmpegOpener, FrameSource, ImageSequenceOpener, VideoAsset, VideoOpener};
pub use persistence::{DirectoryFrameSink, FrameRecord, FrameSink};
pub use processing::{AdaptiveFrameSampler, BatchSummary, DedupFilter, LaneSummary, QualityScorer};
pub use reporting::{JsonReporter, NullReporter, Reporter, TerminalReporter};
