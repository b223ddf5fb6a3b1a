//! Implementation of the 'extract' subcommand.
//!
//! Discovers videos (or image-sequence folders), builds the run
//! configuration from the optional config file plus flag overrides, and
//! hands the collection to the core sampler.

use crate::cli::ExtractArgs;
use crate::commands::load_config;
use crate::error::{CliErrorContext, CliResult};

use framecurator_core::config::CuratorConfig;
use framecurator_core::discovery::{find_image_sequence_dirs, find_video_files};
use framecurator_core::media::{FfmpegOpener, ImageSequenceOpener, VideoOpener};
use framecurator_core::persistence::DirectoryFrameSink;
use framecurator_core::processing::{AdaptiveFrameSampler, BatchSummary};
use framecurator_core::reporting::Reporter;
use framecurator_core::CoreError;

use log::{info, warn};
use std::fs;
use std::path::PathBuf;

/// File written next to the frames with the configuration the run used.
pub const RUN_CONFIG_FILE: &str = "framecurator_config.json";

/// Applies the command-line overrides on top of the loaded configuration
/// and validates the result.
pub fn build_extract_config(args: &ExtractArgs) -> CliResult<CuratorConfig> {
    let mut config = load_config(args.config.as_deref())?;

    let sampling = &mut config.sampling;
    if let Some(small) = args.small_interval {
        sampling.small_interval = small;
    }
    if let Some(large) = args.large_interval {
        sampling.large_interval = large;
    }
    if let Some(threshold) = args.threshold_videos {
        sampling.threshold_videos = threshold;
    }
    if args.max_frames.is_some() {
        sampling.max_frames_per_video = args.max_frames;
    }

    if args.no_quality_filter {
        config.quality.enabled = false;
    }
    if args.no_motion {
        config.quality.detect_motion = false;
    }
    if args.keep_similar {
        config.dedup.skip_similar = false;
    }
    if let Some(threshold) = args.similarity_threshold {
        config.dedup.similarity_threshold = threshold;
    }
    if let Some(measure) = args.similarity_measure {
        config.dedup.similarity_measure = measure.into();
    }

    if let Some(format) = args.format {
        config.output.frame_format = format.into();
    }
    if args.flat {
        config.output.organize_by_video = false;
    }
    if let Some(jobs) = args.jobs {
        config.parallel_lanes = jobs;
    }

    config.validate()?;
    Ok(config)
}

/// Finds the inputs to sample. An input directory without any matching
/// entries is not an error; the run simply has nothing to do.
pub fn discover_inputs(args: &ExtractArgs) -> CliResult<Vec<PathBuf>> {
    if !args.input_dir.is_dir() {
        return Err(CoreError::PathError(format!(
            "Input path '{}' is not a directory",
            args.input_dir.display()
        )));
    }

    let found = if args.image_sequences {
        find_image_sequence_dirs(&args.input_dir)
    } else {
        find_video_files(&args.input_dir, args.recursive)
    };

    match found {
        Ok(inputs) => Ok(inputs),
        Err(CoreError::NoFilesFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Runs the extraction. Returns `None` when there was nothing to process.
pub fn run_extract(args: ExtractArgs, reporter: &dyn Reporter) -> CliResult<Option<BatchSummary>> {
    let config = build_extract_config(&args)?;
    let inputs = discover_inputs(&args)?;

    if inputs.is_empty() {
        warn!("No videos found in {}", args.input_dir.display());
        return Ok(None);
    }

    fs::create_dir_all(&args.output_dir).cli_with_context(|| {
        format!("Failed to create output directory '{}'", args.output_dir.display())
    })?;
    config
        .save_to_file(&args.output_dir.join(RUN_CONFIG_FILE))
        .cli_context("Failed to record run configuration")?;

    let opener: Box<dyn VideoOpener> = if args.image_sequences {
        Box::new(ImageSequenceOpener::new(args.sequence_fps))
    } else {
        Box::new(FfmpegOpener)
    };

    info!("Input directory: {}", args.input_dir.display());
    info!("Output directory: {}", args.output_dir.display());
    info!("Found {} inputs", inputs.len());

    let sampler = AdaptiveFrameSampler::new(&config, opener.as_ref(), reporter);
    let assets = sampler.load_assets(&inputs);
    let sink = DirectoryFrameSink::new(&args.output_dir, &config.output);
    let summary = sampler.run_batch(&assets, &sink, &args.output_dir.display().to_string())?;

    if summary.skipped_videos() > 0 {
        warn!(
            "{} of {} videos could not be processed",
            summary.skipped_videos(),
            summary.total_videos()
        );
    }
    Ok(Some(summary))
}
