//! Implementation of the 'augment' subcommand.

use crate::cli::AugmentArgs;
use crate::commands::extract::RUN_CONFIG_FILE;
use crate::commands::load_config;
use crate::error::{CliErrorContext, CliResult};

use framecurator_core::augment::{AugmentationSummary, augment_directory};
use framecurator_core::config::{CuratorConfig, RotationBoxMode};
use framecurator_core::reporting::Reporter;
use framecurator_core::CoreError;

use log::info;

/// Applies the command-line overrides and validates the result.
pub fn build_augment_config(args: &AugmentArgs) -> CliResult<CuratorConfig> {
    let mut config = load_config(args.config.as_deref())?;
    let augmentation = &mut config.augmentation;

    if let Some(count) = args.count {
        augmentation.augmentations_per_image = count;
    }
    if args.affine_rotation {
        augmentation.rotation_bbox_mode = RotationBoxMode::Affine;
    }
    if let Some(classes) = &args.classes {
        augmentation.classes = classes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(jobs) = args.jobs {
        config.parallel_lanes = jobs;
    }

    config.validate()?;
    Ok(config)
}

/// Runs the augmentation and records the configuration, including the seed
/// actually used, next to the output.
pub fn run_augment(args: AugmentArgs, reporter: &dyn Reporter) -> CliResult<AugmentationSummary> {
    let mut config = build_augment_config(&args)?;

    if !args.input_dir.is_dir() {
        return Err(CoreError::PathError(format!(
            "Input path '{}' is not a directory",
            args.input_dir.display()
        )));
    }
    if let Some(labels) = &args.labels_dir {
        if !labels.is_dir() {
            return Err(CoreError::PathError(format!(
                "Labels path '{}' is not a directory",
                labels.display()
            )));
        }
    }

    info!("Input directory: {}", args.input_dir.display());
    info!("Output directory: {}", args.output_dir.display());

    let summary = augment_directory(
        &args.input_dir,
        &args.output_dir,
        args.labels_dir.as_deref(),
        &config,
        reporter,
    )?;

    config.seed = Some(summary.seed);
    config
        .save_to_file(&args.output_dir.join(RUN_CONFIG_FILE))
        .cli_context("Failed to record run configuration")?;
    info!("Seed {} recorded in {}", summary.seed, RUN_CONFIG_FILE);
    Ok(summary)
}
