// ============================================================================
// framecurator-core/src/augment/dataset.rs
// ============================================================================
//
// DATASET AUGMENTATION: Directory-Level Driver for the Transform Engine
//
// Walks an input tree for images, pairs each with its sibling YOLO label file
// (or the same relative path under a separate labels directory), and writes
// into the output tree, keeping relative folders:
//
//   <stem>.jpg / <stem>.txt                      the original, re-encoded
//   <stem>_<provenance>.jpg / .txt               one pair per sample
//
// Label files are only written when at least one box remains.
//
// Images are processed in parallel. Each (image, sample) pair draws from its
// own RNG seeded from the run seed, so a fixed seed reproduces the output
// regardless of scheduling.

use crate::augment::annotation::{Annotation, read_yolo_file, write_yolo_file};
use crate::augment::engine::AnnotationTransformEngine;
use crate::config::{CuratorConfig, FrameFormat};
use crate::discovery::find_image_files;
use crate::error::{CoreError, CoreResult};
use crate::persistence::save_rgb_image;
use crate::reporting::{AugmentationStartInfo, Reporter};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Totals for one augmentation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AugmentationSummary {
    pub images_found: usize,
    pub originals_written: usize,
    pub samples_written: usize,
    pub failed_images: usize,
    pub annotations_dropped: usize,
    pub seed: u64,
    pub output_dir: PathBuf,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl AugmentationSummary {
    pub fn total_images(&self) -> usize {
        self.originals_written + self.samples_written
    }
}

#[derive(Debug, Default)]
struct ImageOutcome {
    original: bool,
    samples: usize,
    dropped: usize,
}

/// Derives the seed of one (image, sample) pair from the run seed (splitmix64).
pub fn derive_seed(base: u64, image_index: usize, sample_id: usize) -> u64 {
    let mut z = base
        .wrapping_add((image_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((sample_id as u64).wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Augments every image below `input_dir` into `output_dir`.
///
/// An image whose pixels, labels or outputs cannot be read or written is
/// reported and counted in `failed_images`. Only an annotation invariant
/// violation aborts the run.
pub fn augment_directory(
    input_dir: &Path,
    output_dir: &Path,
    labels_dir: Option<&Path>,
    config: &CuratorConfig,
    reporter: &dyn Reporter,
) -> CoreResult<AugmentationSummary> {
    let start = Instant::now();
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut summary = AugmentationSummary {
        seed,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    };

    if !config.augmentation.enabled {
        log::info!("Augmentation disabled in configuration");
        return Ok(summary);
    }

    let images = find_image_files(input_dir)?;
    summary.images_found = images.len();
    fs::create_dir_all(output_dir)?;

    let per_image = config.augmentation.augmentations_per_image;
    log::info!(
        "Augmenting {} images with {} variants each (seed {})",
        images.len(),
        per_image,
        seed
    );
    reporter.augmentation_started(&AugmentationStartInfo {
        total_images: images.len(),
        augmentations_per_image: per_image,
        output_dir: output_dir.display().to_string(),
    });

    let engine = AnnotationTransformEngine::new(&config.augmentation);
    let job = AugmentJob {
        engine: &engine,
        input_dir,
        output_dir,
        labels_dir,
        per_image,
        seed,
        jpeg_quality: config.output.jpeg_quality,
        reporter,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_lanes.max(1))
        .build()
        .map_err(|e| CoreError::OperationFailed(format!("failed to build augmentation pool: {e}")))?;

    let outcomes = pool.install(|| {
        images
            .par_iter()
            .enumerate()
            .map(|(index, path)| job.run(index, path))
            .collect::<Vec<CoreResult<Option<ImageOutcome>>>>()
    });

    for outcome in outcomes {
        match outcome? {
            Some(outcome) => {
                summary.originals_written += usize::from(outcome.original);
                summary.samples_written += outcome.samples;
                summary.annotations_dropped += outcome.dropped;
            }
            None => summary.failed_images += 1,
        }
    }

    summary.elapsed = start.elapsed();
    log::info!(
        "Augmentation complete: {} originals, {} augmented samples, {} failed images",
        summary.originals_written,
        summary.samples_written,
        summary.failed_images
    );
    reporter.augmentation_complete(&summary);
    Ok(summary)
}

struct AugmentJob<'a> {
    engine: &'a AnnotationTransformEngine,
    input_dir: &'a Path,
    output_dir: &'a Path,
    labels_dir: Option<&'a Path>,
    per_image: usize,
    seed: u64,
    jpeg_quality: u8,
    reporter: &'a dyn Reporter,
}

impl AugmentJob<'_> {
    fn label_path(&self, image_path: &Path, relative: &Path) -> PathBuf {
        match self.labels_dir {
            Some(labels) => labels.join(relative).with_extension("txt"),
            None => image_path.with_extension("txt"),
        }
    }

    /// `Ok(None)` means the image failed and was skipped.
    fn run(&self, index: usize, path: &Path) -> CoreResult<Option<ImageOutcome>> {
        match self.process(index, path) {
            Ok(outcome) => Ok(outcome),
            Err(e @ CoreError::AnnotationInvariant(_)) => Err(e),
            Err(e) => {
                let message = format!("Skipping {}: {}", path.display(), e);
                log::warn!("{message}");
                self.reporter.warning(&message);
                Ok(None)
            }
        }
    }

    fn process(&self, index: usize, path: &Path) -> CoreResult<Option<ImageOutcome>> {
        let relative = path.strip_prefix(self.input_dir).unwrap_or(path);
        let relative_folder = relative.parent().unwrap_or(Path::new(""));
        let target_dir = self.output_dir.join(relative_folder);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::PathError(format!("no file name in {}", path.display())))?;

        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                let message = format!("Failed to read {}: {}", path.display(), e);
                log::warn!("{message}");
                self.reporter.warning(&message);
                return Ok(None);
            }
        };

        let annotations = read_yolo_file(&self.label_path(path, relative), self.engine.classes())?;
        fs::create_dir_all(&target_dir)?;

        let mut outcome = ImageOutcome::default();
        self.write_pair(&target_dir, &stem, &image, &annotations)?;
        outcome.original = true;

        for sample_id in 1..=self.per_image {
            let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, index, sample_id));
            let sample = self.engine.augment(&image, &annotations, sample_id, &mut rng)?;
            if sample.dropped_annotations > 0 {
                log::debug!(
                    "{} {}: {} boxes dropped by clipping",
                    stem,
                    sample.provenance,
                    sample.dropped_annotations
                );
            }
            let name = format!("{}_{}", stem, sample.provenance);
            self.write_pair(&target_dir, &name, &sample.image, &sample.annotations)?;
            outcome.samples += 1;
            outcome.dropped += sample.dropped_annotations;
        }

        self.reporter.image_augmented(&relative.display().to_string());
        Ok(Some(outcome))
    }

    fn write_pair(&self, dir: &Path, name: &str, image: &image::RgbImage, annotations: &[Annotation]) -> CoreResult<()> {
        save_rgb_image(&dir.join(format!("{name}.jpg")), image, FrameFormat::Jpg, self.jpeg_quality)?;
        if !annotations.is_empty() {
            write_yolo_file(&dir.join(format!("{name}.txt")), annotations)?;
        }
        Ok(())
    }
}
