// framecurator-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use framecurator_core::config::{FrameFormat, SimilarityMeasureChoice};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "FrameCurator: training-frame curation for object detection",
    long_about = "Samples quality-filtered, de-duplicated frames from video collections and \
                  synthesizes annotation-consistent augmented variants of labelled images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emit newline-delimited JSON progress events instead of the terminal display
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Samples training frames from a directory of videos
    Extract(ExtractArgs),
    /// Writes augmented variants of annotated images
    Augment(AugmentArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureArg {
    Auto,
    Structural,
    Difference,
}

impl From<MeasureArg> for SimilarityMeasureChoice {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Auto => SimilarityMeasureChoice::Auto,
            MeasureArg::Structural => SimilarityMeasureChoice::Structural,
            MeasureArg::Difference => SimilarityMeasureChoice::Difference,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Jpg,
    Png,
}

impl From<FormatArg> for FrameFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpg => FrameFormat::Jpg,
            FormatArg::Png => FrameFormat::Png,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Directory containing the videos (or image-sequence folders)
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory where accepted frames will be saved
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Optional: Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Optional: JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "CONFIG_FILE", env = "FRAMECURATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Search the input directory recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Treat each sub-directory of images as one video
    #[arg(long, default_value_t = false)]
    pub image_sequences: bool,

    /// Frame rate assumed for image sequences
    #[arg(long, value_name = "FPS", default_value_t = 30.0)]
    pub sequence_fps: f64,

    // --- Sampling Overrides ---
    /// Interval used for collections up to the threshold
    #[arg(long, value_name = "FRAMES")]
    pub small_interval: Option<u64>,

    /// Interval used for collections above the threshold
    #[arg(long, value_name = "FRAMES")]
    pub large_interval: Option<u64>,

    /// Number of videos above which the large interval applies
    #[arg(long, value_name = "COUNT")]
    pub threshold_videos: Option<usize>,

    /// Maximum candidates per video
    #[arg(long, value_name = "COUNT")]
    pub max_frames: Option<usize>,

    // --- Filter Overrides ---
    /// Disable brightness, sharpness and motion checks
    #[arg(long, default_value_t = false)]
    pub no_quality_filter: bool,

    /// Disable the motion check only
    #[arg(long, default_value_t = false)]
    pub no_motion: bool,

    /// Keep near-duplicate frames
    #[arg(long, default_value_t = false)]
    pub keep_similar: bool,

    /// Similarity at or above which a frame counts as a duplicate (0-1]
    #[arg(long, value_name = "SCORE")]
    pub similarity_threshold: Option<f64>,

    /// Similarity measure used for deduplication
    #[arg(long, value_enum, value_name = "MEASURE")]
    pub similarity_measure: Option<MeasureArg>,

    // --- Output Overrides ---
    /// Image format for saved frames
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Write all frames into OUTPUT_DIR instead of one folder per video
    #[arg(long, default_value_t = false)]
    pub flat: bool,

    /// Number of videos processed in parallel
    #[arg(short, long, value_name = "LANES")]
    pub jobs: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct AugmentArgs {
    /// Directory containing the images and their YOLO label files
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory where originals and augmented samples will be saved
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Optional: Separate directory holding the label files, mirroring INPUT_DIR
    #[arg(long, value_name = "LABELS_DIR")]
    pub labels_dir: Option<PathBuf>,

    /// Optional: Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Optional: JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "CONFIG_FILE", env = "FRAMECURATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Augmented samples per image
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub count: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Rotate box corners and take the hull instead of keeping boxes unchanged
    #[arg(long, default_value_t = false)]
    pub affine_rotation: bool,

    /// Comma-separated class names, in class-id order (e.g., ball,player,hoop)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub classes: Option<Vec<String>>,

    /// Number of images processed in parallel
    #[arg(short, long, value_name = "THREADS")]
    pub jobs: Option<usize>,
}
