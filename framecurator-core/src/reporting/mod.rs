//! Progress and outcome reporting.
//!
//! The curation and augmentation drivers report through the `Reporter`
//! trait. Lanes call it concurrently, so implementations synchronize
//! internally.

use crate::augment::AugmentationSummary;
use crate::processing::{BatchSummary, LaneStatus, LaneSummary};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Batch start metadata.
#[derive(Clone, Debug)]
pub struct BatchStartInfo {
    pub total_videos: usize,
    pub interval: u64,
    pub parallel_lanes: usize,
    pub output_dir: String,
    pub video_ids: Vec<String>,
}

/// Augmentation start metadata.
#[derive(Clone, Debug)]
pub struct AugmentationStartInfo {
    pub total_images: usize,
    pub augmentations_per_image: usize,
    pub output_dir: String,
}

/// Reporter interface implemented by both human-readable and JSON reporters.
pub trait Reporter: Send + Sync {
    fn batch_started(&self, _info: &BatchStartInfo) {}
    fn lane_started(&self, _video_id: &str, _interval: u64) {}
    fn lane_complete(&self, _summary: &LaneSummary) {}
    fn warning(&self, _message: &str) {}
    fn batch_complete(&self, _summary: &BatchSummary) {}
    fn augmentation_started(&self, _info: &AugmentationStartInfo) {}
    fn image_augmented(&self, _relative_path: &str) {}
    fn augmentation_complete(&self, _summary: &AugmentationSummary) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Human-friendly reporter: section headers plus a progress bar.
pub struct TerminalReporter {
    progress: Mutex<Option<ProgressBar>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
        }
    }

    fn start_progress(&self, total: u64, label: &str) {
        self.finish_progress();
        let pb = ProgressBar::new(total);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template(&format!("{label} [{{bar:40}}] {{pos}}/{{len}} | {{msg}}"))
        {
            pb.set_style(bar_style.progress_chars("=> "));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }

    fn advance(&self, message: &str) {
        if let Ok(guard) = self.progress.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
                pb.inc(1);
            }
        }
    }

    fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Prints above the progress bar when one is active.
    fn print_line(&self, line: String) {
        match self.progress.lock() {
            Ok(guard) if guard.is_some() => {
                if let Some(pb) = guard.as_ref() {
                    pb.println(line);
                }
            }
            _ => println!("{line}"),
        }
    }
}

impl Reporter for TerminalReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        println!("\n{}", style("EXTRACTION").bold().cyan());
        println!(
            "  Sampling {} videos every {} frames on {} lanes -> {}",
            info.total_videos,
            style(info.interval).bold(),
            info.parallel_lanes,
            style(&info.output_dir).bold()
        );
        for (idx, id) in info.video_ids.iter().enumerate() {
            println!("  {}. {}", idx + 1, id);
        }
        self.start_progress(info.total_videos as u64, "Videos");
    }

    fn lane_complete(&self, summary: &LaneSummary) {
        let status = match &summary.status {
            LaneStatus::Completed => style(format!(
                "{} of {} frames kept",
                summary.accepted(),
                summary.candidates
            ))
            .green()
            .to_string(),
            LaneStatus::Skipped { .. } => style("skipped").yellow().to_string(),
        };
        self.print_line(format!("  {} {} ({})", style("›").magenta(), summary.video_id, status));
        self.advance(&summary.video_id);
    }

    fn warning(&self, message: &str) {
        self.print_line(format!("{}", style(format!("WARN: {message}")).yellow().bold()));
    }

    fn batch_complete(&self, summary: &BatchSummary) {
        self.finish_progress();
        let rejections = summary.rejections();
        println!("\n{}", style("EXTRACTION SUMMARY").bold().cyan());
        println!(
            "  {}",
            style(format!(
                "{} of {} videos processed",
                summary.completed_videos(),
                summary.total_videos()
            ))
            .bold()
        );
        println!(
            "  Frames: {} kept of {} sampled",
            style(summary.total_accepted()).green().bold(),
            summary.total_candidates()
        );
        println!(
            "  Rejected: {} brightness, {} sharpness, {} motion, {} near-duplicate",
            rejections.brightness, rejections.sharpness, rejections.motion, rejections.duplicates
        );
        println!("  Time: {}", format_duration(&summary.elapsed));
    }

    fn augmentation_started(&self, info: &AugmentationStartInfo) {
        println!("\n{}", style("AUGMENTATION").bold().cyan());
        println!(
            "  {} images x {} variants -> {}",
            info.total_images,
            info.augmentations_per_image,
            style(&info.output_dir).bold()
        );
        self.start_progress(info.total_images as u64, "Images");
    }

    fn image_augmented(&self, relative_path: &str) {
        self.advance(relative_path);
    }

    fn augmentation_complete(&self, summary: &AugmentationSummary) {
        self.finish_progress();
        println!("\n{}", style("AUGMENTATION SUMMARY").bold().cyan());
        println!("  Original images: {}", summary.originals_written);
        println!("  Augmented images: {}", style(summary.samples_written).green().bold());
        println!("  Total dataset size: {}", summary.total_images());
        if summary.failed_images > 0 {
            println!("  Failed images: {}", style(summary.failed_images).red());
        }
        println!("  Boxes dropped by clipping: {}", summary.annotations_dropped);
        println!("  Seed: {}", summary.seed);
        println!("  Time: {}", format_duration(&summary.elapsed));
    }
}

/// Newline-delimited JSON reporter for machine consumers.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_value(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", value);
            let _ = writer.flush();
        }
    }
}

impl Reporter for JsonReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.write_value(json!({
            "type": "batch_started",
            "total_videos": info.total_videos,
            "interval": info.interval,
            "parallel_lanes": info.parallel_lanes,
            "output_dir": info.output_dir,
            "videos": info.video_ids,
            "timestamp": Self::timestamp(),
        }));
    }

    fn lane_started(&self, video_id: &str, interval: u64) {
        self.write_value(json!({
            "type": "lane_started",
            "video_id": video_id,
            "interval": interval,
            "timestamp": Self::timestamp(),
        }));
    }

    fn lane_complete(&self, summary: &LaneSummary) {
        let (status, reason) = match &summary.status {
            LaneStatus::Completed => ("completed", None),
            LaneStatus::Skipped { reason } => ("skipped", Some(reason.as_str())),
        };
        self.write_value(json!({
            "type": "lane_complete",
            "video_id": summary.video_id,
            "status": status,
            "reason": reason,
            "candidates": summary.candidates,
            "accepted": summary.accepted(),
            "corrupt_frames": summary.corrupt_frames,
            "rejections": summary.rejections,
            "write_failures": summary.write_failures,
            "duration_seconds": summary.elapsed.as_secs_f64(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn batch_complete(&self, summary: &BatchSummary) {
        self.write_value(json!({
            "type": "batch_complete",
            "total_videos": summary.total_videos(),
            "completed_videos": summary.completed_videos(),
            "skipped_videos": summary.skipped_videos(),
            "total_candidates": summary.total_candidates(),
            "total_accepted": summary.total_accepted(),
            "rejections": summary.rejections(),
            "duration_seconds": summary.elapsed.as_secs_f64(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn augmentation_started(&self, info: &AugmentationStartInfo) {
        self.write_value(json!({
            "type": "augmentation_started",
            "total_images": info.total_images,
            "augmentations_per_image": info.augmentations_per_image,
            "output_dir": info.output_dir,
            "timestamp": Self::timestamp(),
        }));
    }

    fn augmentation_complete(&self, summary: &AugmentationSummary) {
        self.write_value(json!({
            "type": "augmentation_complete",
            "original_count": summary.originals_written,
            "augmented_count": summary.samples_written,
            "total_count": summary.total_images(),
            "failed_images": summary.failed_images,
            "annotations_dropped": summary.annotations_dropped,
            "seed": summary.seed,
            "output_dir": summary.output_dir,
            "duration_seconds": summary.elapsed.as_secs_f64(),
            "timestamp": Self::timestamp(),
        }));
    }
}

fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
