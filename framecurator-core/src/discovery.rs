//! File discovery module for finding videos and images to process.
//!
//! Extension matching is case-insensitive. Results are sorted so that lane
//! order, and with it batch summaries and augmentation seeds, do not depend
//! on directory iteration order.

use crate::error::{CoreError, CoreResult};

use std::fs;
use std::path::{Path, PathBuf};

/// Container extensions accepted as video input.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// Image extensions accepted as dataset input.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

pub fn is_video_file(path: &Path) -> bool {
    path.is_file() && has_extension(path, &VIDEO_EXTENSIONS)
}

pub fn is_image_file(path: &Path) -> bool {
    path.is_file() && has_extension(path, &IMAGE_EXTENSIONS)
}

fn collect_files(dir: &Path, recursive: bool, accept: fn(&Path) -> bool, out: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, accept, out)?;
            }
        } else if accept(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Finds video files in `input_dir`, descending into subdirectories when
/// `recursive` is set.
///
/// # Examples
///
/// ```rust,no_run
/// use framecurator_core::discovery::find_video_files;
/// use std::path::Path;
///
/// match find_video_files(Path::new("/data/raw_videos"), false) {
///     Ok(files) => println!("Found {} videos", files.len()),
///     Err(e) => println!("Error finding videos: {}", e),
/// }
/// ```
pub fn find_video_files(input_dir: &Path, recursive: bool) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(input_dir, recursive, is_video_file, &mut files)?;
    if files.is_empty() {
        return Err(CoreError::NoFilesFound(input_dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Finds image files anywhere below `input_dir`.
pub fn find_image_files(input_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(input_dir, true, is_image_file, &mut files)?;
    if files.is_empty() {
        return Err(CoreError::NoFilesFound(input_dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Image files directly inside `dir`, unsorted. An empty result is not an error.
pub fn find_image_files_flat(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, false, is_image_file, &mut files)?;
    Ok(files)
}

/// Subdirectories of `input_dir` that hold at least one image; each one is
/// treated as a pre-decoded video.
pub fn find_image_sequence_dirs(input_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_dir() && !find_image_files_flat(&path)?.is_empty() {
            dirs.push(path);
        }
    }
    if dirs.is_empty() {
        return Err(CoreError::NoFilesFound(input_dir.to_path_buf()));
    }
    dirs.sort();
    Ok(dirs)
}
