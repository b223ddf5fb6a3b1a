// ============================================================================
// framecurator-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Log file naming and logger installation
//
// The logger itself is the log4rs configuration from framecurator-core; this
// module only decides where the run's log file goes and at which level.
//
// AI-ASSISTANT-INFO: Logging utilities and helper functions

use crate::error::CliResult;
use framecurator_core::CoreError;
use log::LevelFilter;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// let log_filename = format!("framecurator_{}.log", framecurator::logging::get_timestamp());
/// assert!(log_filename.ends_with(".log"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Path of the log file for a run started now.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("framecurator_{}.log", get_timestamp()))
}

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::Debug } else { LevelFilter::Info }
}

/// Installs console and file logging for the run. Returns the log file path.
pub fn init_logging(log_dir: &Path, verbose: bool) -> CliResult<PathBuf> {
    let log_path = log_file_path(log_dir);
    framecurator_core::logging::setup_logging(Some(&log_path), level_for(verbose))
        .map_err(|e| CoreError::OperationFailed(format!("Failed to initialize logging: {e}")))?;
    Ok(log_path)
}
