//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

use crate::error::{CliErrorContext, CliResult};
use framecurator_core::config::CuratorConfig;
use framecurator_core::reporting::{JsonReporter, Reporter, TerminalReporter};
use std::path::Path;

/// The `augment` command: annotation-aware dataset augmentation.
pub mod augment;
/// The `extract` command: adaptive frame sampling with quality and duplicate filtering.
pub mod extract;

/// Loads the configuration file when given, otherwise the defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<CuratorConfig> {
    match path {
        Some(path) => CuratorConfig::from_file(path)
            .cli_with_context(|| format!("Failed to load configuration '{}'", path.display())),
        None => Ok(CuratorConfig::default()),
    }
}

/// Picks the reporter for the run.
pub fn make_reporter(json: bool) -> Box<dyn Reporter> {
    if json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(TerminalReporter::new())
    }
}
