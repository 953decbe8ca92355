//! Command entry points
//!
//! Each command is an independent procedure over one invocation:
//! - `compile`: walk, map, transform, write
//! - `watch`: recompile single files on change until shut down
//! - `clean`: delete generated files that still have a source sibling
//!
//! Batch commands attempt every file and collect a [`FileOutcome`] for each;
//! a failed file never stops the rest of the batch.

pub mod clean;
pub mod compile;
pub mod watch;

pub use clean::{clean, stale_outputs};
pub use compile::Pipeline;
pub use watch::{WatchSession, WatchSummary, WatchTarget};

use crate::config::RunConfig;
use crate::error::{FileError, FileOutcome, Result, TeacError};
use crate::walker::{StatPolicy, WalkOptions};
use std::time::Duration;

/// Outcomes of a batch command
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub duration: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.total() - self.failed()
    }

    /// Bytes written by compiled files
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                FileOutcome::Compiled { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileError> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Failed { error } => Some(error),
            _ => None,
        })
    }

    /// Error if any file of the batch failed
    pub fn ensure_success(&self) -> Result<()> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(TeacError::BatchFailed {
                failed,
                total: self.total(),
            }),
        }
    }
}

/// Walk options for batch commands
///
/// Entries that cannot be stat'd are skipped: a file that vanished mid-walk
/// is not worth a read or delete attempt.
pub(crate) fn walk_options(config: &RunConfig) -> WalkOptions {
    WalkOptions {
        stat_policy: StatPolicy::Skip,
        max_depth: config.max_depth,
        exclude_patterns: config.exclude_patterns.clone(),
    }
}
