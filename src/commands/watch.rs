//! Watch command
//!
//! Subscribes to file system notifications and recompiles one file per
//! change. The session runs until its shutdown flag is set; dropping the
//! underlying watcher unsubscribes.
//!
//! ```text
//! notify thread ──► mpsc ──► debounce (50ms) ──► resolve ──► compile_file
//! ```

use super::compile::Pipeline;
use crate::error::{FileOutcome, PathError, Result};
use crate::paths::{map_path, sibling_target};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How often the shutdown flag is checked while idle
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events closer together than this are handled as one batch
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// What is being watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// Recompile changed sources into the mirrored output tree
    Directory { root: PathBuf, output_root: PathBuf },

    /// Recompile one source into one output
    File { source: PathBuf, output: PathBuf },
}

/// Totals of a finished watch session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub recompiled: u64,
    pub failed: u64,
}

/// A cancellable watch subscription
pub struct WatchSession {
    pipeline: Pipeline,
    target: WatchTarget,
    shutdown: Arc<AtomicBool>,
}

impl WatchSession {
    /// Resolve `input` into a watch target. The input must exist.
    ///
    /// The input is canonicalized so notification paths can be matched
    /// against it. The output defaults to in place.
    pub async fn new(pipeline: Pipeline, input: &Path, output: Option<&Path>) -> Result<Self> {
        let not_found = || PathError::NotFound {
            path: input.to_path_buf(),
        };
        let meta = tokio::fs::metadata(input).await.map_err(|_| not_found())?;
        let canonical = tokio::fs::canonicalize(input)
            .await
            .map_err(|_| not_found())?;

        let target = if meta.is_dir() {
            WatchTarget::Directory {
                output_root: output.map_or_else(|| canonical.clone(), Path::to_path_buf),
                root: canonical,
            }
        } else if meta.is_file() {
            WatchTarget::File {
                output: output.map_or_else(
                    || sibling_target(&canonical, pipeline.dialect()),
                    Path::to_path_buf,
                ),
                source: canonical,
            }
        } else {
            return Err(PathError::NotFileOrDirectory {
                path: input.to_path_buf(),
            }
            .into());
        };

        Ok(Self {
            pipeline,
            target,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Setting this flag ends [`WatchSession::run`]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Source and output for a changed path, or `None` if it is ignored.
    ///
    /// Generated files are always ignored so the session never reacts to
    /// its own output.
    pub fn resolve(&self, changed: &Path) -> Option<(PathBuf, PathBuf)> {
        let dialect = self.pipeline.dialect();
        if dialect.is_target(changed) {
            return None;
        }

        match &self.target {
            WatchTarget::File { source, output } => {
                (changed == source.as_path()).then(|| (source.clone(), output.clone()))
            }
            WatchTarget::Directory { root, output_root } => {
                if !dialect.is_source(changed)
                    || self.pipeline.config().is_excluded(&changed.to_string_lossy())
                {
                    return None;
                }
                match map_path(changed, root, output_root, dialect) {
                    Ok(output) => Some((changed.to_path_buf(), output)),
                    Err(e) => {
                        debug!(error = %e, "Ignoring change outside watched root");
                        None
                    }
                }
            }
        }
    }

    /// Distinct (source, output) pairs of a batch of events, in arrival order
    fn collect_changes(&self, events: Vec<notify::Result<Event>>) -> Vec<(PathBuf, PathBuf)> {
        let mut changes: Vec<(PathBuf, PathBuf)> = Vec::new();

        for event in events {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Watcher error");
                    continue;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                continue;
            }
            for path in &event.paths {
                if let Some(change) = self.resolve(path) {
                    if !changes.contains(&change) {
                        changes.push(change);
                    }
                }
            }
        }

        changes
    }

    /// Watch until the shutdown flag is set
    pub async fn run(&self) -> Result<WatchSummary> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            NotifyConfig::default(),
        )?;

        // A single file is watched through its directory so editors that
        // replace the file on save keep being seen.
        let (watch_path, mode) = match &self.target {
            WatchTarget::Directory { root, .. } => (root.as_path(), RecursiveMode::Recursive),
            WatchTarget::File { source, .. } => (
                source.parent().unwrap_or(source.as_path()),
                RecursiveMode::NonRecursive,
            ),
        };
        watcher.watch(watch_path, mode)?;
        info!(path = %watch_path.display(), "Watching for changes");

        let mut summary = WatchSummary::default();

        while !self.shutdown.load(Ordering::Relaxed) {
            let first = match tokio::time::timeout(POLL_INTERVAL, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => continue,
            };

            let mut batch = vec![first];
            let deadline = tokio::time::Instant::now() + DEBOUNCE;
            while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
                batch.push(event);
            }

            for (source, output) in self.collect_changes(batch) {
                if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_file()) {
                    debug!(path = %source.display(), "Changed path is gone, skipping");
                    continue;
                }

                match self.pipeline.compile_file(&source, &output).await {
                    FileOutcome::Failed { .. } => summary.failed += 1,
                    _ => {
                        summary.recompiled += 1;
                        info!(
                            source = %source.display(),
                            output = %output.display(),
                            "Recompiled"
                        );
                    }
                }
            }
        }

        drop(watcher);
        info!(
            recompiled = summary.recompiled,
            failed = summary.failed,
            "Watch stopped"
        );

        Ok(summary)
    }
}
