//! Compile command
//!
//! A file input is transformed and written directly. A directory input is
//! walked; every source file is mapped into the output root, its parent
//! directory created on demand, and its transformed text written. Up to
//! `jobs` files are in flight at once.

use super::{walk_options, BatchReport};
use crate::config::{Dialect, RunConfig};
use crate::error::{FileError, FileOutcome, PathError, Result, WalkError};
use crate::fragment::Transformer;
use crate::paths::{sibling_target, PathMapping};
use crate::progress::ProgressReporter;
use crate::walker::TreeWalker;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Spinner refresh interval while the tree is scanned
const SCAN_TICK: Duration = Duration::from_millis(100);

/// Transform-and-write pipeline shared by compile and watch
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<RunConfig>,
    transformer: Transformer,
    progress: Option<ProgressReporter>,
}

impl Pipeline {
    /// Pipeline using the built-in statement compiler
    pub fn new(config: RunConfig) -> Self {
        let transformer = Transformer::new(config.dialect.clone());
        Self::with_transformer(config, transformer)
    }

    /// Pipeline using a custom transformer; its dialect wins over the config's
    pub fn with_transformer(mut config: RunConfig, transformer: Transformer) -> Self {
        config.dialect = transformer.dialect().clone();
        Self {
            config: Arc::new(config),
            transformer,
            progress: None,
        }
    }

    /// Report batch progress on a spinner
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn dialect(&self) -> &Dialect {
        &self.config.dialect
    }

    /// Compile a file or a directory tree.
    ///
    /// For a file, `output` is the output file (or a directory to place it
    /// in); it defaults to the source path with the extension swapped. For a
    /// directory, `output` must be an existing directory; it defaults to the
    /// input itself.
    pub async fn compile(&self, input: &Path, output: Option<&Path>) -> Result<BatchReport> {
        let meta = tokio::fs::metadata(input)
            .await
            .map_err(|_| PathError::NotFound {
                path: input.to_path_buf(),
            })?;

        if meta.is_file() {
            let start = Instant::now();
            let target = self.single_file_target(input, output).await;
            let outcome = self.compile_file(input, &target).await;
            return Ok(BatchReport {
                outcomes: vec![outcome],
                duration: start.elapsed(),
            });
        }

        if !meta.is_dir() {
            return Err(PathError::NotFileOrDirectory {
                path: input.to_path_buf(),
            }
            .into());
        }

        let output_root = match output {
            Some(out) => {
                let is_dir = tokio::fs::metadata(out)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if !is_dir {
                    return Err(PathError::OutputDirMissing {
                        path: out.to_path_buf(),
                    }
                    .into());
                }
                out.to_path_buf()
            }
            None => input.to_path_buf(),
        };

        self.compile_tree(PathMapping::new(input, output_root)).await
    }

    async fn single_file_target(&self, input: &Path, output: Option<&Path>) -> PathBuf {
        let Some(out) = output else {
            return sibling_target(input, self.dialect());
        };

        if tokio::fs::metadata(out).await.is_ok_and(|m| m.is_dir()) {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.join(self.dialect().to_target_name(&name))
        } else {
            out.to_path_buf()
        }
    }

    /// Compile every source file under the mapping's source root
    pub async fn compile_tree(&self, mapping: PathMapping) -> Result<BatchReport> {
        let start = Instant::now();
        info!(
            input = %mapping.source_root.display(),
            output = %mapping.output_root.display(),
            "Compiling tree"
        );

        let walker = TreeWalker::new(walk_options(&self.config));
        let ticker = self.progress.clone().map(|p| {
            let stats = walker.stats();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(SCAN_TICK);
                loop {
                    interval.tick().await;
                    p.update_scan(
                        stats.dirs_listed.load(Ordering::Relaxed),
                        stats.files_found.load(Ordering::Relaxed),
                    );
                }
            })
        });

        let walked = walker.walk(&mapping.source_root).await;
        if let Some(ticker) = ticker {
            ticker.abort();
        }
        let walked = walked?;

        let sources: Vec<PathBuf> = walked
            .files
            .into_iter()
            .filter(|path| self.dialect().is_source(path))
            .collect();
        let total = sources.len();
        debug!(sources = total, "Source files found");

        let semaphore = Arc::new(Semaphore::new(self.config.jobs));
        let mapping = Arc::new(mapping);
        let mut tasks = JoinSet::new();

        for source in sources {
            let pipeline = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let mapping = Arc::clone(&mapping);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                match mapping.map(&source, pipeline.dialect()) {
                    Ok(target) => pipeline.compile_file(&source, &target).await,
                    Err(e) => FileOutcome::Failed { error: e.into() },
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| WalkError::TaskFailed(e.to_string()))?;
            if !outcome.is_success() {
                failed += 1;
            }
            outcomes.push(outcome);

            if let Some(ref p) = self.progress {
                p.update(outcomes.len(), total, failed);
            }
        }

        info!(
            compiled = total - failed,
            failed,
            "Compile complete"
        );

        Ok(BatchReport {
            outcomes,
            duration: start.elapsed(),
        })
    }

    /// Transform one source file and write it to `output`.
    ///
    /// Never fails the caller: errors become [`FileOutcome::Failed`].
    pub async fn compile_file(&self, source: &Path, output: &Path) -> FileOutcome {
        match self.try_compile_file(source, output).await {
            Ok(bytes) => {
                debug!(
                    source = %source.display(),
                    output = %output.display(),
                    bytes,
                    "Compiled"
                );
                FileOutcome::Compiled {
                    source: source.to_path_buf(),
                    output: output.to_path_buf(),
                    bytes,
                }
            }
            Err(error) => {
                warn!(error = %error, "File failed");
                FileOutcome::Failed { error }
            }
        }
    }

    async fn try_compile_file(&self, source: &Path, output: &Path) -> std::result::Result<u64, FileError> {
        let raw = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| FileError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;

        let text = self
            .transformer
            .transform(&raw)
            .map_err(|e| FileError::Syntax {
                path: source.to_path_buf(),
                source: e,
            })?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            // create_dir_all tolerates a sibling task creating it first
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(output, text.as_bytes())
            .await
            .map_err(|e| FileError::Write {
                path: output.to_path_buf(),
                source: e,
            })?;

        Ok(text.len() as u64)
    }
}
