//! Clean command
//!
//! Deletes generated files whose source sibling (same stem, source
//! extension, same directory) is present in the walk. Generated files with
//! no source are hand-written and left alone.

use super::{walk_options, BatchReport};
use crate::config::{Dialect, RunConfig};
use crate::error::{FileError, FileOutcome, PathError, Result, WalkError};
use crate::walker::TreeWalker;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Generated files in `files` that have a source sibling in `files`
pub fn stale_outputs(files: &[PathBuf], dialect: &Dialect) -> Vec<PathBuf> {
    let present: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();

    files
        .iter()
        .filter(|path| dialect.is_target(path))
        .filter(|path| {
            let source = PathBuf::from(dialect.to_source_name(&path.to_string_lossy()));
            present.contains(source.as_path())
        })
        .cloned()
        .collect()
}

/// Delete every generated file under `input` that has a source sibling
pub async fn clean(input: &Path, config: &RunConfig) -> Result<BatchReport> {
    let start = Instant::now();

    let meta = tokio::fs::metadata(input).await.ok();
    if !meta.is_some_and(|m| m.is_dir()) {
        return Err(PathError::NotADirectory {
            path: input.to_path_buf(),
        }
        .into());
    }

    info!(input = %input.display(), "Cleaning tree");

    let walker = TreeWalker::new(walk_options(config));
    let walked = walker.walk(input).await?;
    let targets = stale_outputs(&walked.files, &config.dialect);
    debug!(candidates = targets.len(), "Generated files with sources");

    let mut tasks = JoinSet::new();
    for path in targets {
        tasks.spawn(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Deleted");
                    FileOutcome::Deleted { path }
                }
                Err(e) => {
                    let error = FileError::Delete { path, source: e };
                    warn!(error = %error, "Delete failed");
                    FileOutcome::Failed { error }
                }
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.map_err(|e| WalkError::TaskFailed(e.to_string()))?);
    }

    let report = BatchReport {
        outcomes,
        duration: start.elapsed(),
    };
    info!(
        deleted = report.succeeded(),
        failed = report.failed(),
        "Clean complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TeacError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_stale_outputs_requires_sibling() {
        let files: Vec<PathBuf> = ["p/a.tea", "p/a.php", "p/b.php", "p/sub/c.php", "p/c.tea"]
            .iter()
            .map(PathBuf::from)
            .collect();

        let stale = stale_outputs(&files, &Dialect::default());
        assert_eq!(stale, vec![PathBuf::from("p/a.php")]);
    }

    #[tokio::test]
    async fn test_clean_deletes_only_with_source() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.tea"), "").unwrap();
        fs::write(root.join("a.php"), "").unwrap();
        fs::write(root.join("b.php"), "").unwrap();
        fs::write(root.join("sub/c.tea"), "").unwrap();
        fs::write(root.join("sub/c.php"), "").unwrap();

        let report = clean(root, &RunConfig::default()).await.unwrap();
        assert_eq!(report.succeeded(), 2);
        assert!(!root.join("a.php").exists());
        assert!(!root.join("sub/c.php").exists());
        assert!(root.join("b.php").exists());
        assert!(root.join("a.tea").exists());
    }

    #[tokio::test]
    async fn test_clean_requires_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.tea");
        fs::write(&file, "").unwrap();

        let err = clean(&file, &RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, TeacError::Path(PathError::NotADirectory { .. })));

        let err = clean(&dir.path().join("nope"), &RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TeacError::Path(PathError::NotADirectory { .. })));
    }
}
