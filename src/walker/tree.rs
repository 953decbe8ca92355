//! Async recursive directory walker
//!
//! Each directory level fans out one task per entry and fans in by joining
//! all of them before it reports. A `JoinSet` per level is the wait group:
//! it is drained exactly once and the level completes only after its last
//! child, so no shared pending counter is needed.
//!
//! A directory handle is held only while its entries are read, and at most
//! [`MAX_OPEN_LISTINGS`] directories are being read at once.
//!
//! ```text
//! walk_dir(root)
//! ├── visit(a.tea)          ──► [a.tea]
//! ├── visit(sub/) ── walk_dir(sub)
//! │                  ├── visit(b.tea) ──► [b.tea]
//! │                  └── join ──────────► [b.tea]
//! └── join ─────────────────────────────► [a.tea, b.tea]
//! ```

use crate::error::WalkError;
use regex::Regex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Directories read concurrently
pub const MAX_OPEN_LISTINGS: usize = 64;

type LevelFuture = Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, WalkError>> + Send>>;

/// What to do with an entry whose metadata cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatPolicy {
    /// Leave the entry out of the result
    #[default]
    Skip,

    /// Report the entry as a file and let the consumer fail on it
    AssumeFile,
}

/// A classified directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: PathBuf,
    pub is_directory: bool,
}

/// Walk behaviour
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub stat_policy: StatPolicy,

    /// Directory levels below the root to descend into
    pub max_depth: Option<usize>,

    /// Entries whose path matches any pattern are not visited
    pub exclude_patterns: Vec<Regex>,
}

impl WalkOptions {
    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let path = path.to_string_lossy();
        self.exclude_patterns.iter().any(|re| re.is_match(&path))
    }
}

/// Counters updated while a walk runs
#[derive(Debug, Default)]
pub struct WalkStats {
    pub dirs_listed: AtomicU64,
    pub files_found: AtomicU64,
    pub stat_failures: AtomicU64,
    pub excluded: AtomicU64,
}

impl WalkStats {
    fn record_dir(&self) {
        self.dirs_listed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_file(&self) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
    }

    fn record_stat_failure(&self) {
        self.stat_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_excluded(&self) {
        self.excluded.fetch_add(1, Ordering::Relaxed);
    }
}

/// Result of a completed walk
///
/// `files` holds every leaf file reachable from the root, in no particular
/// order. Directories are never included.
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    pub files: Vec<PathBuf>,
    pub total_dirs: u64,
    pub stat_failures: u64,
    pub excluded: u64,
    pub duration: Duration,
}

/// State shared by every task of one walk
#[derive(Debug)]
struct WalkContext {
    options: Arc<WalkOptions>,
    stats: Arc<WalkStats>,
    listings: Semaphore,
}

/// Concurrent tree walker
#[derive(Debug, Clone)]
pub struct TreeWalker {
    options: Arc<WalkOptions>,
    stats: Arc<WalkStats>,
}

impl TreeWalker {
    pub fn new(options: WalkOptions) -> Self {
        Self {
            options: Arc::new(options),
            stats: Arc::new(WalkStats::default()),
        }
    }

    /// Live counters; the compile spinner reads them while scanning
    pub fn stats(&self) -> Arc<WalkStats> {
        Arc::clone(&self.stats)
    }

    /// Enumerate every file beneath `root`.
    ///
    /// The first directory that cannot be listed aborts the whole walk.
    pub async fn walk(&self, root: &Path) -> Result<WalkResult, WalkError> {
        let start = Instant::now();
        debug!(root = %root.display(), "Starting walk");

        let ctx = Arc::new(WalkContext {
            options: Arc::clone(&self.options),
            stats: Arc::clone(&self.stats),
            listings: Semaphore::new(MAX_OPEN_LISTINGS),
        });
        let files = walk_dir(root.to_path_buf(), 0, ctx).await?;

        let result = WalkResult {
            files,
            total_dirs: self.stats.dirs_listed.load(Ordering::Relaxed),
            stat_failures: self.stats.stat_failures.load(Ordering::Relaxed),
            excluded: self.stats.excluded.load(Ordering::Relaxed),
            duration: start.elapsed(),
        };

        info!(
            root = %root.display(),
            files = result.files.len(),
            dirs = result.total_dirs,
            stat_failures = result.stat_failures,
            "Walk complete"
        );

        Ok(result)
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new(WalkOptions::default())
    }
}

/// Walk `root` with default options
pub async fn walk(root: impl AsRef<Path>) -> Result<WalkResult, WalkError> {
    TreeWalker::default().walk(root.as_ref()).await
}

fn walk_dir(dir: PathBuf, depth: usize, ctx: Arc<WalkContext>) -> LevelFuture {
    Box::pin(async move {
        let entries = list_dir(&dir, &ctx).await?;
        ctx.stats.record_dir();

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut children = JoinSet::new();
        for path in entries {
            children.spawn(visit(path, depth + 1, Arc::clone(&ctx)));
        }

        let mut files = Vec::new();
        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(Ok(mut found)) => files.append(&mut found),
                // Dropping the set aborts the remaining siblings
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(WalkError::TaskFailed(e.to_string())),
            }
        }

        Ok(files)
    })
}

/// Entries of `dir`. The handle is closed before the caller fans out.
async fn list_dir(dir: &Path, ctx: &WalkContext) -> Result<Vec<PathBuf>, WalkError> {
    let _permit = ctx
        .listings
        .acquire()
        .await
        .map_err(|e| WalkError::TaskFailed(e.to_string()))?;

    let listing_error = |source| WalkError::Listing {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(listing_error)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(listing_error)? {
        entries.push(entry.path());
    }

    Ok(entries)
}

/// Classify one entry and descend if it is a directory
async fn visit(
    path: PathBuf,
    depth: usize,
    ctx: Arc<WalkContext>,
) -> Result<Vec<PathBuf>, WalkError> {
    let WalkContext { options, stats, .. } = &*ctx;
    if options.is_excluded(&path) {
        stats.record_excluded();
        debug!(path = %path.display(), "Excluded");
        return Ok(Vec::new());
    }

    let node = match classify(&path).await {
        Ok(is_directory) => FileNode { path, is_directory },
        Err(e) => {
            stats.record_stat_failure();
            match options.stat_policy {
                StatPolicy::Skip => {
                    warn!(path = %path.display(), error = %e, "Cannot stat entry, skipping");
                    return Ok(Vec::new());
                }
                StatPolicy::AssumeFile => {
                    warn!(path = %path.display(), error = %e, "Cannot stat entry, treating as file");
                    FileNode {
                        path,
                        is_directory: false,
                    }
                }
            }
        }
    };

    if !node.is_directory {
        stats.record_file();
        return Ok(vec![node.path]);
    }

    if options.max_depth.is_some_and(|max| depth > max) {
        debug!(path = %node.path.display(), depth, "Max depth reached");
        return Ok(Vec::new());
    }

    walk_dir(node.path, depth, Arc::clone(&ctx)).await
}

async fn classify(path: &Path) -> std::io::Result<bool> {
    let meta = tokio::fs::metadata(path).await?;
    Ok(meta.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sorted(mut files: Vec<PathBuf>) -> Vec<PathBuf> {
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let result = walk(dir.path()).await.unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.total_dirs, 1);
    }

    #[tokio::test]
    async fn test_nested_tree_returns_only_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.tea"), "x").unwrap();
        fs::write(root.join("a/one.tea"), "x").unwrap();
        fs::write(root.join("a/b/two.txt"), "x").unwrap();
        fs::write(root.join("a/b/c/three.tea"), "x").unwrap();

        let result = walk(root).await.unwrap();
        assert_eq!(
            sorted(result.files),
            vec![
                root.join("a/b/c/three.tea"),
                root.join("a/b/two.txt"),
                root.join("a/one.tea"),
                root.join("top.tea"),
            ]
        );
        assert_eq!(result.total_dirs, 5);
    }

    #[tokio::test]
    async fn test_wide_tree_completes_once() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut expected = Vec::new();
        for d in 0..20 {
            let sub = root.join(format!("d{}", d));
            fs::create_dir(&sub).unwrap();
            for f in 0..10 {
                let file = sub.join(format!("f{}.tea", f));
                fs::write(&file, "").unwrap();
                expected.push(file);
            }
        }

        let walker = TreeWalker::default();
        let result = walker.walk(root).await.unwrap();
        assert_eq!(sorted(result.files), sorted(expected));
        assert_eq!(walker.stats().files_found.load(Ordering::Relaxed), 200);
    }

    #[tokio::test]
    async fn test_missing_root_is_listing_error() {
        let dir = tempdir().unwrap();
        let err = walk(dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, WalkError::Listing { .. }));
    }

    #[tokio::test]
    async fn test_many_directories_stay_within_fd_limit() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for d in 0..3000 {
            let inner = root.join(format!("d{}/inner", d));
            fs::create_dir_all(&inner).unwrap();
            fs::write(inner.join("f.tea"), "").unwrap();
        }

        let result = walk(root).await.unwrap();
        assert_eq!(result.files.len(), 3000);
        assert_eq!(result.total_dirs, 6001);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_aborts_walk() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        let locked = root.join("locked");
        fs::create_dir_all(locked.join("inner")).unwrap();
        fs::create_dir_all(root.join("open")).unwrap();
        fs::write(root.join("open/a.tea"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits are not enforced for privileged users
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = walk(root).await.unwrap_err();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match err {
            WalkError::Listing { path, .. } => assert_eq!(path, locked),
            other => panic!("expected listing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_depth() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.tea"), "").unwrap();
        fs::write(root.join("a/one.tea"), "").unwrap();
        fs::write(root.join("a/b/two.tea"), "").unwrap();

        let walker = TreeWalker::new(WalkOptions {
            max_depth: Some(1),
            ..Default::default()
        });
        let result = walker.walk(root).await.unwrap();
        assert_eq!(
            sorted(result.files),
            vec![root.join("a/one.tea"), root.join("top.tea")]
        );

        let walker = TreeWalker::new(WalkOptions {
            max_depth: Some(0),
            ..Default::default()
        });
        let result = walker.walk(root).await.unwrap();
        assert_eq!(result.files, vec![root.join("top.tea")]);
    }

    #[tokio::test]
    async fn test_exclude_patterns() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("vendor/lib.tea"), "").unwrap();
        fs::write(root.join("page.tea"), "").unwrap();

        let walker = TreeWalker::new(WalkOptions {
            exclude_patterns: vec![Regex::new("vendor").unwrap()],
            ..Default::default()
        });
        let result = walker.walk(root).await.unwrap();
        assert_eq!(result.files, vec![root.join("page.tea")]);
        assert_eq!(result.excluded, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_policy() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("real.tea"), "").unwrap();
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling.tea")).unwrap();

        let result = walk(root).await.unwrap();
        assert_eq!(result.files, vec![root.join("real.tea")]);
        assert_eq!(result.stat_failures, 1);

        let walker = TreeWalker::new(WalkOptions {
            stat_policy: StatPolicy::AssumeFile,
            ..Default::default()
        });
        let result = walker.walk(root).await.unwrap();
        assert_eq!(
            sorted(result.files),
            vec![root.join("dangling.tea"), root.join("real.tea")]
        );
    }
}
