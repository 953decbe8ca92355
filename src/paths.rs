//! Source to output path mapping
//!
//! The relative part of a source path is found by string prefix, not by
//! canonical resolution: `..` components and symlinks are kept verbatim.
//! Only the computed relative suffix has its separators normalized.

use crate::config::Dialect;
use crate::error::PathError;
use std::path::{Path, PathBuf};

/// Input root and output root of one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
}

impl PathMapping {
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Map `source` (which must start with the source root) into the output tree
    pub fn map(&self, source: &Path, dialect: &Dialect) -> Result<PathBuf, PathError> {
        map_path(source, &self.source_root, &self.output_root, dialect)
    }
}

/// Portion of `source` after the `root` prefix, as written
pub fn relative_suffix(source: &Path, root: &Path) -> Result<String, PathError> {
    let source_str = source.to_string_lossy();
    let root_str = root.to_string_lossy();

    match source_str.strip_prefix(root_str.as_ref()) {
        Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
        _ => Err(PathError::OutsideRoot {
            path: source.to_path_buf(),
            root: root.to_path_buf(),
        }),
    }
}

/// Compute `output_root` + relative path with the extension swapped.
///
/// Backslashes in the relative suffix become forward slashes; the roots
/// are used as given.
pub fn map_path(
    source: &Path,
    source_root: &Path,
    output_root: &Path,
    dialect: &Dialect,
) -> Result<PathBuf, PathError> {
    let relative = relative_suffix(source, source_root)?;
    let swapped = dialect.to_target_name(&relative).replace('\\', "/");

    Ok(output_root.join(swapped.trim_start_matches('/')))
}

/// Output path for a single file compiled in place
pub fn sibling_target(source: &Path, dialect: &Dialect) -> PathBuf {
    PathBuf::from(dialect.to_target_name(&source.to_string_lossy()))
}
