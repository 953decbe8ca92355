//! Error types for teac
//!
//! This module defines the error hierarchy for the compile pipeline:
//! - Path validation errors raised before any work starts
//! - Directory listing errors raised mid-walk
//! - Fragment syntax errors raised by the fragment compiler
//! - Per-file I/O errors collected during batch commands
//!
//! Library code returns these `thiserror` types; the binary wraps them with
//! `anyhow` context.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for teac
#[derive(Error, Debug)]
pub enum TeacError {
    /// Input or output path failed validation
    #[error("{0}")]
    Path(#[from] PathError),

    /// Directory walk failed
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// A single-file operation failed
    #[error("{0}")]
    File(#[from] FileError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system watcher errors
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O errors outside of per-file processing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// At least one file of a batch failed
    #[error("{failed} of {total} files failed")]
    BatchFailed { failed: usize, total: usize },
}

/// Path validation errors
///
/// These are reported before any partial work is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path does not exist
    #[error("Path not found: '{}'", path.display())]
    NotFound { path: PathBuf },

    /// Path exists but is neither a regular file nor a directory
    #[error("Not a file or directory: '{}'", path.display())]
    NotFileOrDirectory { path: PathBuf },

    /// A directory was required
    #[error("Not a directory: '{}'", path.display())]
    NotADirectory { path: PathBuf },

    /// Supplied output directory does not exist
    #[error("Output directory does not exist: '{}'", path.display())]
    OutputDirMissing { path: PathBuf },

    /// Source path does not start with the source root
    #[error("'{}' is not under root '{}'", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Directory walk errors
#[derive(Error, Debug)]
pub enum WalkError {
    /// A directory could not be enumerated; aborts the walk
    #[error("Failed to read directory '{}': {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spawned walk task panicked or was cancelled
    #[error("Walk task failed: {0}")]
    TaskFailed(String),
}

/// Fragment compiler rejection
///
/// Line and column are 1-based positions within the fragment text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Errors attributed to one file of a batch
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compile '{}': {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    #[error("Failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete '{}': {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Path(#[from] PathError),
}

impl FileError {
    /// The file this error is about
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileError::Read { path, .. }
            | FileError::Syntax { path, .. }
            | FileError::CreateDir { path, .. }
            | FileError::Write { path, .. }
            | FileError::Delete { path, .. } => path,
            FileError::Path(PathError::NotFound { path })
            | FileError::Path(PathError::NotFileOrDirectory { path })
            | FileError::Path(PathError::NotADirectory { path })
            | FileError::Path(PathError::OutputDirMissing { path })
            | FileError::Path(PathError::OutsideRoot { path, .. }) => path,
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid job count
    #[error("Invalid job count {count}: must be between 1 and {max}")]
    InvalidJobCount { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Invalid extension
    #[error("Invalid extension '{ext}': {reason}")]
    InvalidExtension { ext: String, reason: String },
}

/// Result type alias for TeacError
pub type Result<T> = std::result::Result<T, TeacError>;

/// Outcome of processing a single file in a batch
#[derive(Debug)]
pub enum FileOutcome {
    /// Source compiled and written
    Compiled {
        source: PathBuf,
        output: PathBuf,
        bytes: u64,
    },

    /// Generated file removed by clean
    Deleted { path: PathBuf },

    /// Failed with error; the batch continues
    Failed { error: FileError },
}

impl FileOutcome {
    /// Returns true if this outcome represents success
    pub fn is_success(&self) -> bool {
        !matches!(self, FileOutcome::Failed { .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileOutcome::Compiled { source, .. } => source,
            FileOutcome::Deleted { path } => path,
            FileOutcome::Failed { error } => error.path(),
        }
    }
}
