//! teac - Tea to PHP transpiler front end
//!
//! Finds source files that embed Tea fragments, compiles each fragment and
//! writes the result into an output tree that mirrors the input tree.
//!
//! # Features
//!
//! - **Concurrent Walk**: every directory level fans out one task per entry
//!   and joins them before reporting, so deep and wide trees are listed
//!   concurrently.
//!
//! - **Mirrored Output**: output paths keep the input's relative layout with
//!   the extension swapped (`views/a/b.tea` → `build/a/b.php`).
//!
//! - **Skip-and-Report Batches**: a file that fails to compile is reported
//!   and the rest of the batch still runs.
//!
//! - **Watch and Clean**: recompile on change; delete generated files that
//!   still have a source.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │   commands   │───►│    walker    │───►│  file paths  │
//! │ compile/clean│    │  (JoinSet    │    └──────┬───────┘
//! │    /watch    │    │   per level) │           │ filter by extension
//! └──────────────┘    └──────────────┘           ▼
//!                                         ┌──────────────┐
//!                                         │    paths     │ map into output root
//!                                         └──────┬───────┘
//!                                                ▼
//!                     ┌──────────────┐    ┌──────────────┐
//!                     │   fragment   │◄───│  read file   │
//!                     │ extract +    │    └──────────────┘
//!                     │ compile      │───► write output
//!                     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Compile a tree into a separate output directory
//! teac compile views/ build/
//!
//! # Recompile on change
//! teac watch views/ build/
//!
//! # Remove generated files next to their sources
//! teac clean views/
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod fragment;
pub mod paths;
pub mod progress;
pub mod walker;

pub use commands::{BatchReport, Pipeline, WatchSession};
pub use config::{CliArgs, Dialect, Invocation, RunConfig, Task};
pub use error::{Result, TeacError};
pub use fragment::{FragmentCompiler, StatementCompiler, Transformer};
pub use paths::{map_path, PathMapping};
pub use walker::{walk, TreeWalker, WalkResult};
