//! Directory tree walker
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │      walk_dir(root)      │
//!                     │  read_dir → entries      │
//!                     └───────────┬─────────────┘
//!                                 │ fan-out (JoinSet)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  visit    │             │  visit    │             │  visit    │
//! │  stat     │             │  stat     │             │  stat     │
//! │  file →   │             │  dir →    │             │  file →   │
//! │  [path]   │             │  walk_dir │             │  [path]   │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 │ fan-in (join_next until empty)
//!                                 ▼
//!                          merged file list
//! ```

pub mod tree;

pub use tree::{walk, FileNode, StatPolicy, TreeWalker, WalkOptions, WalkResult, WalkStats};
