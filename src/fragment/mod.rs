//! Fragment extraction and translation
//!
//! ```text
//!  raw text ──► Segments ──► Text ───────────────────────────► as-is
//!                      └──► Fragment ──► FragmentCompiler ──► target markers
//! ```

pub mod compiler;
pub mod extract;

pub use compiler::{FragmentCompiler, Statement, StatementCompiler};
pub use extract::{fragments, segments, Fragment, Segment, Segments};

use crate::config::Dialect;
use crate::error::SyntaxError;
use std::sync::Arc;

/// Rewrites a file's text, compiling every fragment it contains
#[derive(Clone)]
pub struct Transformer {
    dialect: Dialect,
    compiler: Arc<dyn FragmentCompiler>,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl Transformer {
    /// Transformer using the built-in [`StatementCompiler`]
    pub fn new(dialect: Dialect) -> Self {
        Self::with_compiler(dialect, Arc::new(StatementCompiler::new()))
    }

    pub fn with_compiler(dialect: Dialect, compiler: Arc<dyn FragmentCompiler>) -> Self {
        Self { dialect, compiler }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Transform a whole file.
    ///
    /// Text outside fragments passes through unchanged. Each fragment becomes
    /// the target opening marker followed by its compiled text; the target
    /// closing marker is emitted only if the source fragment was closed. The
    /// first fragment the compiler rejects aborts the file.
    pub fn transform(&self, raw: &str) -> Result<String, SyntaxError> {
        let mut out = String::with_capacity(raw.len());

        for segment in Segments::new(raw, &self.dialect.source_open, &self.dialect.source_close) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Fragment(fragment) => {
                    let compiled = self.compiler.compile(fragment.inner)?;
                    out.push_str(&self.dialect.target_open);
                    if !compiled.is_empty() {
                        out.push(' ');
                        out.push_str(&compiled);
                    }
                    if fragment.closed {
                        out.push(' ');
                        out.push_str(&self.dialect.target_close);
                    }
                }
            }
        }

        Ok(out)
    }
}
