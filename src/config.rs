//! Configuration types for teac
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The source/target `Dialect` (extensions and fragment markers)
//! - The validated `Invocation` handed to the command entry points

use crate::error::ConfigError;
use clap::Parser;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Maximum reasonable concurrent job count
const MAX_JOBS: usize = 512;

/// Tea to PHP transpiler
#[derive(Parser, Debug, Clone)]
#[command(
    name = "teac",
    version,
    about = "Compile Tea templates to PHP, mirroring the input tree",
    after_help = "EXAMPLES:\n    \
        teac compile views/ build/views/\n    \
        teac compile page.tea\n    \
        teac watch views/ build/views/\n    \
        teac clean views/"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (per-file debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress progress and summary output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Maximum number of files transformed concurrently
    #[arg(
        short = 'j',
        long,
        global = true,
        default_value_t = default_jobs(),
        value_name = "NUM"
    )]
    pub jobs: usize,

    /// Exclude walked paths matching pattern (can be repeated)
    #[arg(
        long = "exclude",
        global = true,
        value_name = "PATTERN",
        action = clap::ArgAction::Append
    )]
    pub exclude_patterns: Vec<String>,

    /// Maximum directory depth (unlimited if not set)
    #[arg(short = 'd', long, global = true, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Extension of source files
    #[arg(long, global = true, default_value = "tea", value_name = "EXT")]
    pub source_ext: String,

    /// Extension of generated files
    #[arg(long, global = true, default_value = "php", value_name = "EXT")]
    pub target_ext: String,
}

/// Subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Compile a source file or a directory tree
    Compile {
        /// Source file or directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file, or output root for a directory (defaults to in place)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Recompile on file system changes until interrupted
    Watch {
        /// Source file or directory to watch
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file, or output root for a directory
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Delete generated files that have a matching source file
    Clean {
        /// Directory to clean
        #[arg(value_name = "DIR")]
        input: PathBuf,
    },
}

fn default_jobs() -> usize {
    // Transform work is mostly file I/O
    num_cpus::get() * 2
}

/// Source and target language conventions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Source extension without the dot
    pub source_ext: String,

    /// Target extension without the dot
    pub target_ext: String,

    /// Marker opening a fragment in source text
    pub source_open: String,

    /// Marker closing a fragment in source text
    pub source_close: String,

    /// Marker emitted in place of `source_open`
    pub target_open: String,

    /// Marker emitted in place of `source_close`
    pub target_close: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            source_ext: "tea".into(),
            target_ext: "php".into(),
            source_open: "<?tea".into(),
            source_close: "?>".into(),
            target_open: "<?php".into(),
            target_close: "?>".into(),
        }
    }
}

impl Dialect {
    /// Default markers with custom extensions
    pub fn with_extensions(source_ext: impl Into<String>, target_ext: impl Into<String>) -> Self {
        Self {
            source_ext: source_ext.into(),
            target_ext: target_ext.into(),
            ..Self::default()
        }
    }

    /// Override the fragment markers
    pub fn with_markers(
        mut self,
        source_open: impl Into<String>,
        source_close: impl Into<String>,
        target_open: impl Into<String>,
        target_close: impl Into<String>,
    ) -> Self {
        self.source_open = source_open.into();
        self.source_close = source_close.into();
        self.target_open = target_open.into();
        self.target_close = target_close.into();
        self
    }

    /// True if the path ends with `.<source_ext>`
    pub fn is_source(&self, path: &Path) -> bool {
        has_suffix(path, &self.source_ext)
    }

    /// True if the path ends with `.<target_ext>`
    pub fn is_target(&self, path: &Path) -> bool {
        has_suffix(path, &self.target_ext)
    }

    /// Replace the trailing extension of `name` with the target extension.
    ///
    /// A trailing source extension is swapped; any other extension of the
    /// final component is replaced; a name without one gets the target
    /// extension appended.
    pub fn to_target_name(&self, name: &str) -> String {
        swap_suffix(name, &self.source_ext, &self.target_ext)
    }

    /// Inverse of [`Dialect::to_target_name`] for generated files
    pub fn to_source_name(&self, name: &str) -> String {
        swap_suffix(name, &self.target_ext, &self.source_ext)
    }
}

fn has_suffix(path: &Path, ext: &str) -> bool {
    path.to_string_lossy()
        .strip_suffix(ext)
        .is_some_and(|rest| rest.ends_with('.'))
}

fn swap_suffix(name: &str, from: &str, to: &str) -> String {
    if let Some(stem) = name.strip_suffix(from).and_then(|s| s.strip_suffix('.')) {
        return format!("{}.{}", stem, to);
    }

    let file_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}", &name[..file_start + dot], to),
        _ => format!("{}.{}", name, to),
    }
}

/// What the user asked for, built once at the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Compile {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    Watch {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    Clean {
        input: PathBuf,
    },
}

/// Validated runtime configuration shared by all commands
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Extensions and markers
    pub dialect: Dialect,

    /// Concurrent transform limit
    pub jobs: usize,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Show spinner and summary
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            jobs: default_jobs(),
            exclude_patterns: Vec::new(),
            max_depth: None,
            show_progress: false,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }
}

/// A command plus the configuration it runs with
#[derive(Debug, Clone)]
pub struct Invocation {
    pub task: Task,
    pub config: RunConfig,
}

impl Invocation {
    /// Create and validate an invocation from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.jobs == 0 || args.jobs > MAX_JOBS {
            return Err(ConfigError::InvalidJobCount {
                count: args.jobs,
                max: MAX_JOBS,
            });
        }

        for ext in [&args.source_ext, &args.target_ext] {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(ConfigError::InvalidExtension {
                    ext: ext.clone(),
                    reason: "must be a non-empty name without dots or separators".into(),
                });
            }
        }
        if args.source_ext == args.target_ext {
            return Err(ConfigError::InvalidExtension {
                ext: args.target_ext.clone(),
                reason: "source and target extensions must differ".into(),
            });
        }

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let task = match args.command {
            Command::Compile { input, output } => Task::Compile { input, output },
            Command::Watch { input, output } => Task::Watch { input, output },
            Command::Clean { input } => Task::Clean { input },
        };

        Ok(Self {
            task,
            config: RunConfig {
                dialect: Dialect::with_extensions(args.source_ext, args.target_ext),
                jobs: args.jobs,
                exclude_patterns,
                max_depth: args.max_depth,
                show_progress: !args.quiet,
                verbose: args.verbose,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_compile_with_output() {
        let inv = Invocation::from_args(parse(&["teac", "compile", "views", "out"])).unwrap();
        assert_eq!(
            inv.task,
            Task::Compile {
                input: "views".into(),
                output: Some("out".into())
            }
        );
        assert!(inv.config.show_progress);
    }

    #[test]
    fn test_parse_clean_requires_dir() {
        assert!(CliArgs::try_parse_from(["teac", "clean"]).is_err());
        assert!(CliArgs::try_parse_from(["teac"]).is_err());
        assert!(CliArgs::try_parse_from(["teac", "bogus", "x"]).is_err());
    }

    #[test]
    fn test_invalid_jobs() {
        let args = parse(&["teac", "-j", "0", "clean", "views"]);
        assert!(matches!(
            Invocation::from_args(args),
            Err(ConfigError::InvalidJobCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_extension() {
        let args = parse(&["teac", "--target-ext", "tea", "clean", "views"]);
        assert!(Invocation::from_args(args).is_err());

        let args = parse(&["teac", "--source-ext", ".tea", "clean", "views"]);
        assert!(Invocation::from_args(args).is_err());
    }

    #[test]
    fn test_exclude_pattern() {
        let args = parse(&["teac", "--exclude", r"/vendor/", "-q", "compile", "views"]);
        let inv = Invocation::from_args(args).unwrap();
        assert!(inv.config.is_excluded("views/vendor/a.tea"));
        assert!(!inv.config.is_excluded("views/a.tea"));
        assert!(!inv.config.show_progress);
    }

    #[test]
    fn test_bad_exclude_pattern() {
        let args = parse(&["teac", "--exclude", "(", "compile", "views"]);
        assert!(matches!(
            Invocation::from_args(args),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_extension_checks() {
        let dialect = Dialect::default();
        assert!(dialect.is_source(Path::new("a/b.tea")));
        assert!(!dialect.is_source(Path::new("a/btea")));
        assert!(dialect.is_target(Path::new("a/b.php")));
        assert!(!dialect.is_target(Path::new("a/b.tea")));
    }

    #[test]
    fn test_name_swapping() {
        let dialect = Dialect::default();
        assert_eq!(dialect.to_target_name("page.tea"), "page.php");
        assert_eq!(dialect.to_target_name("dir.v2/page"), "dir.v2/page.php");
        assert_eq!(dialect.to_target_name("page.html"), "page.php");
        assert_eq!(dialect.to_target_name(".hidden"), ".hidden.php");
        assert_eq!(dialect.to_source_name("sub/page.php"), "sub/page.tea");
    }
}
