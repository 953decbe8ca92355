//! Integration tests for teac
//!
//! These run the library commands against temporary directory trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teac::commands::{clean, Pipeline};
use teac::config::{Dialect, RunConfig};
use teac::error::{FileError, SyntaxError, TeacError};
use teac::fragment::{FragmentCompiler, Transformer};
use teac::walker::walk;
use tempfile::tempdir;

/// `{{ ... }}` fragments in `.src` files become `<?php ... ?>` in `.out` files
fn brace_dialect() -> Dialect {
    Dialect::with_extensions("src", "out").with_markers("{{", "}}", "<?php", "?>")
}

/// Uppercases the fragment and terminates it; `!` is a syntax error
fn upper_compiler() -> Arc<dyn FragmentCompiler> {
    Arc::new(|source: &str| {
        let source = source.trim();
        if source.contains('!') {
            return Err(SyntaxError::new("unexpected '!'", 1, 1));
        }
        Ok(if source.is_empty() {
            String::new()
        } else {
            format!("{};", source.to_uppercase())
        })
    })
}

fn brace_pipeline() -> Pipeline {
    let config = RunConfig {
        jobs: 8,
        ..Default::default()
    };
    Pipeline::with_transformer(config, Transformer::with_compiler(brace_dialect(), upper_compiler()))
}

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn sorted(mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.sort();
    files
}

#[tokio::test]
async fn test_compile_mirrors_tree() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    let outdir = dir.path().join("outdir");
    fs::create_dir(&outdir).unwrap();
    write(&proj.join("a.src"), "<h1>no fragments here</h1>\n");
    write(&proj.join("sub/b.src"), "before {{ x }} after\n");

    let report = brace_pipeline().compile(&proj, Some(&outdir)).await.unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(report.failed(), 0);

    assert_eq!(
        fs::read_to_string(outdir.join("a.out")).unwrap(),
        "<h1>no fragments here</h1>\n"
    );
    assert_eq!(
        fs::read_to_string(outdir.join("sub/b.out")).unwrap(),
        "before <?php X; ?> after\n"
    );

    // Sources are untouched and nothing is written next to them
    assert!(!proj.join("a.out").exists());
    assert_eq!(
        sorted(walk(&proj).await.unwrap().files),
        vec![proj.join("a.src"), proj.join("sub/b.src")]
    );
}

#[tokio::test]
async fn test_unclosed_fragment_has_no_terminator() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    write(&proj.join("tail.src"), "head {{ y\nz");

    brace_pipeline().compile(&proj, None).await.unwrap();
    assert_eq!(
        fs::read_to_string(proj.join("tail.out")).unwrap(),
        "head <?php Y\nZ;"
    );
}

#[tokio::test]
async fn test_failed_file_is_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    write(&proj.join("ok.src"), "{{ a }}");
    write(&proj.join("bad.src"), "{{ ! }}");
    write(&proj.join("deeper/ok2.src"), "{{ b }}");

    let report = brace_pipeline().compile(&proj, None).await.unwrap();
    assert_eq!(report.total(), 3);
    assert_eq!(report.failed(), 1);

    let failure = report.failures().next().unwrap();
    assert!(matches!(failure, FileError::Syntax { .. }));
    assert_eq!(failure.path(), proj.join("bad.src"));

    assert!(proj.join("ok.out").exists());
    assert!(proj.join("deeper/ok2.out").exists());
    assert!(!proj.join("bad.out").exists());
    assert!(matches!(
        report.ensure_success(),
        Err(TeacError::BatchFailed { failed: 1, total: 3 })
    ));
}

#[tokio::test]
async fn test_clean_scenario() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    write(&proj.join("a.src"), "");
    write(&proj.join("a.out"), "");
    write(&proj.join("b.out"), "hand written");
    write(&proj.join("nested/c.src"), "");
    write(&proj.join("nested/c.out"), "");
    // A source elsewhere does not protect or condemn an output
    write(&proj.join("other/d.src"), "");
    write(&proj.join("d.out"), "");

    let config = RunConfig {
        dialect: brace_dialect(),
        ..Default::default()
    };
    let report = clean(&proj, &config).await.unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 0);

    assert!(!proj.join("a.out").exists());
    assert!(!proj.join("nested/c.out").exists());
    assert!(proj.join("b.out").exists());
    assert!(proj.join("d.out").exists());
    assert!(proj.join("a.src").exists());
}

#[tokio::test]
async fn test_compile_then_clean_round_trip() {
    let dir = tempdir().unwrap();
    let views = dir.path().join("views");
    write(
        &views.join("layout/page.tea"),
        "<ul><?tea foreach ($items as $i) {\n echo $i\n} ?></ul>",
    );
    write(&views.join("legacy.php"), "<?php echo 'keep'; ?>");

    let pipeline = Pipeline::new(RunConfig::default());
    let report = pipeline.compile(&views, None).await.unwrap();
    assert_eq!(report.total(), 1);
    assert_eq!(
        fs::read_to_string(views.join("layout/page.php")).unwrap(),
        "<ul><?php foreach ($items as $i) { echo $i; } ?></ul>"
    );

    let report = clean(&views, &RunConfig::default()).await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert!(!views.join("layout/page.php").exists());
    assert!(views.join("legacy.php").exists());
}

#[tokio::test]
async fn test_path_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let err = brace_pipeline().compile(&missing, None).await.unwrap_err();
    assert!(matches!(err, TeacError::Path(_)));

    let err = clean(&missing, &RunConfig::default()).await.unwrap_err();
    assert!(matches!(err, TeacError::Path(_)));
}
