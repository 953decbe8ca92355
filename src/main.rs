//! teac - Tea to PHP transpiler
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use teac::commands::{clean, Pipeline, WatchSession};
use teac::config::{CliArgs, Invocation, RunConfig, Task};
use teac::progress::{print_header, print_summary, BatchKind, ProgressReporter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    // Setup logging
    setup_logging(args.verbose)?;

    // Validate once, then hand the invocation to the command
    let invocation = Invocation::from_args(args).context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(dispatch(invocation))
}

async fn dispatch(invocation: Invocation) -> Result<()> {
    let Invocation { task, config } = invocation;

    match task {
        Task::Compile { input, output } => run_compile(config, &input, output.as_deref()).await,
        Task::Watch { input, output } => run_watch(config, &input, output.as_deref()).await,
        Task::Clean { input } => run_clean(config, &input).await,
    }
}

async fn run_compile(config: RunConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let show_progress = config.show_progress;
    if show_progress {
        print_header(
            "compile",
            &input.display().to_string(),
            &output.map_or_else(|| "(in place)".to_string(), |o| o.display().to_string()),
        );
    }

    let progress = show_progress.then(ProgressReporter::new);
    let mut pipeline = Pipeline::new(config);
    if let Some(ref p) = progress {
        pipeline = pipeline.with_progress(p.clone());
    }

    let report = pipeline
        .compile(input, output)
        .await
        .context("Compile failed")?;

    if let Some(p) = progress {
        p.finish_and_clear();
    }
    if show_progress {
        print_summary("Compile Complete", BatchKind::Compile, &report);
    }

    report.ensure_success()?;
    Ok(())
}

async fn run_watch(config: RunConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let show_progress = config.show_progress;
    let session = WatchSession::new(Pipeline::new(config), input, output)
        .await
        .context("Cannot watch input")?;

    if show_progress {
        print_header(
            "watch",
            &input.display().to_string(),
            &output.map_or_else(|| "(in place)".to_string(), |o| o.display().to_string()),
        );
    }

    // Setup signal handler for graceful shutdown
    let shutdown_flag = session.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let summary = session.run().await.context("Watch failed")?;

    if summary.failed > 0 {
        info!(failed = summary.failed, "Watch finished with failed recompiles");
    }

    Ok(())
}

async fn run_clean(config: RunConfig, input: &Path) -> Result<()> {
    let show_progress = config.show_progress;
    if show_progress {
        print_header("clean", &input.display().to_string(), "-");
    }

    let report = clean(input, &config).await.context("Clean failed")?;

    if show_progress {
        print_summary("Clean Complete", BatchKind::Clean, &report);
    }

    report.ensure_success()?;
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("teac=debug,warn")
    } else {
        EnvFilter::new("teac=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
