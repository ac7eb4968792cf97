//! filetree-walker - Concurrent directory tree builder
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use filetree_walker::config::{CliArgs, RunConfig};
use filetree_walker::error::TreeError;
use filetree_walker::progress::{print_header, print_summary, ProgressReporter};
use filetree_walker::service::FileTreeGenerator;
use filetree_walker::tree::FileTreeResult;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    #[cfg(feature = "server")]
    {
        if let Some(command) = args.command.clone() {
            return run_command(command);
        }
    }

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = RunConfig::from_args(args).context("Invalid configuration")?;

    run_walk(config)
}

/// Walk the requested root and write its JSON tree
fn run_walk(config: RunConfig) -> Result<()> {
    let output_name = config
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    if config.show_progress {
        print_header(
            &config.root,
            config.walk.concurrency,
            if config.organize { "organized" } else { "nested" },
            &output_name,
        );
    }

    let generator =
        FileTreeGenerator::new(config.walk.clone()).context("Failed to initialize walker")?;

    // Setup signal handler for graceful shutdown
    let shutdown_flag = generator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let progress = config.show_progress.then(ProgressReporter::new);

    let outcome = match &progress {
        Some(reporter) => {
            reporter.set_status("Walking...");
            let live = reporter.clone();
            generator.generate_with_progress(&config.root, config.organize, move |p| {
                live.update(&p)
            })
        }
        None => generator.generate(&config.root, config.organize),
    };

    match outcome {
        Ok(result) => {
            if let Some(ref p) = progress {
                p.finish("Walk completed");
            }
            write_json(&result, &config).context("Failed to write tree")?;
            if config.show_progress {
                print_summary(&result, &output_name, true);
            }
            if !result.issues().is_empty() {
                info!(
                    issues = result.issues().len(),
                    "Walk completed with skipped entries"
                );
            }
            Ok(())
        }
        Err(TreeError::WalkTimeout { elapsed, partial }) => {
            if let Some(ref p) = progress {
                p.finish("Walk timed out");
            }
            // Keep whatever was committed before the deadline
            write_json(&partial, &config).context("Failed to write partial tree")?;
            if config.show_progress {
                print_summary(&partial, &output_name, false);
            }
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                "Wrote partial tree after timeout"
            );
            Err(TreeError::WalkTimeout { elapsed, partial }.into())
        }
        Err(e) => {
            if let Some(ref p) = progress {
                p.finish_and_clear();
            }
            Err(e).context("Walk failed")
        }
    }
}

fn write_json(result: &FileTreeResult, config: &RunConfig) -> Result<()> {
    let writer: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    if config.pretty {
        serde_json::to_writer_pretty(&mut writer, result)?;
    } else {
        serde_json::to_writer(&mut writer, result)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

/// Run a subcommand
#[cfg(feature = "server")]
fn run_command(command: filetree_walker::config::Command) -> Result<()> {
    use filetree_walker::config::{Command, WalkConfig};

    match command {
        Command::Serve {
            port,
            bind,
            workers,
            timeout,
            verbose,
        } => {
            setup_logging(verbose)?;
            let config = WalkConfig::new(workers, timeout).context("Invalid configuration")?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create async runtime")?;

            runtime.block_on(async {
                filetree_walker::server::serve(&bind, port, config)
                    .await
                    .context("Server failed")
            })
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("filetree_walker=debug,warn")
    } else {
        EnvFilter::new("filetree_walker=info,warn")
    };

    // stdout carries the JSON tree
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
