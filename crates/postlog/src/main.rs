//! `postlog` - Postfix mail log to JSON converter
//!
//! Reads Postfix log lines from files or stdin and writes JSON to stdout,
//! either one object per line or one object per reconstructed transaction.
//! Diagnostics go to stderr so stdout stays machine-readable.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod input;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postlog_core::{JsonEmitter, Pipeline, RunSummary};
use postlog_decode::LineDecoder;
use postlog_parser::LineKind;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&cli) {
        Ok(summary) => {
            info!(
                lines = summary.lines_read,
                blank = summary.blank_lines,
                without_queue_id = summary.without_queue_id,
                unrecognized = summary.count(LineKind::Other),
                emitted = summary.emitted,
                completed = summary.completed,
                flushed = summary.flushed,
                discarded = summary.discarded,
                orphan_removals = summary.orphan_removals,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) if is_broken_pipe(&err) => {
            debug!("output closed by reader");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            if is_decode_failure(&err) {
                eprintln!("Try using --encoding-errors=ignore or --encoding=latin-1");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = cli.config();
    let decode = cli.decode_config();
    let emitter = JsonEmitter::new(io::stdout().lock()).pretty(config.pretty);
    let mut pipeline = Pipeline::new(config, emitter).context("invalid configuration")?;

    for input in cli.inputs() {
        debug!(%input, "reading input");
        let reader = input.open()?;
        pipeline
            .run(LineDecoder::new(reader, decode))
            .with_context(|| format!("while reading {input}"))?;
    }

    Ok(pipeline.finish()?)
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<postlog_core::Error>()
        .is_some_and(postlog_core::Error::is_broken_pipe)
}

fn is_decode_failure(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<postlog_core::Error>(),
        Some(postlog_core::Error::Decode(inner)) if inner.is_decode()
    )
}
