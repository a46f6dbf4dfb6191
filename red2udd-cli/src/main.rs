//! RED to UDD converter CLI application.
//!
//! Reads a SuperNEMO RED file and writes the converted UDD event records.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use indicatif::{ProgressBar, ProgressStyle};
use red2udd_core::pipeline::{self, StopReason};
use red2udd_core::{open_sink, RedReader, RedToUddConverter};
use std::time::Instant;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    run(&args)
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let converter_config = args.converter_config();
    converter_config
        .validate()
        .context("Invalid run settings; use --sync-time SECONDS")?;
    let output_config = args.output_config();

    info!(input = ?args.input, output = ?output_config.path, "converting");

    let mut reader = RedReader::open(&args.input)
        .with_context(|| format!("Failed to open RED file {:?}", args.input))?;
    let mut converter = RedToUddConverter::new(converter_config)?;
    let mut sink = open_sink(&output_config)
        .with_context(|| format!("Failed to create output file {:?}", output_config.path))?;

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.set_message(format!(
            "Converting {:?}...",
            args.input.file_name().unwrap_or_default()
        ));
        pb
    };

    let start_time = Instant::now();

    let summary = pipeline::run_with_progress(
        &mut reader,
        &mut converter,
        sink.as_mut(),
        args.max_events,
        |records_read| {
            if records_read % 1000 == 0 {
                progress.set_message(format!("Converted {} records", records_read));
            }
        },
    )
    .context("Conversion failed")?;

    let duration = start_time.elapsed();
    progress.finish_with_message(format!(
        "Done! Converted {} records in {:.2}s",
        summary.records_written,
        duration.as_secs_f64()
    ));

    let stop = match summary.stop_reason {
        StopReason::Exhausted => "end of input",
        StopReason::MaxEvents => "maximum number of events",
        StopReason::EndOfWindow => "end of time window",
    };

    eprintln!();
    eprintln!("Results:");
    eprintln!("  Input:              {:?}", args.input);
    eprintln!("  Output:             {:?}", output_config.path);
    eprintln!("  Processed records:  {}", summary.records_read);
    eprintln!("  Stored records:     {}", summary.records_written);
    eprintln!("  Stopped at:         {}", stop);
    eprintln!("  Duration:           {:.3}s", duration.as_secs_f64());

    Ok(())
}
