//! Command line arguments.

use clap::Parser;
use red2udd_core::converter::DEFAULT_END_TIME;
use red2udd_core::pipeline::DEFAULT_MAX_EVENTS;
use red2udd_core::{ConverterConfig, OutputConfig};
use std::path::PathBuf;

/// Converts SuperNEMO RED (raw event data) files into UDD event records.
///
/// Each event is placed on the absolute time axis of the run, annotated with
/// the time since the previous event and its trigger information, and its
/// calorimeter and tracker hits are sorted by geometry.
#[derive(Parser, Debug)]
#[command(name = "red2udd")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input RED file
    #[arg(short, long, value_name = "RED_FILE")]
    pub input: PathBuf,

    /// Output file
    ///
    /// The output format is determined by the file extension:
    /// - .csv: one summary line per event
    /// - anything else: binary UDD stream
    ///
    /// Defaults to the input path with the extension `udd`.
    #[arg(short, long, value_name = "UDD_FILE")]
    pub output: Option<PathBuf>,

    /// Maximum number of RED records to read
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_EVENTS)]
    pub max_events: u64,

    /// Run synchronization time (Unix seconds)
    #[arg(short, long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub sync_time: f64,

    /// Stop at the first event later than this, in seconds after the sync time
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_END_TIME,
        allow_negative_numbers = true
    )]
    pub end_time: f64,

    /// Drop calorimeter waveforms from the output
    #[arg(long)]
    pub no_waveform: bool,

    /// Fail instead of overwriting an existing output file
    #[arg(long)]
    pub preserve_output: bool,

    /// Log progress information
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every converted record
    #[arg(short, long)]
    pub debug: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("udd"))
    }

    pub fn converter_config(&self) -> ConverterConfig {
        ConverterConfig::new(self.sync_time)
            .with_end_time(self.end_time)
            .with_no_waveform(self.no_waveform)
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.output_path()).with_preserve_existing_output(self.preserve_output)
    }
}
