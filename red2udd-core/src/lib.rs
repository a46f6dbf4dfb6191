//! RED to UDD conversion library for SuperNEMO raw data.
//!
//! This crate converts Raw Event Data (RED) records, as produced by the event
//! builder, into Unified Digitized Data (UDD) records paired with an event
//! header. The conversion places each event on the absolute time axis,
//! records the time since the previous event, aggregates trigger information,
//! and sorts and renumbers the calorimeter and tracker hits.
//!
//! # Example
//!
//! ```no_run
//! use red2udd_core::{open_sink, pipeline, ConverterConfig, OutputConfig, RedReader, RedToUddConverter};
//!
//! let mut reader = RedReader::open("run_1166.red").unwrap();
//! let config = ConverterConfig::new(1_650_000_000.0).with_no_waveform(true);
//! let mut converter = RedToUddConverter::new(config).unwrap();
//! let mut sink = open_sink(&OutputConfig::new("run_1166.udd")).unwrap();
//!
//! let summary = pipeline::run(&mut reader, &mut converter, sink.as_mut(), u64::MAX).unwrap();
//! println!("{} read, {} stored", summary.records_read, summary.records_written);
//! ```
//!
//! # Features
//!
//! - Exact seconds/picoseconds split of event times for 40, 80 and 160 MHz clocks
//! - Stable hit ordering by optical-module and Geiger-cell number
//! - Optional waveform suppression
//! - End-of-run time window
//! - Binary RED/UDD streams and a CSV event summary

pub mod codec;
pub mod converter;
pub mod geomid;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod red;
pub mod time_sync;
pub mod types;
pub mod udd;

// Re-export commonly used types
pub use converter::{ConfigError, Conversion, ConvertError, ConverterConfig, RedToUddConverter};
pub use output::{open_sink, EventSink, OutputConfig, OutputError, UddReader, UddWriter};
pub use pipeline::{PipelineError, RunSummary, StopReason};
pub use reader::{ReadError, RecordSource, RedReader, RedWriter};
pub use red::RawEventRecord;
pub use time_sync::TimeSynchronizer;
pub use udd::EventRecord;
