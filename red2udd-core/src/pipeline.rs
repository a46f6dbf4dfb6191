//! Driving loop: read, convert, write.

use crate::converter::{Conversion, ConvertError, RedToUddConverter};
use crate::output::{EventSink, OutputError};
use crate::reader::{ReadError, RecordSource};
use crate::red::RED_SERIAL_TAG;
use thiserror::Error;
use tracing::{debug, info};

/// Default maximum number of records read in one run.
pub const DEFAULT_MAX_EVENTS: u64 = 100_000_000;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unexpected record tag '{0}'")]
    UnexpectedTag(String),

    #[error("Failed to read RED record: {0}")]
    Read(#[from] ReadError),

    #[error("Failed to convert RED record: {0}")]
    Convert(#[from] ConvertError),

    #[error("Failed to write UDD record: {0}")]
    Output(#[from] OutputError),
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input has no more records
    Exhausted,
    /// The maximum number of records was read
    MaxEvents,
    /// A record lay past the configured end time
    EndOfWindow,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// RED records loaded from the source
    pub records_read: u64,
    /// UDD records handed to the sink
    pub records_written: u64,
    pub stop_reason: StopReason,
}

/// Runs the conversion until the input is exhausted, `max_events` records
/// were read, or a record falls past the end time.
pub fn run<S, K>(
    source: &mut S,
    converter: &mut RedToUddConverter,
    sink: &mut K,
    max_events: u64,
) -> Result<RunSummary, PipelineError>
where
    S: RecordSource + ?Sized,
    K: EventSink + ?Sized,
{
    run_with_progress(source, converter, sink, max_events, |_| {})
}

/// Same as [`run`], calling `progress` with the number of records read after
/// each record.
pub fn run_with_progress<S, K, F>(
    source: &mut S,
    converter: &mut RedToUddConverter,
    sink: &mut K,
    max_events: u64,
    mut progress: F,
) -> Result<RunSummary, PipelineError>
where
    S: RecordSource + ?Sized,
    K: EventSink + ?Sized,
    F: FnMut(u64),
{
    let mut records_read = 0u64;
    let mut records_written = 0u64;
    info!(
        max_events,
        sync_time = converter.config().sync_time,
        end_time = converter.config().end_time,
        "run started"
    );

    let stop_reason = loop {
        if records_read >= max_events {
            break StopReason::MaxEvents;
        }
        if !source.has_record_tag()? {
            break StopReason::Exhausted;
        }
        if !source.record_tag_is(RED_SERIAL_TAG) {
            let found = source.record_tag().unwrap_or_default().to_string();
            return Err(PipelineError::UnexpectedTag(found));
        }

        let red = source.load()?;
        records_read += 1;

        match converter.convert(&red)? {
            Conversion::Converted(record) => {
                sink.process(&record)?;
                records_written += 1;
                debug!(event_id = red.event_id, "stored event");
            }
            Conversion::EndOfWindow => {
                info!(event_id = red.event_id, "event past end time, stopping");
                break StopReason::EndOfWindow;
            }
        }
        progress(records_read);
    };

    sink.finish()?;
    info!(records_read, records_written, ?stop_reason, "run finished");

    Ok(RunSummary {
        records_read,
        records_written,
        stop_reason,
    })
}
