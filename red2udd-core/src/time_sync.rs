//! Run time synchronization.
//!
//! Front-end timestamps count ticks from the run sync instant. The
//! [`TimeSynchronizer`] places them on the absolute time axis and tracks the
//! previous event timestamp to provide inter-event delta times.

use crate::types::{Timestamp, PICOSECONDS_PER_SECOND};
use crate::udd::EventTimestamp;
use thiserror::Error;

/// Errors raised while placing a timestamp on the absolute time axis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("reference clock is undefined")]
    UndefinedClock,

    #[error("tick count {0} overflows the picosecond range")]
    TickOverflow(i64),

    #[error("sync time {0} is outside the supported range")]
    SyncTimeOutOfRange(f64),
}

/// Largest supported magnitude of a run sync time, in seconds.
///
/// Keeps every synchronized timestamp within `i64` seconds.
pub const MAX_SYNC_TIME: f64 = 1e15;

/// A reference timestamp placed on the absolute time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedTime {
    /// Time since the run sync instant, in seconds
    pub reference_time: f64,
    /// Absolute event time
    pub timestamp: EventTimestamp,
}

/// Maps reference ticks to absolute time and carries the previous event time.
#[derive(Debug, Clone)]
pub struct TimeSynchronizer {
    sync_time: f64,
    sync_ps: i128,
    previous: Option<EventTimestamp>,
}

impl TimeSynchronizer {
    /// Creates a synchronizer for a run whose tick zero is `sync_time`
    /// seconds after the Unix epoch.
    ///
    /// Fails when `sync_time` is not finite or its magnitude exceeds
    /// [`MAX_SYNC_TIME`].
    pub fn new(sync_time: f64) -> Result<Self, SyncError> {
        if sync_time.is_nan() || sync_time.abs() > MAX_SYNC_TIME {
            return Err(SyncError::SyncTimeOutOfRange(sync_time));
        }
        let seconds = sync_time.floor();
        let picoseconds = (1e12 * (sync_time - seconds)).floor();
        let sync_ps = seconds as i128 * PICOSECONDS_PER_SECOND as i128 + picoseconds as i128;
        Ok(Self {
            sync_time,
            sync_ps,
            previous: None,
        })
    }

    pub fn sync_time(&self) -> f64 {
        self.sync_time
    }

    /// Timestamp of the last synchronized event, if any.
    pub fn previous(&self) -> Option<EventTimestamp> {
        self.previous
    }

    /// Forgets the previous event timestamp.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Places a reference timestamp on the absolute time axis.
    ///
    /// The seconds/picoseconds split is computed in integer picoseconds, so
    /// it is exact for every supported clock period.
    pub fn synchronize(&self, reference: &Timestamp) -> Result<SyncedTime, SyncError> {
        let period = reference.clock.period_ps().ok_or(SyncError::UndefinedClock)?;
        let reference_ps = reference
            .ticks
            .checked_mul(period)
            .ok_or(SyncError::TickOverflow(reference.ticks))?;

        Ok(SyncedTime {
            reference_time: reference_ps as f64 / PICOSECONDS_PER_SECOND as f64,
            timestamp: EventTimestamp::from_picoseconds(self.sync_ps + reference_ps as i128),
        })
    }

    /// Returns the time in seconds since the previous event and records
    /// `current` as the new previous event.
    ///
    /// The first event of a run gets 0. A negative value means the events are
    /// out of time order; it is returned unchanged.
    pub fn delta_time(&mut self, current: EventTimestamp) -> f64 {
        let delta = match self.previous {
            Some(prev) => {
                (current.seconds - prev.seconds) as f64
                    + 1e-12 * (current.picoseconds - prev.picoseconds) as f64
            }
            None => 0.0,
        };
        self.previous = Some(current);
        delta
    }
}
