//! Unified Digitized Data (UDD) model and the event header.
//!
//! These are the analysis-side structures. They mirror the raw hits but carry
//! dense hit ids, plain tick counts and an absolute event timestamp.

use crate::red::ANODE_RANKS;
use crate::types::{GeomId, Properties, RtdOrigin, PICOSECONDS_PER_SECOND};
use std::collections::BTreeSet;

/// Header property holding the time since the previous event, in seconds.
pub const DELTAT_PREVIOUS_EVENT_KEY: &str = "deltat_previous_event";
/// Header property holding the trigger id of each trigger sub-record.
pub const TRIGGER_ID_KEY: &str = "trigger_id";
/// Header property holding the decision (0/1) of each trigger sub-record.
pub const TRIGGER_DECISION_KEY: &str = "trigger_decision";
/// Header property holding the progenitor trigger id of each sub-record, or -1.
pub const PROGENITOR_TRIGGER_ID_KEY: &str = "progenitor_trigger_id";

/// Sentinel stored when a trigger sub-record has no progenitor.
pub const NO_PROGENITOR: i64 = -1;

/// Run/event identifier pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventId {
    pub run: i32,
    pub event: i32,
}

/// How the event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Generation {
    #[default]
    Real = 0,
    Simulated = 1,
}

impl Generation {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Real),
            1 => Some(Self::Simulated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Simulated => "simulated",
        }
    }
}

/// Absolute event time split into whole seconds and picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EventTimestamp {
    pub seconds: i64,
    /// Always in `0..1e12`
    pub picoseconds: i64,
}

impl EventTimestamp {
    /// Builds a timestamp from a total picosecond count.
    ///
    /// The whole-second part must fit in an `i64`; synchronized times always
    /// do, since the sync time is bounded by
    /// [`MAX_SYNC_TIME`](crate::time_sync::MAX_SYNC_TIME).
    pub fn from_picoseconds(total: i128) -> Self {
        let ps = PICOSECONDS_PER_SECOND as i128;
        Self {
            seconds: total.div_euclid(ps) as i64,
            picoseconds: total.rem_euclid(ps) as i64,
        }
    }

    /// Total picosecond count.
    pub fn as_picoseconds(&self) -> i128 {
        self.seconds as i128 * PICOSECONDS_PER_SECOND as i128 + self.picoseconds as i128
    }

    /// Time as a real number of seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + 1e-12 * self.picoseconds as f64
    }
}

/// Per-event header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventHeader {
    pub id: EventId,
    pub generation: Generation,
    pub timestamp: EventTimestamp,
    pub properties: Properties,
}

/// A normalized calorimeter hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalorimeterDigitizedHit {
    pub geom_id: GeomId,
    /// Dense index of the hit in optical-module order
    pub hit_id: i32,
    /// Raw reference time ticks
    pub timestamp: i64,
    /// `None` means the waveform was not captured, which differs from an
    /// empty waveform
    pub waveform: Option<Vec<i16>>,
    pub low_threshold_only: bool,
    pub high_threshold: bool,
    pub fcr: u16,
    pub lt_trigger_counter: u16,
    pub lt_time_counter: u32,
    pub fwmeas_baseline: i16,
    pub fwmeas_peak_amplitude: i16,
    pub fwmeas_peak_cell: i16,
    pub fwmeas_charge: i32,
    pub fwmeas_rising_cell: i32,
    pub fwmeas_falling_cell: i32,
    pub origin: RtdOrigin,
}

/// One timing channel of a normalized Geiger hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeigerTime {
    pub ticks: Option<i64>,
    pub origin: RtdOrigin,
}

/// One set of normalized Geiger-cell timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeigerTimes {
    pub anodes: [GeigerTime; ANODE_RANKS],
    pub bottom_cathode: GeigerTime,
    pub top_cathode: GeigerTime,
}

/// A normalized tracker hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerDigitizedHit {
    pub geom_id: GeomId,
    /// Dense index of the hit in Geiger-cell order
    pub hit_id: i32,
    pub times: Vec<GeigerTimes>,
}

/// Digitized data block of one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedDigitizedData {
    pub run_id: i32,
    pub event_id: i32,
    pub reference_timestamp: i64,
    pub origin_trigger_ids: BTreeSet<i32>,
    pub calorimeter_hits: Vec<CalorimeterDigitizedHit>,
    pub tracker_hits: Vec<TrackerDigitizedHit>,
}

/// Header and digitized data of one converted event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventRecord {
    pub header: EventHeader,
    pub udd: UnifiedDigitizedData,
}
