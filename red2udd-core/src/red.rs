//! Raw Event Data (RED) model.
//!
//! One [`RawEventRecord`] is what the event builder emits per event: the
//! merged trigger ids, the trigger sub-records and the digitized calorimeter
//! and tracker hits, each still carrying its front-end timestamp.

use crate::types::{GeomId, Properties, RtdOrigin, Timestamp};
use std::collections::BTreeSet;

/// Serialization tag of a RED record in a record stream.
pub const RED_SERIAL_TAG: &str = "snfee::data::raw_event_data";

/// Number of anode timing ranks recorded per Geiger-cell timing entry.
pub const ANODE_RANKS: usize = 5;

/// Anode timing rank of a Geiger cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnodeRank {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
}

impl AnodeRank {
    pub const ALL: [AnodeRank; ANODE_RANKS] = [Self::R0, Self::R1, Self::R2, Self::R3, Self::R4];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A trigger sub-record merged into the event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerRecord {
    pub trigger_id: i32,
    pub trigger_decision: bool,
    /// Trigger id of the record that caused this one, when it was re-triggered
    pub progenitor_trigger_id: Option<i32>,
}

/// A digitized calorimeter hit as read out by the front-end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaloDigitizedHit {
    pub geom_id: GeomId,
    pub hit_id: i32,
    pub reference_time: Timestamp,
    /// Sampled waveform, `None` when the front-end did not record one
    pub waveform: Option<Vec<i16>>,
    pub low_threshold_only: bool,
    pub high_threshold: bool,
    /// First cell reached
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

/// One timing channel of a Geiger cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeigerChannel {
    /// `None` when the channel did not fire
    pub time: Option<Timestamp>,
    pub origin: RtdOrigin,
}

/// One set of Geiger-cell timings.
///
/// A cell that re-triggers within an event carries several of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeigerTimes {
    pub anodes: [GeigerChannel; ANODE_RANKS],
    pub bottom_cathode: GeigerChannel,
    pub top_cathode: GeigerChannel,
}

impl GeigerTimes {
    #[inline]
    pub fn anode(&self, rank: AnodeRank) -> &GeigerChannel {
        &self.anodes[rank.index()]
    }
}

/// A digitized tracker (Geiger cell) hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerDigitizedHit {
    pub geom_id: GeomId,
    pub hit_id: i32,
    pub times: Vec<GeigerTimes>,
}

/// A complete raw event record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEventRecord {
    pub run_id: i32,
    pub event_id: i32,
    /// Trigger ids merged into this event by the event builder
    pub origin_trigger_ids: BTreeSet<i32>,
    pub trigger_records: Vec<TriggerRecord>,
    pub calo_hits: Vec<CaloDigitizedHit>,
    pub tracker_hits: Vec<TrackerDigitizedHit>,
    pub reference_time: Timestamp,
    pub auxiliaries: Properties,
}
