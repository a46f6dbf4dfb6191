//! RED to UDD record conversion.
//!
//! [`RedToUddConverter`] turns one [`RawEventRecord`] into one [`EventRecord`]:
//! it synchronizes the event time, aggregates trigger information into the
//! header, normalizes the hits, sorts them by channel number and re-assigns
//! dense hit ids.

use crate::geomid;
use crate::red::{self, RawEventRecord};
use crate::time_sync::{SyncError, TimeSynchronizer, MAX_SYNC_TIME};
use crate::types::{PropertyValue, Properties};
use crate::udd::{
    self, CalorimeterDigitizedHit, EventHeader, EventId, EventRecord, Generation,
    TrackerDigitizedHit, UnifiedDigitizedData, DELTAT_PREVIOUS_EVENT_KEY, NO_PROGENITOR,
    PROGENITOR_TRIGGER_ID_KEY, TRIGGER_DECISION_KEY, TRIGGER_ID_KEY,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Default end-of-run bound relative to the sync time: one year, in seconds.
pub const DEFAULT_END_TIME: f64 = 86400.0 * 365.24;

/// Errors in the converter configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing run sync time")]
    MissingSyncTime,

    #[error("invalid run sync time: {0}")]
    InvalidSyncTime(f64),

    #[error("invalid run end time: {0}")]
    InvalidEndTime(f64),
}

/// Errors that abort the conversion of a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("event #{event_id}: {source}")]
    Time {
        event_id: i32,
        #[source]
        source: SyncError,
    },
}

/// Converter settings, fixed for a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// Unix time of tick zero, in seconds
    pub sync_time: f64,
    /// Events whose reference time exceeds this many seconds end the run
    pub end_time: f64,
    /// Drop calorimeter waveforms
    pub no_waveform: bool,
}

impl ConverterConfig {
    pub fn new(sync_time: f64) -> Self {
        Self {
            sync_time,
            end_time: DEFAULT_END_TIME,
            no_waveform: false,
        }
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn with_no_waveform(mut self, no_waveform: bool) -> Self {
        self.no_waveform = no_waveform;
        self
    }

    /// Checks that the run can start with these settings.
    ///
    /// A sync time of exactly zero is treated as "not provided".
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_time == 0.0 {
            return Err(ConfigError::MissingSyncTime);
        }
        if self.sync_time.is_nan() || self.sync_time.abs() > MAX_SYNC_TIME {
            return Err(ConfigError::InvalidSyncTime(self.sync_time));
        }
        if self.end_time.is_nan() {
            return Err(ConfigError::InvalidEndTime(self.end_time));
        }
        Ok(())
    }
}

/// Outcome of converting one record.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Conversion {
    /// The record was converted
    Converted(EventRecord),
    /// The record lies past the configured end time; the run is finished
    EndOfWindow,
}

/// Stateful RED to UDD converter.
///
/// Carries the previous event timestamp across calls, so one instance must
/// see the records of a run in file order.
#[derive(Debug, Clone)]
pub struct RedToUddConverter {
    config: ConverterConfig,
    time_sync: TimeSynchronizer,
}

impl RedToUddConverter {
    /// Creates a converter after validating `config`.
    pub fn new(config: ConverterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let time_sync = TimeSynchronizer::new(config.sync_time)
            .map_err(|_| ConfigError::InvalidSyncTime(config.sync_time))?;
        Ok(Self { config, time_sync })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Forgets the previous event, e.g. before starting another run.
    pub fn reset(&mut self) {
        self.time_sync.reset();
    }

    /// Converts one raw record.
    pub fn convert(&mut self, red: &RawEventRecord) -> Result<Conversion, ConvertError> {
        let synced = self
            .time_sync
            .synchronize(&red.reference_time)
            .map_err(|source| ConvertError::Time {
                event_id: red.event_id,
                source,
            })?;

        if synced.reference_time > self.config.end_time {
            debug!(
                event_id = red.event_id,
                reference_time = synced.reference_time,
                end_time = self.config.end_time,
                "event past end time"
            );
            return Ok(Conversion::EndOfWindow);
        }

        let mut properties = red.auxiliaries.clone();

        let deltat = self.time_sync.delta_time(synced.timestamp);
        if deltat < 0.0 {
            warn!(event_id = red.event_id, deltat, "negative deltat to previous event");
        }
        properties.store(DELTAT_PREVIOUS_EVENT_KEY, PropertyValue::Real(deltat));
        store_trigger_info(&mut properties, &red.trigger_records);

        let header = EventHeader {
            id: EventId {
                run: red.run_id,
                event: red.event_id,
            },
            generation: Generation::Real,
            timestamp: synced.timestamp,
            properties,
        };

        let mut calorimeter_hits: Vec<_> = red
            .calo_hits
            .iter()
            .map(|hit| convert_calo_hit(hit, self.config.no_waveform))
            .collect();
        sort_calorimeter_hits(&mut calorimeter_hits);

        let mut tracker_hits: Vec<_> = red.tracker_hits.iter().map(convert_tracker_hit).collect();
        sort_tracker_hits(&mut tracker_hits);

        debug!(
            event_id = red.event_id,
            calo_hits = calorimeter_hits.len(),
            tracker_hits = tracker_hits.len(),
            "converted event"
        );

        Ok(Conversion::Converted(EventRecord {
            header,
            udd: UnifiedDigitizedData {
                run_id: red.run_id,
                event_id: red.event_id,
                reference_timestamp: red.reference_time.ticks,
                origin_trigger_ids: red.origin_trigger_ids.clone(),
                calorimeter_hits,
                tracker_hits,
            },
        }))
    }
}

/// Stores the trigger id, decision and progenitor arrays, one entry per
/// trigger sub-record.
fn store_trigger_info(properties: &mut Properties, records: &[red::TriggerRecord]) {
    let mut trigger_ids = Vec::with_capacity(records.len());
    let mut decisions = Vec::with_capacity(records.len());
    let mut progenitors = Vec::with_capacity(records.len());

    for record in records {
        trigger_ids.push(record.trigger_id as i64);
        decisions.push(record.trigger_decision as i64);
        progenitors.push(
            record
                .progenitor_trigger_id
                .map_or(NO_PROGENITOR, |id| id as i64),
        );
    }

    properties.store(TRIGGER_ID_KEY, PropertyValue::Integers(trigger_ids));
    properties.store(TRIGGER_DECISION_KEY, PropertyValue::Integers(decisions));
    properties.store(PROGENITOR_TRIGGER_ID_KEY, PropertyValue::Integers(progenitors));
}

fn convert_calo_hit(hit: &red::CaloDigitizedHit, no_waveform: bool) -> CalorimeterDigitizedHit {
    CalorimeterDigitizedHit {
        geom_id: hit.geom_id.clone(),
        hit_id: hit.hit_id,
        timestamp: hit.reference_time.ticks,
        waveform: if no_waveform {
            None
        } else {
            hit.waveform.clone()
        },
        low_threshold_only: hit.low_threshold_only,
        high_threshold: hit.high_threshold,
        fcr: hit.fcr,
        lt_trigger_counter: hit.lt_trigger_counter,
        lt_time_counter: hit.lt_time_counter,
        fwmeas_baseline: hit.fwmeas_baseline,
        fwmeas_peak_amplitude: hit.fwmeas_peak_amplitude,
        fwmeas_peak_cell: hit.fwmeas_peak_cell,
        fwmeas_charge: hit.fwmeas_charge,
        fwmeas_rising_cell: hit.fwmeas_rising_cell,
        fwmeas_falling_cell: hit.fwmeas_falling_cell,
        origin: hit.origin,
    }
}

#[inline]
fn convert_geiger_channel(channel: &red::GeigerChannel) -> udd::GeigerTime {
    udd::GeigerTime {
        ticks: channel.time.map(|t| t.ticks),
        origin: channel.origin,
    }
}

fn convert_geiger_times(times: &red::GeigerTimes) -> udd::GeigerTimes {
    udd::GeigerTimes {
        anodes: times.anodes.map(|anode| convert_geiger_channel(&anode)),
        bottom_cathode: convert_geiger_channel(&times.bottom_cathode),
        top_cathode: convert_geiger_channel(&times.top_cathode),
    }
}

fn convert_tracker_hit(hit: &red::TrackerDigitizedHit) -> TrackerDigitizedHit {
    TrackerDigitizedHit {
        geom_id: hit.geom_id.clone(),
        hit_id: hit.hit_id,
        times: hit.times.iter().map(convert_geiger_times).collect(),
    }
}

/// Stable-sorts calorimeter hits by optical-module number and renumbers them.
pub fn sort_calorimeter_hits(hits: &mut [CalorimeterDigitizedHit]) {
    hits.sort_by_key(|hit| geomid::om_num(&hit.geom_id));
    for (index, hit) in hits.iter_mut().enumerate() {
        hit.hit_id = index as i32;
    }
}

/// Stable-sorts tracker hits by Geiger cell number and renumbers them.
pub fn sort_tracker_hits(hits: &mut [TrackerDigitizedHit]) {
    hits.sort_by_key(|hit| geomid::gg_num(&hit.geom_id));
    for (index, hit) in hits.iter_mut().enumerate() {
        hit.hit_id = index as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::red::{GeigerChannel, GeigerTimes, TriggerRecord};
    use crate::types::{Clock, GeomId, RtdOrigin, Timestamp};

    fn calo_hit(column: u32, row: u32, hit_id: i32) -> red::CaloDigitizedHit {
        red::CaloDigitizedHit {
            geom_id: GeomId::new(1302, [0, 0, column, row]),
            hit_id,
            reference_time: Timestamp::new(Clock::Clock160MHz, 1000 + hit_id as i64),
            waveform: Some(vec![1, -2, 3, i16::MIN, i16::MAX]),
            low_threshold_only: hit_id % 2 == 0,
            high_threshold: hit_id % 2 == 1,
            fcr: 17,
            lt_trigger_counter: 3,
            lt_time_counter: 99,
            fwmeas_baseline: -5,
            fwmeas_peak_amplitude: 400,
            fwmeas_peak_cell: 12,
            fwmeas_charge: -12345,
            fwmeas_rising_cell: 800,
            fwmeas_falling_cell: 900,
            origin: RtdOrigin::new(hit_id, 7),
        }
    }

    fn tracker_hit(layer: u32, row: u32, hit_id: i32, n_times: usize) -> red::TrackerDigitizedHit {
        let mut times = Vec::new();
        for i in 0..n_times {
            let mut gg = GeigerTimes::default();
            gg.anodes[0] = GeigerChannel {
                time: Some(Timestamp::new(Clock::Clock80MHz, 100 * i as i64 + 1)),
                origin: RtdOrigin::new(i as i32, 4),
            };
            gg.anodes[2] = GeigerChannel {
                time: Some(Timestamp::new(Clock::Clock80MHz, 100 * i as i64 + 3)),
                origin: RtdOrigin::new(i as i32, 5),
            };
            gg.top_cathode = GeigerChannel {
                time: Some(Timestamp::new(Clock::Clock80MHz, 555)),
                origin: RtdOrigin::new(9, 4),
            };
            times.push(gg);
        }
        red::TrackerDigitizedHit {
            geom_id: GeomId::new(1204, [0, 0, layer, row]),
            hit_id,
            times,
        }
    }

    fn raw_event(event_id: i32, ticks: i64) -> RawEventRecord {
        RawEventRecord {
            run_id: 1234,
            event_id,
            reference_time: Timestamp::new(Clock::Clock40MHz, ticks),
            ..Default::default()
        }
    }

    fn expect_converted(conversion: Conversion) -> EventRecord {
        match conversion {
            Conversion::Converted(record) => record,
            Conversion::EndOfWindow => panic!("unexpected end of window"),
        }
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            ConverterConfig::new(0.0).validate(),
            Err(ConfigError::MissingSyncTime)
        );
        assert!(matches!(
            ConverterConfig::new(f64::NAN).validate(),
            Err(ConfigError::InvalidSyncTime(_))
        ));
        assert!(matches!(
            ConverterConfig::new(1.0).with_end_time(f64::NAN).validate(),
            Err(ConfigError::InvalidEndTime(_))
        ));
        assert!(ConverterConfig::new(1.0).validate().is_ok());
        assert!(RedToUddConverter::new(ConverterConfig::new(0.0)).is_err());
    }

    #[test]
    fn test_unrepresentable_sync_time_is_rejected() {
        for sync_time in [1e30, -1e30, f64::INFINITY, MAX_SYNC_TIME * 1.5] {
            assert_eq!(
                ConverterConfig::new(sync_time).validate(),
                Err(ConfigError::InvalidSyncTime(sync_time))
            );
            assert!(RedToUddConverter::new(ConverterConfig::new(sync_time)).is_err());
        }
        assert!(ConverterConfig::new(MAX_SYNC_TIME).validate().is_ok());
        assert!(ConverterConfig::new(-1.5).validate().is_ok());
    }

    #[test]
    fn test_header_fields() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1000.0)).unwrap();
        let mut red = raw_event(42, 100_000_000);
        red.auxiliaries.store("time_width", PropertyValue::Real(0.25));
        red.origin_trigger_ids.extend([3, 5]);

        let record = expect_converted(converter.convert(&red).unwrap());
        assert_eq!(record.header.id, EventId { run: 1234, event: 42 });
        assert_eq!(record.header.generation, Generation::Real);
        assert_eq!(record.header.timestamp.seconds, 1002);
        assert_eq!(record.header.timestamp.picoseconds, 500_000_000_000);
        assert_eq!(record.header.properties.fetch_real("time_width"), Some(0.25));
        assert_eq!(
            record.header.properties.fetch_real(DELTAT_PREVIOUS_EVENT_KEY),
            Some(0.0)
        );

        assert_eq!(record.udd.run_id, 1234);
        assert_eq!(record.udd.event_id, 42);
        assert_eq!(record.udd.reference_timestamp, 100_000_000);
        assert_eq!(record.udd.origin_trigger_ids, red.origin_trigger_ids);
    }

    #[test]
    fn test_trigger_arrays_are_aligned() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(0, 0);
        red.trigger_records = vec![
            TriggerRecord {
                trigger_id: 10,
                trigger_decision: true,
                progenitor_trigger_id: None,
            },
            TriggerRecord {
                trigger_id: 11,
                trigger_decision: false,
                progenitor_trigger_id: Some(10),
            },
            TriggerRecord {
                trigger_id: 12,
                trigger_decision: true,
                progenitor_trigger_id: None,
            },
        ];

        let record = expect_converted(converter.convert(&red).unwrap());
        let props = &record.header.properties;
        assert_eq!(props.fetch_integers(TRIGGER_ID_KEY), Some(&[10, 11, 12][..]));
        assert_eq!(props.fetch_integers(TRIGGER_DECISION_KEY), Some(&[1, 0, 1][..]));
        assert_eq!(
            props.fetch_integers(PROGENITOR_TRIGGER_ID_KEY),
            Some(&[-1, 10, -1][..])
        );
    }

    #[test]
    fn test_no_trigger_records_gives_empty_arrays() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let record = expect_converted(converter.convert(&raw_event(0, 0)).unwrap());
        let props = &record.header.properties;
        for key in [TRIGGER_ID_KEY, TRIGGER_DECISION_KEY, PROGENITOR_TRIGGER_ID_KEY] {
            assert_eq!(props.fetch_integers(key), Some(&[][..]), "{key}");
        }
    }

    #[test]
    fn test_calo_hits_sorted_and_renumbered() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(0, 0);
        // om_num: 3*13+1 = 40, 0*13+5 = 5, 1*13+0 = 13
        red.calo_hits = vec![calo_hit(3, 1, 70), calo_hit(0, 5, 71), calo_hit(1, 0, 72)];

        let record = expect_converted(converter.convert(&red).unwrap());
        let hits = &record.udd.calorimeter_hits;
        assert_eq!(hits.len(), 3);

        let ids: Vec<i32> = hits.iter().map(|h| h.hit_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let oms: Vec<Option<u32>> = hits.iter().map(|h| geomid::om_num(&h.geom_id)).collect();
        assert_eq!(oms, vec![Some(5), Some(13), Some(40)]);

        // Scalars copied from the raw hit that was at index 1
        let first = &hits[0];
        let raw = &red.calo_hits[1];
        assert_eq!(first.timestamp, raw.reference_time.ticks);
        assert_eq!(first.waveform, raw.waveform);
        assert_eq!(first.low_threshold_only, raw.low_threshold_only);
        assert_eq!(first.high_threshold, raw.high_threshold);
        assert_eq!(first.fcr, raw.fcr);
        assert_eq!(first.lt_trigger_counter, raw.lt_trigger_counter);
        assert_eq!(first.lt_time_counter, raw.lt_time_counter);
        assert_eq!(first.fwmeas_baseline, raw.fwmeas_baseline);
        assert_eq!(first.fwmeas_peak_amplitude, raw.fwmeas_peak_amplitude);
        assert_eq!(first.fwmeas_peak_cell, raw.fwmeas_peak_cell);
        assert_eq!(first.fwmeas_charge, raw.fwmeas_charge);
        assert_eq!(first.fwmeas_rising_cell, raw.fwmeas_rising_cell);
        assert_eq!(first.fwmeas_falling_cell, raw.fwmeas_falling_cell);
        assert_eq!(first.origin, RtdOrigin::new(71, 7));
    }

    #[test]
    fn test_out_of_range_geometry_sorts_first() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(0, 0);
        let mut far_calo = calo_hit(0, 0, 80);
        far_calo.geom_id = GeomId::new(1302, [0, 20_000_000, 0, 0]);
        red.calo_hits = vec![calo_hit(2, 0, 81), far_calo];
        let mut far_cell = tracker_hit(0, 0, 90, 1);
        far_cell.geom_id = GeomId::new(1204, [0, 9_000_000, 0, 0]);
        red.tracker_hits = vec![tracker_hit(1, 1, 91, 0), far_cell];

        let record = expect_converted(converter.convert(&red).unwrap());
        let calo = &record.udd.calorimeter_hits;
        assert_eq!(calo[0].geom_id.get(1), Some(20_000_000));
        assert_eq!(calo[1].origin, RtdOrigin::new(81, 7));
        assert_eq!(calo.iter().map(|h| h.hit_id).collect::<Vec<_>>(), vec![0, 1]);

        let tracker = &record.udd.tracker_hits;
        assert_eq!(tracker[0].geom_id.get(1), Some(9_000_000));
        assert_eq!(tracker.iter().map(|h| h.hit_id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_ordinals() {
        let mut hits: Vec<CalorimeterDigitizedHit> = [(2, 10), (1, 11), (2, 12), (1, 13)]
            .iter()
            .map(|&(row, charge)| CalorimeterDigitizedHit {
                geom_id: GeomId::new(1302, [0, 0, 0, row]),
                fwmeas_charge: charge,
                ..Default::default()
            })
            .collect();
        sort_calorimeter_hits(&mut hits);
        let charges: Vec<i32> = hits.iter().map(|h| h.fwmeas_charge).collect();
        assert_eq!(charges, vec![11, 13, 10, 12]);

        let mut tracker: Vec<TrackerDigitizedHit> = [(4, 0), (4, 1), (0, 2)]
            .iter()
            .map(|&(layer, hit_id)| TrackerDigitizedHit {
                geom_id: GeomId::new(1204, [0, 0, layer, 0]),
                hit_id,
                times: Vec::new(),
            })
            .collect();
        // Tag the first layer-4 hit
        tracker[0].times.push(udd::GeigerTimes::default());
        sort_tracker_hits(&mut tracker);
        assert_eq!(tracker[0].geom_id.get(2), Some(0));
        assert_eq!(tracker[1].times.len(), 1);
        assert_eq!(tracker[2].times.len(), 0);
        assert_eq!(
            tracker.iter().map(|h| h.hit_id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_waveform_suppression() {
        let config = ConverterConfig::new(1.0).with_no_waveform(true);
        let mut converter = RedToUddConverter::new(config).unwrap();
        let mut red = raw_event(0, 0);
        let mut empty = calo_hit(0, 1, 0);
        empty.waveform = Some(Vec::new());
        red.calo_hits = vec![calo_hit(0, 0, 1), empty];

        let record = expect_converted(converter.convert(&red).unwrap());
        assert!(record
            .udd
            .calorimeter_hits
            .iter()
            .all(|h| h.waveform.is_none()));
    }

    #[test]
    fn test_waveform_kept_verbatim() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(0, 0);
        let mut empty = calo_hit(0, 1, 0);
        empty.waveform = Some(Vec::new());
        red.calo_hits = vec![calo_hit(0, 0, 1), empty];

        let record = expect_converted(converter.convert(&red).unwrap());
        let hits = &record.udd.calorimeter_hits;
        assert_eq!(hits[0].waveform, Some(vec![1, -2, 3, i16::MIN, i16::MAX]));
        assert_eq!(hits[1].waveform, Some(Vec::new()));
    }

    #[test]
    fn test_tracker_hits_copy_all_timings() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(0, 0);
        // gg_num: 9*2+1 = 19, 9*0+3 = 3, 9*1+0 = 9
        red.tracker_hits = vec![
            tracker_hit(1, 2, 30, 2),
            tracker_hit(3, 0, 31, 0),
            tracker_hit(0, 1, 32, 1),
        ];

        let record = expect_converted(converter.convert(&red).unwrap());
        let hits = &record.udd.tracker_hits;
        assert_eq!(hits.len(), 3);
        let cells: Vec<Option<u32>> = hits.iter().map(|h| geomid::gg_num(&h.geom_id)).collect();
        assert_eq!(cells, vec![Some(3), Some(9), Some(19)]);
        assert_eq!(hits.iter().map(|h| h.hit_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(
            hits.iter().map(|h| h.times.len()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let retriggered = &hits[2];
        let second = &retriggered.times[1];
        assert_eq!(second.anodes[0].ticks, Some(101));
        assert_eq!(second.anodes[0].origin, RtdOrigin::new(1, 4));
        assert_eq!(second.anodes[1].ticks, None);
        assert_eq!(second.anodes[1].origin, RtdOrigin::INVALID);
        assert_eq!(second.anodes[2].ticks, Some(103));
        assert_eq!(second.anodes[2].origin, RtdOrigin::new(1, 5));
        assert_eq!(second.bottom_cathode.ticks, None);
        assert_eq!(second.top_cathode.ticks, Some(555));
        assert_eq!(second.top_cathode.origin, RtdOrigin::new(9, 4));
    }

    #[test]
    fn test_end_of_window_stops_without_touching_previous() {
        let config = ConverterConfig::new(1.0).with_end_time(10.0);
        let mut converter = RedToUddConverter::new(config).unwrap();

        // 40 MHz: 40M ticks per second
        let first = converter.convert(&raw_event(0, 3 * 40_000_000)).unwrap();
        assert!(matches!(first, Conversion::Converted(_)));
        let previous = converter.time_sync.previous();

        let late = converter.convert(&raw_event(1, 12 * 40_000_000)).unwrap();
        assert_eq!(late, Conversion::EndOfWindow);
        assert_eq!(converter.time_sync.previous(), previous);
    }

    #[test]
    fn test_delta_time_between_events() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(100.0)).unwrap();
        let deltas: Vec<f64> = [40_000_000, 120_000_000, 60_000_000]
            .iter()
            .enumerate()
            .map(|(i, &ticks)| {
                let record = expect_converted(converter.convert(&raw_event(i as i32, ticks)).unwrap());
                record
                    .header
                    .properties
                    .fetch_real(DELTAT_PREVIOUS_EVENT_KEY)
                    .unwrap()
            })
            .collect();
        assert_eq!(deltas[0], 0.0);
        assert!((deltas[1] - 2.0).abs() < 1e-12);
        assert!((deltas[2] + 1.5).abs() < 1e-12);

        converter.reset();
        let record = expect_converted(converter.convert(&raw_event(9, 0)).unwrap());
        assert_eq!(
            record.header.properties.fetch_real(DELTAT_PREVIOUS_EVENT_KEY),
            Some(0.0)
        );
    }

    #[test]
    fn test_undefined_clock_is_an_error() {
        let mut converter = RedToUddConverter::new(ConverterConfig::new(1.0)).unwrap();
        let mut red = raw_event(5, 10);
        red.reference_time.clock = Clock::Undefined;
        assert_eq!(
            converter.convert(&red),
            Err(ConvertError::Time {
                event_id: 5,
                source: SyncError::UndefinedClock
            })
        );
    }
}
