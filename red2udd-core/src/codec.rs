//! Little-endian binary encoding of RED and UDD records.
//!
//! Both record kinds share the same primitive layouts:
//!
//! | Item        | Layout                                              |
//! |-------------|-----------------------------------------------------|
//! | bool        | `u8` (0 or 1)                                       |
//! | string      | `u16` byte length, UTF-8 bytes                      |
//! | sequence    | `u32` element count, elements                       |
//! | option      | `u8` presence flag, value if present                |
//! | geom id     | `u32` kind, `u8` depth, `depth` x `u32`             |
//! | timestamp   | `u8` clock code, `i64` ticks                        |
//! | origin      | `i32` hit number, `i32` trigger id                  |
//! | properties  | sequence of (string key, `u8` type code, value)     |

use crate::red::{self, RawEventRecord, TriggerRecord, ANODE_RANKS};
use crate::types::{Clock, GeomId, Properties, PropertyValue, RtdOrigin, Timestamp};
use crate::udd::{
    self, CalorimeterDigitizedHit, EventHeader, EventId, EventRecord, EventTimestamp,
    Generation, UnifiedDigitizedData,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors that can occur while encoding or decoding records.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Upper bound on pre-allocated sequence capacity while decoding.
const MAX_PREALLOC: usize = 4096;

// ============================================================================
// Primitives
// ============================================================================

fn write_bool<W: Write>(w: &mut W, value: bool) -> Result<()> {
    w.write_u8(value as u8)?;
    Ok(())
}

fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    match r.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidFormat(format!(
            "invalid boolean byte {other:#04x}"
        ))),
    }
}

fn write_len<W: Write>(w: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| CodecError::InvalidFormat(format!("sequence too long: {len}")))?;
    w.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn read_len<R: Read>(r: &mut R) -> Result<usize> {
    Ok(r.read_u32::<LittleEndian>()? as usize)
}

/// Writes a `u16` length-prefixed UTF-8 string.
pub fn write_string<W: Write>(w: &mut W, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| CodecError::InvalidFormat(format!("string too long: {}", value.len())))?;
    w.write_u16::<LittleEndian>(len)?;
    w.write_all(value.as_bytes())?;
    Ok(())
}

/// Reads a `u16` length-prefixed UTF-8 string.
pub fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| CodecError::InvalidFormat(format!("string is not UTF-8: {e}")))
}

/// Reads a `len`-byte record payload.
///
/// The buffer grows with the bytes actually read, so a corrupt length cannot
/// force a large allocation. A short read is an `UnexpectedEof` error.
pub(crate) fn read_payload<R: Read>(r: &mut R, len: usize) -> std::io::Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(len.min(MAX_PREALLOC));
    r.by_ref().take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("record payload truncated: {} of {len} bytes", payload.len()),
        ));
    }
    Ok(payload)
}

fn write_geom_id<W: Write>(w: &mut W, gid: &GeomId) -> Result<()> {
    let depth = u8::try_from(gid.address.len()).map_err(|_| {
        CodecError::InvalidFormat(format!("geom id address too deep: {}", gid.address.len()))
    })?;
    w.write_u32::<LittleEndian>(gid.kind)?;
    w.write_u8(depth)?;
    for &slot in &gid.address {
        w.write_u32::<LittleEndian>(slot)?;
    }
    Ok(())
}

fn read_geom_id<R: Read>(r: &mut R) -> Result<GeomId> {
    let kind = r.read_u32::<LittleEndian>()?;
    let depth = r.read_u8()? as usize;
    let mut address = Vec::with_capacity(depth);
    for _ in 0..depth {
        address.push(r.read_u32::<LittleEndian>()?);
    }
    Ok(GeomId { kind, address })
}

fn write_timestamp<W: Write>(w: &mut W, ts: &Timestamp) -> Result<()> {
    w.write_u8(ts.clock as u8)?;
    w.write_i64::<LittleEndian>(ts.ticks)?;
    Ok(())
}

fn read_timestamp<R: Read>(r: &mut R) -> Result<Timestamp> {
    let code = r.read_u8()?;
    let clock = Clock::from_u8(code)
        .ok_or_else(|| CodecError::InvalidFormat(format!("unknown clock code {code}")))?;
    let ticks = r.read_i64::<LittleEndian>()?;
    Ok(Timestamp { clock, ticks })
}

fn write_origin<W: Write>(w: &mut W, origin: &RtdOrigin) -> Result<()> {
    w.write_i32::<LittleEndian>(origin.hit_number)?;
    w.write_i32::<LittleEndian>(origin.trigger_id)?;
    Ok(())
}

fn read_origin<R: Read>(r: &mut R) -> Result<RtdOrigin> {
    let hit_number = r.read_i32::<LittleEndian>()?;
    let trigger_id = r.read_i32::<LittleEndian>()?;
    Ok(RtdOrigin::new(hit_number, trigger_id))
}

fn write_trigger_ids<W: Write>(w: &mut W, ids: &BTreeSet<i32>) -> Result<()> {
    write_len(w, ids.len())?;
    for &id in ids {
        w.write_i32::<LittleEndian>(id)?;
    }
    Ok(())
}

fn read_trigger_ids<R: Read>(r: &mut R) -> Result<BTreeSet<i32>> {
    let count = read_len(r)?;
    let mut ids = BTreeSet::new();
    for _ in 0..count {
        ids.insert(r.read_i32::<LittleEndian>()?);
    }
    Ok(ids)
}

fn write_waveform<W: Write>(w: &mut W, waveform: Option<&[i16]>) -> Result<()> {
    write_bool(w, waveform.is_some())?;
    if let Some(samples) = waveform {
        write_len(w, samples.len())?;
        for &sample in samples {
            w.write_i16::<LittleEndian>(sample)?;
        }
    }
    Ok(())
}

fn read_waveform<R: Read>(r: &mut R) -> Result<Option<Vec<i16>>> {
    if !read_bool(r)? {
        return Ok(None);
    }
    let count = read_len(r)?;
    let mut samples = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        samples.push(r.read_i16::<LittleEndian>()?);
    }
    Ok(Some(samples))
}

// ============================================================================
// Properties
// ============================================================================

fn write_property_value<W: Write>(w: &mut W, value: &PropertyValue) -> Result<()> {
    w.write_u8(value.type_code())?;
    match value {
        PropertyValue::Boolean(v) => write_bool(w, *v)?,
        PropertyValue::Integer(v) => w.write_i64::<LittleEndian>(*v)?,
        PropertyValue::Real(v) => w.write_f64::<LittleEndian>(*v)?,
        PropertyValue::Text(v) => write_string(w, v)?,
        PropertyValue::Integers(values) => {
            write_len(w, values.len())?;
            for &v in values {
                w.write_i64::<LittleEndian>(v)?;
            }
        }
        PropertyValue::Reals(values) => {
            write_len(w, values.len())?;
            for &v in values {
                w.write_f64::<LittleEndian>(v)?;
            }
        }
    }
    Ok(())
}

fn read_property_value<R: Read>(r: &mut R) -> Result<PropertyValue> {
    let code = r.read_u8()?;
    let value = match code {
        0 => PropertyValue::Boolean(read_bool(r)?),
        1 => PropertyValue::Integer(r.read_i64::<LittleEndian>()?),
        2 => PropertyValue::Real(r.read_f64::<LittleEndian>()?),
        3 => PropertyValue::Text(read_string(r)?),
        4 => {
            let count = read_len(r)?;
            let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
            for _ in 0..count {
                values.push(r.read_i64::<LittleEndian>()?);
            }
            PropertyValue::Integers(values)
        }
        5 => {
            let count = read_len(r)?;
            let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
            for _ in 0..count {
                values.push(r.read_f64::<LittleEndian>()?);
            }
            PropertyValue::Reals(values)
        }
        other => {
            return Err(CodecError::InvalidFormat(format!(
                "unknown property type code {other}"
            )))
        }
    };
    Ok(value)
}

fn write_properties<W: Write>(w: &mut W, props: &Properties) -> Result<()> {
    write_len(w, props.len())?;
    for (key, value) in props.iter() {
        write_string(w, key)?;
        write_property_value(w, value)?;
    }
    Ok(())
}

fn read_properties<R: Read>(r: &mut R) -> Result<Properties> {
    let count = read_len(r)?;
    let mut props = Properties::new();
    for _ in 0..count {
        let key = read_string(r)?;
        let value = read_property_value(r)?;
        props.store(key, value);
    }
    Ok(props)
}

// ============================================================================
// RED record
// ============================================================================

fn write_trigger_record<W: Write>(w: &mut W, record: &TriggerRecord) -> Result<()> {
    w.write_i32::<LittleEndian>(record.trigger_id)?;
    write_bool(w, record.trigger_decision)?;
    write_bool(w, record.progenitor_trigger_id.is_some())?;
    w.write_i32::<LittleEndian>(record.progenitor_trigger_id.unwrap_or(-1))?;
    Ok(())
}

fn read_trigger_record<R: Read>(r: &mut R) -> Result<TriggerRecord> {
    let trigger_id = r.read_i32::<LittleEndian>()?;
    let trigger_decision = read_bool(r)?;
    let has_progenitor = read_bool(r)?;
    let progenitor = r.read_i32::<LittleEndian>()?;
    Ok(TriggerRecord {
        trigger_id,
        trigger_decision,
        progenitor_trigger_id: has_progenitor.then_some(progenitor),
    })
}

fn write_red_calo_hit<W: Write>(w: &mut W, hit: &red::CaloDigitizedHit) -> Result<()> {
    write_geom_id(w, &hit.geom_id)?;
    w.write_i32::<LittleEndian>(hit.hit_id)?;
    write_timestamp(w, &hit.reference_time)?;
    write_waveform(w, hit.waveform.as_deref())?;
    write_bool(w, hit.low_threshold_only)?;
    write_bool(w, hit.high_threshold)?;
    w.write_u16::<LittleEndian>(hit.fcr)?;
    w.write_u16::<LittleEndian>(hit.lt_trigger_counter)?;
    w.write_u32::<LittleEndian>(hit.lt_time_counter)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_baseline)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_peak_amplitude)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_peak_cell)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_charge)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_rising_cell)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_falling_cell)?;
    write_origin(w, &hit.origin)?;
    Ok(())
}

fn read_red_calo_hit<R: Read>(r: &mut R) -> Result<red::CaloDigitizedHit> {
    Ok(red::CaloDigitizedHit {
        geom_id: read_geom_id(r)?,
        hit_id: r.read_i32::<LittleEndian>()?,
        reference_time: read_timestamp(r)?,
        waveform: read_waveform(r)?,
        low_threshold_only: read_bool(r)?,
        high_threshold: read_bool(r)?,
        fcr: r.read_u16::<LittleEndian>()?,
        lt_trigger_counter: r.read_u16::<LittleEndian>()?,
        lt_time_counter: r.read_u32::<LittleEndian>()?,
        fwmeas_baseline: r.read_i16::<LittleEndian>()?,
        fwmeas_peak_amplitude: r.read_i16::<LittleEndian>()?,
        fwmeas_peak_cell: r.read_i16::<LittleEndian>()?,
        fwmeas_charge: r.read_i32::<LittleEndian>()?,
        fwmeas_rising_cell: r.read_i32::<LittleEndian>()?,
        fwmeas_falling_cell: r.read_i32::<LittleEndian>()?,
        origin: read_origin(r)?,
    })
}

fn write_red_channel<W: Write>(w: &mut W, channel: &red::GeigerChannel) -> Result<()> {
    write_bool(w, channel.time.is_some())?;
    if let Some(time) = &channel.time {
        write_timestamp(w, time)?;
    }
    write_origin(w, &channel.origin)
}

fn read_red_channel<R: Read>(r: &mut R) -> Result<red::GeigerChannel> {
    let time = if read_bool(r)? {
        Some(read_timestamp(r)?)
    } else {
        None
    };
    let origin = read_origin(r)?;
    Ok(red::GeigerChannel { time, origin })
}

fn write_red_tracker_hit<W: Write>(w: &mut W, hit: &red::TrackerDigitizedHit) -> Result<()> {
    write_geom_id(w, &hit.geom_id)?;
    w.write_i32::<LittleEndian>(hit.hit_id)?;
    write_len(w, hit.times.len())?;
    for times in &hit.times {
        for anode in &times.anodes {
            write_red_channel(w, anode)?;
        }
        write_red_channel(w, &times.bottom_cathode)?;
        write_red_channel(w, &times.top_cathode)?;
    }
    Ok(())
}

fn read_red_tracker_hit<R: Read>(r: &mut R) -> Result<red::TrackerDigitizedHit> {
    let geom_id = read_geom_id(r)?;
    let hit_id = r.read_i32::<LittleEndian>()?;
    let count = read_len(r)?;
    let mut times = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let mut anodes = [red::GeigerChannel::default(); ANODE_RANKS];
        for anode in anodes.iter_mut() {
            *anode = read_red_channel(r)?;
        }
        times.push(red::GeigerTimes {
            anodes,
            bottom_cathode: read_red_channel(r)?,
            top_cathode: read_red_channel(r)?,
        });
    }
    Ok(red::TrackerDigitizedHit {
        geom_id,
        hit_id,
        times,
    })
}

/// Encodes a raw event record (payload only, without the record tag).
pub fn encode_red<W: Write>(w: &mut W, record: &RawEventRecord) -> Result<()> {
    w.write_i32::<LittleEndian>(record.run_id)?;
    w.write_i32::<LittleEndian>(record.event_id)?;
    write_timestamp(w, &record.reference_time)?;
    write_trigger_ids(w, &record.origin_trigger_ids)?;

    write_len(w, record.trigger_records.len())?;
    for trigger in &record.trigger_records {
        write_trigger_record(w, trigger)?;
    }
    write_len(w, record.calo_hits.len())?;
    for hit in &record.calo_hits {
        write_red_calo_hit(w, hit)?;
    }
    write_len(w, record.tracker_hits.len())?;
    for hit in &record.tracker_hits {
        write_red_tracker_hit(w, hit)?;
    }

    write_properties(w, &record.auxiliaries)
}

/// Decodes a raw event record payload.
pub fn decode_red<R: Read>(r: &mut R) -> Result<RawEventRecord> {
    let run_id = r.read_i32::<LittleEndian>()?;
    let event_id = r.read_i32::<LittleEndian>()?;
    let reference_time = read_timestamp(r)?;
    let origin_trigger_ids = read_trigger_ids(r)?;

    let count = read_len(r)?;
    let mut trigger_records = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        trigger_records.push(read_trigger_record(r)?);
    }
    let count = read_len(r)?;
    let mut calo_hits = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        calo_hits.push(read_red_calo_hit(r)?);
    }
    let count = read_len(r)?;
    let mut tracker_hits = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        tracker_hits.push(read_red_tracker_hit(r)?);
    }

    Ok(RawEventRecord {
        run_id,
        event_id,
        origin_trigger_ids,
        trigger_records,
        calo_hits,
        tracker_hits,
        reference_time,
        auxiliaries: read_properties(r)?,
    })
}

// ============================================================================
// UDD event record
// ============================================================================

fn write_udd_calo_hit<W: Write>(w: &mut W, hit: &CalorimeterDigitizedHit) -> Result<()> {
    write_geom_id(w, &hit.geom_id)?;
    w.write_i32::<LittleEndian>(hit.hit_id)?;
    w.write_i64::<LittleEndian>(hit.timestamp)?;
    write_waveform(w, hit.waveform.as_deref())?;
    write_bool(w, hit.low_threshold_only)?;
    write_bool(w, hit.high_threshold)?;
    w.write_u16::<LittleEndian>(hit.fcr)?;
    w.write_u16::<LittleEndian>(hit.lt_trigger_counter)?;
    w.write_u32::<LittleEndian>(hit.lt_time_counter)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_baseline)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_peak_amplitude)?;
    w.write_i16::<LittleEndian>(hit.fwmeas_peak_cell)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_charge)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_rising_cell)?;
    w.write_i32::<LittleEndian>(hit.fwmeas_falling_cell)?;
    write_origin(w, &hit.origin)?;
    Ok(())
}

fn read_udd_calo_hit<R: Read>(r: &mut R) -> Result<CalorimeterDigitizedHit> {
    Ok(CalorimeterDigitizedHit {
        geom_id: read_geom_id(r)?,
        hit_id: r.read_i32::<LittleEndian>()?,
        timestamp: r.read_i64::<LittleEndian>()?,
        waveform: read_waveform(r)?,
        low_threshold_only: read_bool(r)?,
        high_threshold: read_bool(r)?,
        fcr: r.read_u16::<LittleEndian>()?,
        lt_trigger_counter: r.read_u16::<LittleEndian>()?,
        lt_time_counter: r.read_u32::<LittleEndian>()?,
        fwmeas_baseline: r.read_i16::<LittleEndian>()?,
        fwmeas_peak_amplitude: r.read_i16::<LittleEndian>()?,
        fwmeas_peak_cell: r.read_i16::<LittleEndian>()?,
        fwmeas_charge: r.read_i32::<LittleEndian>()?,
        fwmeas_rising_cell: r.read_i32::<LittleEndian>()?,
        fwmeas_falling_cell: r.read_i32::<LittleEndian>()?,
        origin: read_origin(r)?,
    })
}

fn write_udd_channel<W: Write>(w: &mut W, channel: &udd::GeigerTime) -> Result<()> {
    write_bool(w, channel.ticks.is_some())?;
    if let Some(ticks) = channel.ticks {
        w.write_i64::<LittleEndian>(ticks)?;
    }
    write_origin(w, &channel.origin)
}

fn read_udd_channel<R: Read>(r: &mut R) -> Result<udd::GeigerTime> {
    let ticks = if read_bool(r)? {
        Some(r.read_i64::<LittleEndian>()?)
    } else {
        None
    };
    let origin = read_origin(r)?;
    Ok(udd::GeigerTime { ticks, origin })
}

fn write_udd_tracker_hit<W: Write>(w: &mut W, hit: &udd::TrackerDigitizedHit) -> Result<()> {
    write_geom_id(w, &hit.geom_id)?;
    w.write_i32::<LittleEndian>(hit.hit_id)?;
    write_len(w, hit.times.len())?;
    for times in &hit.times {
        for anode in &times.anodes {
            write_udd_channel(w, anode)?;
        }
        write_udd_channel(w, &times.bottom_cathode)?;
        write_udd_channel(w, &times.top_cathode)?;
    }
    Ok(())
}

fn read_udd_tracker_hit<R: Read>(r: &mut R) -> Result<udd::TrackerDigitizedHit> {
    let geom_id = read_geom_id(r)?;
    let hit_id = r.read_i32::<LittleEndian>()?;
    let count = read_len(r)?;
    let mut times = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let mut anodes = [udd::GeigerTime::default(); ANODE_RANKS];
        for anode in anodes.iter_mut() {
            *anode = read_udd_channel(r)?;
        }
        times.push(udd::GeigerTimes {
            anodes,
            bottom_cathode: read_udd_channel(r)?,
            top_cathode: read_udd_channel(r)?,
        });
    }
    Ok(udd::TrackerDigitizedHit {
        geom_id,
        hit_id,
        times,
    })
}

fn write_header<W: Write>(w: &mut W, header: &EventHeader) -> Result<()> {
    w.write_i32::<LittleEndian>(header.id.run)?;
    w.write_i32::<LittleEndian>(header.id.event)?;
    w.write_u8(header.generation as u8)?;
    w.write_i64::<LittleEndian>(header.timestamp.seconds)?;
    w.write_i64::<LittleEndian>(header.timestamp.picoseconds)?;
    write_properties(w, &header.properties)
}

fn read_header<R: Read>(r: &mut R) -> Result<EventHeader> {
    let run = r.read_i32::<LittleEndian>()?;
    let event = r.read_i32::<LittleEndian>()?;
    let code = r.read_u8()?;
    let generation = Generation::from_u8(code)
        .ok_or_else(|| CodecError::InvalidFormat(format!("unknown generation code {code}")))?;
    let seconds = r.read_i64::<LittleEndian>()?;
    let picoseconds = r.read_i64::<LittleEndian>()?;
    Ok(EventHeader {
        id: EventId { run, event },
        generation,
        timestamp: EventTimestamp {
            seconds,
            picoseconds,
        },
        properties: read_properties(r)?,
    })
}

/// Encodes a converted event record (header then digitized data).
pub fn encode_event_record<W: Write>(w: &mut W, record: &EventRecord) -> Result<()> {
    write_header(w, &record.header)?;

    let udd = &record.udd;
    w.write_i32::<LittleEndian>(udd.run_id)?;
    w.write_i32::<LittleEndian>(udd.event_id)?;
    w.write_i64::<LittleEndian>(udd.reference_timestamp)?;
    write_trigger_ids(w, &udd.origin_trigger_ids)?;
    write_len(w, udd.calorimeter_hits.len())?;
    for hit in &udd.calorimeter_hits {
        write_udd_calo_hit(w, hit)?;
    }
    write_len(w, udd.tracker_hits.len())?;
    for hit in &udd.tracker_hits {
        write_udd_tracker_hit(w, hit)?;
    }
    Ok(())
}

/// Decodes a converted event record.
pub fn decode_event_record<R: Read>(r: &mut R) -> Result<EventRecord> {
    let header = read_header(r)?;

    let run_id = r.read_i32::<LittleEndian>()?;
    let event_id = r.read_i32::<LittleEndian>()?;
    let reference_timestamp = r.read_i64::<LittleEndian>()?;
    let origin_trigger_ids = read_trigger_ids(r)?;
    let count = read_len(r)?;
    let mut calorimeter_hits = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        calorimeter_hits.push(read_udd_calo_hit(r)?);
    }
    let count = read_len(r)?;
    let mut tracker_hits = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        tracker_hits.push(read_udd_tracker_hit(r)?);
    }

    Ok(EventRecord {
        header,
        udd: UnifiedDigitizedData {
            run_id,
            event_id,
            reference_timestamp,
            origin_trigger_ids,
            calorimeter_hits,
            tracker_hits,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_red() -> RawEventRecord {
        let mut gg = red::GeigerTimes::default();
        gg.anodes[0].time = Some(Timestamp::new(Clock::Clock80MHz, 77));
        gg.anodes[0].origin = RtdOrigin::new(2, 9);
        gg.bottom_cathode.time = Some(Timestamp::new(Clock::Clock80MHz, -3));

        let mut auxiliaries = Properties::new();
        auxiliaries.store("time_width", PropertyValue::Real(1e-6));
        auxiliaries.store("builder", PropertyValue::Text("delta-tdc".into()));
        auxiliaries.store("flags", PropertyValue::Integers(vec![1, -2]));

        RawEventRecord {
            run_id: 1166,
            event_id: 17,
            origin_trigger_ids: [9, 10].into_iter().collect(),
            trigger_records: vec![TriggerRecord {
                trigger_id: 9,
                trigger_decision: true,
                progenitor_trigger_id: Some(8),
            }],
            calo_hits: vec![red::CaloDigitizedHit {
                geom_id: GeomId::new(1302, [0, 1, 4, 7]),
                hit_id: 3,
                reference_time: Timestamp::new(Clock::Clock160MHz, 123),
                waveform: Some(vec![-1, 0, 2048]),
                fwmeas_charge: -4000,
                origin: RtdOrigin::new(0, 9),
                ..Default::default()
            }],
            tracker_hits: vec![red::TrackerDigitizedHit {
                geom_id: GeomId::new(1204, [0, 0, 3, 50]),
                hit_id: 1,
                times: vec![gg, red::GeigerTimes::default()],
            }],
            reference_time: Timestamp::new(Clock::Clock40MHz, 40_000_000),
            auxiliaries,
        }
    }

    #[test]
    fn test_red_round_trip() {
        let record = sample_red();
        let mut buf = Vec::new();
        encode_red(&mut buf, &record).unwrap();
        let decoded = decode_red(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_event_record_round_trip_keeps_waveform_absence() {
        let record = EventRecord {
            header: EventHeader {
                id: EventId { run: 1, event: 2 },
                generation: Generation::Real,
                timestamp: EventTimestamp {
                    seconds: 1_700_000_000,
                    picoseconds: 25_000,
                },
                properties: [(
                    "deltat_previous_event".to_string(),
                    PropertyValue::Real(-0.5),
                )]
                .into_iter()
                .collect(),
            },
            udd: UnifiedDigitizedData {
                run_id: 1,
                event_id: 2,
                reference_timestamp: 99,
                origin_trigger_ids: [4].into_iter().collect(),
                calorimeter_hits: vec![
                    CalorimeterDigitizedHit {
                        waveform: None,
                        ..Default::default()
                    },
                    CalorimeterDigitizedHit {
                        hit_id: 1,
                        waveform: Some(Vec::new()),
                        ..Default::default()
                    },
                ],
                tracker_hits: Vec::new(),
            },
        };

        let mut buf = Vec::new();
        encode_event_record(&mut buf, &record).unwrap();
        let decoded = decode_event_record(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.udd.calorimeter_hits[0].waveform, None);
        assert_eq!(decoded.udd.calorimeter_hits[1].waveform, Some(Vec::new()));
    }

    #[test]
    fn test_truncated_payload_is_io_error() {
        let mut buf = Vec::new();
        encode_red(&mut buf, &sample_red()).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(matches!(
            decode_red(&mut Cursor::new(&buf)),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn test_read_payload_is_bounded_by_input() {
        let bytes = [1u8, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&bytes[..]);
        assert_eq!(read_payload(&mut cursor, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(cursor.position(), 3);

        // A huge declared length fails on the data at hand
        let err = read_payload(&mut Cursor::new(&bytes[..]), u32::MAX as usize).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_codes_are_rejected() {
        // run, event, then clock code 9
        let mut buf = Vec::new();
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.push(9);
        buf.extend_from_slice(&0i64.to_le_bytes());
        assert!(matches!(
            decode_red(&mut Cursor::new(&buf)),
            Err(CodecError::InvalidFormat(_))
        ));

        let mut props = Vec::new();
        props.extend_from_slice(&1u32.to_le_bytes());
        write_string(&mut props, "key").unwrap();
        props.push(42);
        assert!(matches!(
            read_properties(&mut Cursor::new(&props)),
            Err(CodecError::InvalidFormat(_))
        ));
    }
}
