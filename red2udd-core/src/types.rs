//! Leaf value types shared by the raw (RED) and normalized (UDD) data models.
//!
//! These are plain values: geometry identifiers, clock readings, origin
//! back-references and the auxiliary property bag. Neither model borrows from
//! the other; the converter copies these values across.

use std::collections::BTreeMap;

/// Number of picoseconds in one second.
pub const PICOSECONDS_PER_SECOND: i64 = 1_000_000_000_000;

/// A geometry identifier: a category number plus an address path.
///
/// The meaning of each address slot depends on the category, e.g. a main-wall
/// optical module is addressed as `[module, side, column, row]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GeomId {
    /// Geometry category (1302 = main-wall OM, 1204 = Geiger cell, ...)
    pub kind: u32,
    /// Address path within the category
    pub address: Vec<u32>,
}

impl GeomId {
    /// Creates a new geometry identifier.
    pub fn new(kind: u32, address: impl Into<Vec<u32>>) -> Self {
        Self {
            kind,
            address: address.into(),
        }
    }

    /// Returns the address slot at `index`, if present.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.address.get(index).copied()
    }
}

/// Front-end clock that produced a tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Clock {
    /// No clock attached; ticks cannot be converted to time
    #[default]
    Undefined = 0,
    /// 40 MHz clock (25 ns/tick)
    Clock40MHz = 1,
    /// 80 MHz clock (12.5 ns/tick)
    Clock80MHz = 2,
    /// 160 MHz clock (6.25 ns/tick)
    Clock160MHz = 3,
}

impl Clock {
    /// Attempts to parse a clock from its wire code.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Clock40MHz),
            2 => Some(Self::Clock80MHz),
            3 => Some(Self::Clock160MHz),
            _ => None,
        }
    }

    /// Tick period in integer picoseconds, or `None` for [`Clock::Undefined`].
    #[inline]
    pub fn period_ps(self) -> Option<i64> {
        match self {
            Self::Undefined => None,
            Self::Clock40MHz => Some(25_000),
            Self::Clock80MHz => Some(12_500),
            Self::Clock160MHz => Some(6_250),
        }
    }
}

/// A raw clock reading: tick count plus the clock it was counted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub clock: Clock,
    pub ticks: i64,
}

impl Timestamp {
    #[inline]
    pub fn new(clock: Clock, ticks: i64) -> Self {
        Self { clock, ticks }
    }

    /// Elapsed time since tick zero in integer picoseconds.
    ///
    /// Returns `None` when the clock is undefined or the product overflows.
    pub fn to_picoseconds(&self) -> Option<i64> {
        self.clock
            .period_ps()
            .and_then(|period| self.ticks.checked_mul(period))
    }
}

/// Back-reference to the trigger sub-record hit a digitized hit came from.
///
/// Copied by value; it never points into a live raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RtdOrigin {
    /// Index of the hit within the originating trigger sub-record
    pub hit_number: i32,
    /// Trigger id of the originating trigger sub-record
    pub trigger_id: i32,
}

impl RtdOrigin {
    pub const INVALID: RtdOrigin = RtdOrigin {
        hit_number: -1,
        trigger_id: -1,
    };

    #[inline]
    pub fn new(hit_number: i32, trigger_id: i32) -> Self {
        Self {
            hit_number,
            trigger_id,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.hit_number >= 0 && self.trigger_id >= 0
    }
}

impl Default for RtdOrigin {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A typed value stored in a [`Properties`] bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Integers(Vec<i64>),
    Reals(Vec<f64>),
}

impl PropertyValue {
    /// Wire code of the value variant.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Integer(_) => 1,
            Self::Real(_) => 2,
            Self::Text(_) => 3,
            Self::Integers(_) => 4,
            Self::Reals(_) => 5,
        }
    }
}

/// Ordered key/value property bag.
///
/// Keys iterate in lexical order so encoded output is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    entries: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn store(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the value under `key` if it is a real number.
    pub fn fetch_real(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(PropertyValue::Real(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value under `key` if it is an integer array.
    pub fn fetch_integers(&self, key: &str) -> Option<&[i64]> {
        match self.entries.get(key) {
            Some(PropertyValue::Integers(v)) => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
