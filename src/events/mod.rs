//! Aggregated sensor events and the pools that carry them.
//!
//! ```text
//!  raw samples ─▶ Aggregator ─▶ SensorEvent (arena slot)
//!                                   │
//!                     ┌─────────────┴─────────────┐
//!                     ▼                           ▼
//!              actuator loop                consumer queues
//!           (immediate decision)        (display · network ring)
//! ```
//!
//! An event is owned by the [`arena::EventArena`] for as long as its slot is
//! allocated.  Everything else (queues, ring slots, the control loop) holds a
//! plain [`arena::EventHandle`] and must go back through the arena to read it.

pub mod arena;
pub mod queue;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

pub use arena::{EventArena, EventHandle, EventSource, SharedArena};
pub use queue::{EventQueue, Wait};

/// Upper bound on physical sensor IDs behind one sensor type.
pub const MAX_SENSOR_ITEMS: usize = 8;

/// Physical sensor type; one event always covers a single type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SensorKind {
    SoilMoisture = 0,
    AirClimate = 1,
    Lightness = 2,
}

impl SensorKind {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::SoilMoisture, Self::AirClimate, Self::Lightness];

    /// Key used for this sensor type on the wire.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::SoilMoisture => "soilmoist",
            Self::AirClimate => "airtemp",
            Self::Lightness => "light",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == name)
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether readings of this type carry a temperature/humidity pair.
    pub const fn is_climate(self) -> bool {
        matches!(self, Self::AirClimate)
    }
}

/// One air reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

/// Per-ID values of an event, one entry per active sensor ID.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Scalar(Vec<u32, MAX_SENSOR_ITEMS>),
    Climate(Vec<Climate, MAX_SENSOR_ITEMS>),
}

impl Payload {
    pub const fn empty() -> Self {
        Self::Scalar(Vec::new())
    }

    /// Zeroed payload of `count` elements in the value type of `kind`.
    /// `count` must not exceed [`MAX_SENSOR_ITEMS`].
    pub(crate) fn zeroed(kind: SensorKind, count: usize) -> Self {
        let count = count.min(MAX_SENSOR_ITEMS);
        if kind.is_climate() {
            let mut values = Vec::new();
            values.resize_default(count).ok();
            Self::Climate(values)
        } else {
            let mut values = Vec::new();
            values.resize_default(count).ok();
            Self::Scalar(values)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::Climate(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One aggregated reading of a sensor type, covering all of its IDs.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorKind,
    /// Number of active physical sensors (payload length).
    pub active: u8,
    /// Bit `i` set: the aggregate for ID `i` is unreliable.
    pub corrupted: u16,
    /// Bit `i` set: ID `i` was sampled and its aggregate written.
    pub written: u16,
    pub payload: Payload,
    pub timestamp: Timestamp,
    pub(crate) allocated: bool,
}

impl SensorEvent {
    /// A free, zeroed slot.
    pub const fn empty() -> Self {
        Self {
            kind: SensorKind::SoilMoisture,
            active: 0,
            corrupted: 0,
            written: 0,
            payload: Payload::empty(),
            timestamp: Timestamp { day: 0, ticks: 0 },
            allocated: false,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    pub fn is_corrupted(&self, id: usize) -> bool {
        id < 16 && self.corrupted & (1 << id) != 0
    }

    pub fn is_written(&self, id: usize) -> bool {
        id < 16 && self.written & (1 << id) != 0
    }

    /// Scalar value of ID `id`, if this is a scalar event and the ID exists.
    pub fn scalar(&self, id: usize) -> Option<u32> {
        match &self.payload {
            Payload::Scalar(v) => v.get(id).copied(),
            Payload::Climate(_) => None,
        }
    }

    /// Climate value of ID `id`, if this is a climate event and the ID exists.
    pub fn climate(&self, id: usize) -> Option<Climate> {
        match &self.payload {
            Payload::Climate(v) => v.get(id).copied(),
            Payload::Scalar(_) => None,
        }
    }
}

impl Default for SensorEvent {
    fn default() -> Self {
        Self::empty()
    }
}
