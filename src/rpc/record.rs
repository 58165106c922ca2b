//! Per-sensor ring buffers of event handles.
//!
//! ```text
//!   capacity 4, cursor = 1
//!   ┌──────┬──────┬──────┬──────┐
//!   │  e4  │  e1  │ hole │  e3  │
//!   └──────┴──────┴──────┴──────┘
//!            ▲ oldest        newest = slot 0
//! ```
//!
//! Logical order runs from `cursor` (oldest) to `cursor − 1` (newest).  A
//! slot cleared from outside is a hole: readers skip it and the next insert
//! that lands on it evicts nothing.

use heapless::Vec;

use crate::events::{EventHandle, SensorKind, SharedArena};

/// Ring capacity for soil moisture events.
pub const SOIL_RECORDS: usize = 8;
/// Ring capacity for air climate events.
pub const AIR_RECORDS: usize = 12;
/// Ring capacity for lightness events.
pub const LIGHT_RECORDS: usize = 6;
/// Largest ring.
pub const MAX_RECORDS: usize = 12;

/// Fixed-capacity ring of optional handles.
#[derive(Debug, Clone)]
pub struct SensorRecord<const M: usize> {
    slots: [Option<EventHandle>; M],
    cursor: usize,
}

impl<const M: usize> SensorRecord<M> {
    pub const fn new() -> Self {
        Self {
            slots: [None; M],
            cursor: 0,
        }
    }

    /// Store `handle` as the newest entry.  Returns the handle it displaced,
    /// which the caller must free.
    pub fn insert(&mut self, handle: EventHandle) -> Option<EventHandle> {
        let evicted = self.slots[self.cursor].replace(handle);
        self.cursor = (self.cursor + 1) % M;
        evicted
    }

    /// Punch a hole where `handle` is stored.  Returns whether it was found.
    pub fn clear(&mut self, handle: EventHandle) -> bool {
        match self.slots.iter_mut().find(|s| **s == Some(handle)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Stored handles, newest first, holes skipped.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = EventHandle> + '_ {
        (1..=M).filter_map(move |back| self.slots[(self.cursor + M - back) % M])
    }

    /// Stored handles, oldest first, holes skipped.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = EventHandle> + '_ {
        (0..M).filter_map(move |i| self.slots[(self.cursor + i) % M])
    }

    /// Empty every slot, handing each stored handle to `release`.
    pub fn drain(&mut self, mut release: impl FnMut(EventHandle)) {
        for slot in &mut self.slots {
            if let Some(h) = slot.take() {
                release(h);
            }
        }
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        M
    }
}

impl<const M: usize> Default for SensorRecord<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// One ring per sensor type, feeding the telemetry encoder.
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
    soil: SensorRecord<SOIL_RECORDS>,
    air: SensorRecord<AIR_RECORDS>,
    light: SensorRecord<LIGHT_RECORDS>,
}

impl RecordLog {
    pub const fn new() -> Self {
        Self {
            soil: SensorRecord::new(),
            air: SensorRecord::new(),
            light: SensorRecord::new(),
        }
    }

    pub fn insert(&mut self, kind: SensorKind, handle: EventHandle) -> Option<EventHandle> {
        match kind {
            SensorKind::SoilMoisture => self.soil.insert(handle),
            SensorKind::AirClimate => self.air.insert(handle),
            SensorKind::Lightness => self.light.insert(handle),
        }
    }

    /// Punch a hole for `handle` in whichever ring holds it.
    pub fn clear(&mut self, handle: EventHandle) -> bool {
        self.soil.clear(handle) || self.air.clear(handle) || self.light.clear(handle)
    }

    pub fn newest_first(&self, kind: SensorKind) -> Vec<EventHandle, MAX_RECORDS> {
        match kind {
            SensorKind::SoilMoisture => self.soil.iter_newest_first().collect(),
            SensorKind::AirClimate => self.air.iter_newest_first().collect(),
            SensorKind::Lightness => self.light.iter_newest_first().collect(),
        }
    }

    pub fn capacity(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::SoilMoisture => self.soil.capacity(),
            SensorKind::AirClimate => self.air.capacity(),
            SensorKind::Lightness => self.light.capacity(),
        }
    }

    pub fn len(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::SoilMoisture => self.soil.len(),
            SensorKind::AirClimate => self.air.len(),
            SensorKind::Lightness => self.light.len(),
        }
    }

    /// Empty every ring and return the stored events to the arena.
    pub fn release_all<const N: usize>(&mut self, arena: &SharedArena<N>) -> usize {
        let mut freed = 0;
        let mut release = |h: EventHandle| {
            if arena.free(h).is_ok() {
                freed += 1;
            }
        };
        self.soil.drain(&mut release);
        self.air.drain(&mut release);
        self.light.drain(&mut release);
        freed
    }
}
