//! Sensor descriptions, raw sample buffers and the aggregation kernel.
//!
//! A [`SensorMeta`] says how one sensor type is sampled: how often, how
//! many physical IDs, how many resamples per ID, and how aggressively to
//! reject impulse noise.  The bus drivers hand back a [`SampleBuffer`] per
//! read which [`outlier::aggregate_into`] folds into one arena event.

pub mod outlier;
pub mod stats;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::{Climate, MAX_SENSOR_ITEMS, SensorKind};

/// Upper bound on resamples per ID per read.
pub const MAX_RESAMPLES: usize = 8;

/// Upper bound on raw samples in one buffer.
pub const MAX_RAW_SAMPLES: usize = MAX_SENSOR_ITEMS * MAX_RESAMPLES;

/// Non-negative rational configured as a numerator/denominator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    num: u32,
    den: u32,
}

impl Ratio {
    /// Fails with `InvalidRequest` on a zero denominator.
    pub fn new(num: u32, den: u32) -> Result<Self> {
        if den == 0 {
            return Err(Error::InvalidRequest);
        }
        Ok(Self { num, den })
    }

    /// Compile-time constructor for defaults.
    pub const fn of(num: u32, den: u32) -> Self {
        assert!(den != 0, "ratio denominator must be non-zero");
        Self { num, den }
    }

    /// Value as a float; a zero denominator (only reachable through
    /// deserialisation) reads as zero.
    pub fn value(self) -> f32 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f32 / self.den as f32
    }

    pub fn parts(self) -> (u32, u32) {
        (self.num, self.den)
    }
}

/// Adaptive soil sampling while the pump is running.
///
/// The read interval is divided by `divisor`; intermediate reads only
/// sample the IDs in `enabled_ids` and every `divisor`-th read is a full
/// read of every ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastPoll {
    pub divisor: u8,
    pub enabled_ids: u16,
    countdown: u8,
    active: bool,
}

impl FastPoll {
    pub const fn new(divisor: u8, enabled_ids: u16) -> Self {
        Self {
            divisor,
            enabled_ids,
            countdown: 0,
            active: false,
        }
    }

    /// Switch to fast polling (coupled actuator started).
    pub fn engage(&mut self) {
        if !self.active {
            self.active = true;
            self.countdown = self.divisor.max(1);
        }
    }

    /// Back to the normal cadence.
    pub fn release(&mut self) {
        self.active = false;
        self.countdown = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Keep the runtime state of `previous` across a reconfiguration.
    pub fn carry_state_from(&mut self, previous: &FastPoll) {
        self.active = previous.active;
        self.countdown = previous.countdown.min(self.divisor.max(1));
    }

    /// Interval between reads given the configured one.
    pub fn interval(&self, read_interval: u32) -> u32 {
        if self.active && self.divisor > 1 {
            (read_interval / u32::from(self.divisor)).max(1)
        } else {
            read_interval
        }
    }

    /// IDs to sample on the next read; advances the countdown.
    pub fn next_mask(&mut self, all_ids: u16) -> u16 {
        if !self.active || self.divisor <= 1 {
            return all_ids;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.divisor;
            all_ids
        } else {
            self.enabled_ids & all_ids
        }
    }
}

/// How one sensor type is sampled and filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMeta {
    pub kind: SensorKind,
    /// Ticks between reads.
    pub read_interval: u32,
    /// Physical IDs of this type.
    pub num_items: u8,
    /// Raw readings per ID per read.
    pub num_resamples: u8,
    /// Modified z-score beyond which a sample is an outlier.
    pub outlier_threshold: Ratio,
    /// Lower bound on the MAD, so near-constant input doesn't flag everything.
    pub mad_floor: Ratio,
    /// Soil only.
    pub fast_poll: Option<FastPoll>,
}

impl SensorMeta {
    pub fn soil_default() -> Self {
        Self {
            kind: SensorKind::SoilMoisture,
            read_interval: 60_000,
            num_items: 2,
            num_resamples: 5,
            outlier_threshold: Ratio::of(35, 10),
            mad_floor: Ratio::of(5, 1),
            fast_poll: Some(FastPoll::new(6, 0b01)),
        }
    }

    pub fn air_default() -> Self {
        Self {
            kind: SensorKind::AirClimate,
            read_interval: 30_000,
            num_items: 1,
            num_resamples: 3,
            outlier_threshold: Ratio::of(35, 10),
            mad_floor: Ratio::of(1, 2),
            fast_poll: None,
        }
    }

    pub fn light_default() -> Self {
        Self {
            kind: SensorKind::Lightness,
            read_interval: 60_000,
            num_items: 1,
            num_resamples: 3,
            outlier_threshold: Ratio::of(35, 10),
            mad_floor: Ratio::of(10, 1),
            fast_poll: None,
        }
    }

    pub fn default_for(kind: SensorKind) -> Self {
        match kind {
            SensorKind::SoilMoisture => Self::soil_default(),
            SensorKind::AirClimate => Self::air_default(),
            SensorKind::Lightness => Self::light_default(),
        }
    }

    /// Bitmask with one bit per configured ID.
    pub fn all_ids(&self) -> u16 {
        ((1u32 << self.num_items.min(16)) - 1) as u16
    }

    /// Ticks until the next read, honouring fast polling.
    pub fn effective_interval(&self) -> u32 {
        match &self.fast_poll {
            Some(fp) => fp.interval(self.read_interval),
            None => self.read_interval,
        }
    }

    /// IDs to sample on the next read.
    pub fn next_read_mask(&mut self) -> u16 {
        let all = self.all_ids();
        match &mut self.fast_poll {
            Some(fp) => fp.next_mask(all),
            None => all,
        }
    }

    pub fn sample_count(&self) -> usize {
        usize::from(self.num_items) * usize::from(self.num_resamples)
    }

    /// Structural limits every meta must respect.
    pub fn validate(&self) -> Result<()> {
        if self.read_interval == 0
            || self.num_items == 0
            || usize::from(self.num_items) > MAX_SENSOR_ITEMS
            || self.num_resamples == 0
            || usize::from(self.num_resamples) > MAX_RESAMPLES
            || self.outlier_threshold.value() <= 0.0
            || self.mad_floor.value() <= 0.0
        {
            return Err(Error::InvalidRequest);
        }
        Ok(())
    }
}

/// Raw samples in ID-major order: ID 0's resamples, then ID 1's, ...
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    Scalar(Vec<u32, MAX_RAW_SAMPLES>),
    Climate(Vec<Climate, MAX_RAW_SAMPLES>),
}

impl RawSamples {
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

/// One read of a sensor type, as handed back by the bus driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub kind: SensorKind,
    pub num_items: u8,
    pub num_resamples: u8,
    /// IDs actually sampled; the rest are left unwritten in the event.
    pub read_mask: u16,
    pub samples: RawSamples,
}

impl SampleBuffer {
    /// Build from ID-major scalar readings.
    pub fn from_scalars(kind: SensorKind, num_items: u8, num_resamples: u8, values: &[u32]) -> Result<Self> {
        if kind.is_climate() {
            return Err(Error::UnsupportedType);
        }
        let samples = Vec::from_slice(values).map_err(|()| Error::OutOfMemory)?;
        Self::checked(kind, num_items, num_resamples, RawSamples::Scalar(samples))
    }

    /// Build from ID-major climate readings.
    pub fn from_climate(num_items: u8, num_resamples: u8, values: &[Climate]) -> Result<Self> {
        let samples = Vec::from_slice(values).map_err(|()| Error::OutOfMemory)?;
        Self::checked(SensorKind::AirClimate, num_items, num_resamples, RawSamples::Climate(samples))
    }

    /// Restrict to the given IDs.
    #[must_use]
    pub fn with_read_mask(mut self, mask: u16) -> Self {
        self.read_mask &= mask;
        self
    }

    fn checked(kind: SensorKind, num_items: u8, num_resamples: u8, samples: RawSamples) -> Result<Self> {
        if samples.len() != usize::from(num_items) * usize::from(num_resamples) {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            kind,
            num_items,
            num_resamples,
            read_mask: ((1u32 << num_items.min(16)) - 1) as u16,
            samples,
        })
    }
}
