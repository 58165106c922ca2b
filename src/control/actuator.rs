//! Actuator duty-cycle state machine.
//!
//! ```text
//!            max_worktime > 0
//!     ┌─────┐ ─────────────▶ ┌────┐  curr_worktime ≥ max  ┌───────┐
//!     │ OFF │                │ ON │ ────────────────────▶ │ PAUSE │
//!     └─────┘ ◀───────┐      └────┘ ◀──────────────────── └───────┘
//!        ▲            │               curr_resttime ≥ min
//!        │ step()     │ should not run (timers kept)
//!     ┌────────┐      │
//!     │ BROKEN │      └── from ON / PAUSE
//!     └────────┘
//! ```
//!
//! The timer machine ([`Actuator::step`]) is independent of the trigger
//! decision.  [`Actuator::evaluate`] smooths the sensed value, compares it
//! against the threshold and then either advances the timers or forces
//! OFF.  [`ActuatorLoop`] adds the output side: the port is written once
//! per status change, never on every evaluation.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ActuatorPort;
use crate::config::ActuatorConfig;
use crate::error::Result;
use crate::events::{Payload, SensorEvent, SensorKind};
use crate::sensors::stats;

// ───────────────────────────────────────────────────────────────
// Identity and status
// ───────────────────────────────────────────────────────────────

/// Physical actuators of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorId {
    Pump,
    Fan,
    Bulb,
}

impl ActuatorId {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Pump, Self::Fan, Self::Bulb];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Fan => "fan",
            Self::Bulb => "bulb",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.wire_name() == name)
    }

    /// Sensor type whose events drive this actuator.
    pub const fn sensor(self) -> SensorKind {
        match self {
            Self::Pump => SensorKind::SoilMoisture,
            Self::Fan => SensorKind::AirClimate,
            Self::Bulb => SensorKind::Lightness,
        }
    }

    /// Actuator coupled to `kind`.
    pub const fn for_sensor(kind: SensorKind) -> Self {
        match kind {
            SensorKind::SoilMoisture => Self::Pump,
            SensorKind::AirClimate => Self::Fan,
            SensorKind::Lightness => Self::Bulb,
        }
    }

    /// Pump and fan run above the threshold, the bulb below it.
    pub const fn should_run(self, value: i32, threshold: i32) -> bool {
        match self {
            Self::Pump | Self::Fan => value > threshold,
            Self::Bulb => value < threshold,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuatorStatus {
    Off,
    On,
    Pause,
    Broken,
}

impl ActuatorStatus {
    /// Whether the physical output is energised in this status.
    pub const fn is_energised(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Fixed-point exponential moving average.  The first value primes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ema {
    pub lambda: u8,
    value: i32,
    primed: bool,
}

impl Ema {
    pub const fn new(lambda: u8) -> Self {
        Self {
            lambda,
            value: 0,
            primed: false,
        }
    }

    pub fn update(&mut self, sample: i32) -> i32 {
        self.value = if self.primed {
            stats::ema(sample, self.value, self.lambda)
        } else {
            self.primed = true;
            sample
        };
        self.value
    }

    pub fn value(&self) -> Option<i32> {
        self.primed.then_some(self.value)
    }

    pub fn reset(&mut self) {
        self.primed = false;
        self.value = 0;
    }
}

// ───────────────────────────────────────────────────────────────
// Timer machine
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actuator {
    pub id: ActuatorId,
    pub status: ActuatorStatus,
    pub threshold: i32,
    pub max_worktime: u32,
    pub min_resttime: u32,
    pub curr_worktime: u32,
    pub curr_resttime: u32,
    pub ema: Ema,
    /// Sensor IDs feeding this actuator.
    pub sensor_mask: u16,
}

impl Actuator {
    pub fn new(id: ActuatorId, config: &ActuatorConfig) -> Self {
        Self {
            id,
            status: ActuatorStatus::Off,
            threshold: config.threshold,
            max_worktime: config.max_worktime,
            min_resttime: config.min_resttime,
            curr_worktime: 0,
            curr_resttime: 0,
            ema: Ema::new(config.ema_lambda),
            sensor_mask: config.sensor_mask,
        }
    }

    /// Take over new limits; status, timers and the EMA state are kept.
    pub fn apply_config(&mut self, config: &ActuatorConfig) {
        self.threshold = config.threshold;
        self.max_worktime = config.max_worktime;
        self.min_resttime = config.min_resttime;
        self.ema.lambda = config.ema_lambda;
        self.sensor_mask = config.sensor_mask;
    }

    /// Advance the duty cycle by `elapsed` ticks.
    pub fn step(&mut self, elapsed: u32) -> ActuatorStatus {
        match self.status {
            ActuatorStatus::Off => {
                if self.max_worktime > 0 {
                    self.status = ActuatorStatus::On;
                    self.curr_worktime = elapsed;
                    self.curr_resttime = 0;
                }
            }
            ActuatorStatus::On => {
                self.curr_worktime = self.curr_worktime.saturating_add(elapsed);
                if self.curr_worktime >= self.max_worktime {
                    self.status = ActuatorStatus::Pause;
                    self.curr_worktime = 0;
                }
            }
            ActuatorStatus::Pause => {
                self.curr_resttime = self.curr_resttime.saturating_add(elapsed);
                if self.curr_resttime >= self.min_resttime {
                    self.status = ActuatorStatus::On;
                    self.curr_resttime = 0;
                }
            }
            ActuatorStatus::Broken => self.status = ActuatorStatus::Off,
        }
        self.status
    }

    /// Smooth `value`, decide whether to run and update the status.
    /// A broken actuator ignores input until [`clear_fault`](Self::clear_fault).
    pub fn evaluate(&mut self, value: i32, elapsed: u32) -> ActuatorStatus {
        if self.status == ActuatorStatus::Broken {
            return self.status;
        }
        let smoothed = self.ema.update(value);
        if self.id.should_run(smoothed, self.threshold) {
            self.step(elapsed)
        } else {
            self.status = ActuatorStatus::Off;
            self.status
        }
    }

    pub fn mark_broken(&mut self) {
        self.status = ActuatorStatus::Broken;
    }

    /// Re-arm a broken actuator (BROKEN → OFF).  No-op otherwise.
    pub fn clear_fault(&mut self) -> ActuatorStatus {
        if self.status == ActuatorStatus::Broken {
            self.step(0);
        }
        self.status
    }
}

/// Control value of `event` for an actuator listening to `mask`: the mean
/// over written, non-corrupted IDs.  Climate events yield the temperature
/// in tenths of a degree.  `None` when no ID is usable.
pub fn control_value(event: &SensorEvent, mask: u16) -> Option<i32> {
    let usable = (0..usize::from(event.active))
        .filter(|&id| mask & (1 << id) != 0 && event.is_written(id) && !event.is_corrupted(id));

    let (sum, n) = match &event.payload {
        Payload::Scalar(values) => usable
            .filter_map(|id| values.get(id))
            .fold((0i64, 0i64), |(s, n), &v| (s + i64::from(v), n + 1)),
        Payload::Climate(values) => usable
            .filter_map(|id| values.get(id))
            .fold((0i64, 0i64), |(s, n), c| (s + (c.temperature * 10.0).round() as i64, n + 1)),
    };
    if n == 0 {
        return None;
    }
    Some((sum / n).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

// ───────────────────────────────────────────────────────────────
// Output side
// ───────────────────────────────────────────────────────────────

/// A status change that reached the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub id: ActuatorId,
    pub from: ActuatorStatus,
    pub to: ActuatorStatus,
}

/// An [`Actuator`] plus its output pin.  Owned by the control task.
#[derive(Debug, Clone)]
pub struct ActuatorLoop {
    actuator: Actuator,
}

impl ActuatorLoop {
    pub fn new(actuator: Actuator) -> Self {
        Self { actuator }
    }

    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut Actuator {
        &mut self.actuator
    }

    pub fn status(&self) -> ActuatorStatus {
        self.actuator.status
    }

    /// Evaluate and, if the status changed, write the output once.
    ///
    /// A failed write leaves the actuator BROKEN and returns the error.
    pub fn evaluate(
        &mut self,
        value: i32,
        elapsed: u32,
        port: &mut impl ActuatorPort,
    ) -> Result<Option<Transition>> {
        let from = self.actuator.status;
        let to = self.actuator.evaluate(value, elapsed);
        self.commit(from, to, port)
    }

    /// Re-arm after a fault and switch the output off.
    pub fn clear_fault(&mut self, port: &mut impl ActuatorPort) -> Result<Option<Transition>> {
        let from = self.actuator.status;
        let to = self.actuator.clear_fault();
        self.commit(from, to, port)
    }

    fn commit(
        &mut self,
        from: ActuatorStatus,
        to: ActuatorStatus,
        port: &mut impl ActuatorPort,
    ) -> Result<Option<Transition>> {
        if from == to {
            return Ok(None);
        }
        let id = self.actuator.id;
        if let Err(e) = port.write(id, to.is_energised()) {
            warn!("{}: output write failed ({}), marking broken", id.wire_name(), e);
            self.actuator.mark_broken();
            return Err(e);
        }
        info!("{}: {:?} -> {:?}", id.wire_name(), from, to);
        Ok(Some(Transition { id, from, to }))
    }
}
