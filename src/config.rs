//! System configuration parameters
//!
//! All tunable parameters for the grow box.  The configuration lives in
//! RAM only: it is re-derived from these defaults at boot and changed at
//! runtime through inbound configuration messages.
//!
//! All durations are in ticks of the free-running counter (milliseconds).

use serde::{Deserialize, Serialize};

use crate::control::ActuatorId;
use crate::error::{Error, Result};
use crate::events::SensorKind;
use crate::sensors::SensorMeta;

/// Duty-cycle limits and trigger policy of one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Longest uninterrupted run.
    pub max_worktime: u32,
    /// Shortest rest after a run.
    pub min_resttime: u32,
    /// Pump: raw soil reading, fan: tenths of °C, bulb: raw light reading.
    pub threshold: i32,
    /// EMA weight of the newest value, percent.
    pub ema_lambda: u8,
    /// Sensor IDs feeding the actuator.
    pub sensor_mask: u16,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensors ---
    pub soil: SensorMeta,
    pub air: SensorMeta,
    pub light: SensorMeta,

    // --- Actuators ---
    pub pump: ActuatorConfig,
    pub fan: ActuatorConfig,
    pub bulb: ActuatorConfig,

    // --- Network ---
    /// Ticks between telemetry exchanges
    pub netconn_interval: u32,

    // --- Light ---
    /// Required light per day (natural + bulb)
    pub daylength: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            soil: SensorMeta::soil_default(),
            air: SensorMeta::air_default(),
            light: SensorMeta::light_default(),

            // Pump: short bursts, long soak
            pump: ActuatorConfig {
                max_worktime: 10_000,
                min_resttime: 120_000,
                threshold: 2_000,
                ema_lambda: 50,
                sensor_mask: 0b11,
            },
            // Fan: 28.0 °C
            fan: ActuatorConfig {
                max_worktime: 600_000,
                min_resttime: 60_000,
                threshold: 280,
                ema_lambda: 30,
                sensor_mask: 0b1,
            },
            // Bulb: max_worktime is recomputed from the daylight budget
            bulb: ActuatorConfig {
                max_worktime: 16 * 3_600_000,
                min_resttime: 60_000,
                threshold: 400,
                ema_lambda: 50,
                sensor_mask: 0b1,
            },

            netconn_interval: 30_000,
            daylength: 16 * 3_600_000, // 16 h
        }
    }
}

impl SystemConfig {
    pub fn sensor(&self, kind: SensorKind) -> &SensorMeta {
        match kind {
            SensorKind::SoilMoisture => &self.soil,
            SensorKind::AirClimate => &self.air,
            SensorKind::Lightness => &self.light,
        }
    }

    pub fn sensor_mut(&mut self, kind: SensorKind) -> &mut SensorMeta {
        match kind {
            SensorKind::SoilMoisture => &mut self.soil,
            SensorKind::AirClimate => &mut self.air,
            SensorKind::Lightness => &mut self.light,
        }
    }

    pub fn actuator(&self, id: ActuatorId) -> &ActuatorConfig {
        match id {
            ActuatorId::Pump => &self.pump,
            ActuatorId::Fan => &self.fan,
            ActuatorId::Bulb => &self.bulb,
        }
    }

    pub fn actuator_mut(&mut self, id: ActuatorId) -> &mut ActuatorConfig {
        match id {
            ActuatorId::Pump => &mut self.pump,
            ActuatorId::Fan => &mut self.fan,
            ActuatorId::Bulb => &mut self.bulb,
        }
    }

    /// Sensor cardinality as `(num_items, num_resamples)` per kind, in
    /// [`SensorKind::ALL`] order.  Buffers sized from this must be
    /// recomputed whenever it changes.
    pub fn cardinality(&self) -> [(u8, u8); SensorKind::COUNT] {
        SensorKind::ALL.map(|k| {
            let m = self.sensor(k);
            (m.num_items, m.num_resamples)
        })
    }

    pub fn validate(&self) -> Result<()> {
        for kind in SensorKind::ALL {
            self.sensor(kind).validate()?;
        }
        if self.netconn_interval == 0 {
            return Err(Error::InvalidRequest);
        }
        Ok(())
    }
}
