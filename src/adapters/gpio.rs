//! Actuator outputs on plain digital pins.
//!
//! Pump, fan and bulb each sit behind a relay driven by one GPIO; HIGH
//! energises the load.  Any `embedded-hal` [`OutputPin`] works, so the
//! same adapter drives ESP-IDF `PinDriver`s on the device and mock pins
//! on the host.

use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

use crate::app::ports::ActuatorPort;
use crate::control::ActuatorId;
use crate::error::{Error, Result};

pub struct GpioActuators<P> {
    /// Indexed by [`ActuatorId::index`].
    pins: [P; ActuatorId::COUNT],
}

impl<P: OutputPin> GpioActuators<P> {
    pub fn new(pump: P, fan: P, bulb: P) -> Self {
        Self {
            pins: [pump, fan, bulb],
        }
    }

    /// Drive every output low.  Tries all pins even if one fails.
    pub fn all_off(&mut self) -> Result<()> {
        let mut result = Ok(());
        for id in ActuatorId::ALL {
            if let Err(e) = self.write(id, false) {
                result = Err(e);
            }
        }
        result
    }
}

impl<P: OutputPin> ActuatorPort for GpioActuators<P> {
    fn write(&mut self, id: ActuatorId, on: bool) -> Result<()> {
        let pin = &mut self.pins[id.index()];
        let result = if on { pin.set_high() } else { pin.set_low() };
        result.map_err(|e| {
            warn!("gpio: {} pin error: {:?}", id.wire_name(), e.kind());
            Error::ActuatorFail
        })
    }
}
