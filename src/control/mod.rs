//! Actuator control: duty-cycle state machine and the bulb's daylight budget.

pub mod actuator;
pub mod daylight;

pub use actuator::{Actuator, ActuatorId, ActuatorLoop, ActuatorStatus, Ema, Transition, control_value};
pub use daylight::Daylight;
