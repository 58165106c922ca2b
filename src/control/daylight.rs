//! Daylight budget for the grow bulb.
//!
//! While the bulb is OFF the plants are assumed to get natural light, so
//! the time between light reads is added to an accumulator.  When the bulb
//! drops back to OFF after running, the lit period is over and the
//! accumulator restarts from zero.  The bulb may then work for whatever
//! is left of the required day length.

use super::actuator::{Actuator, ActuatorStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Daylight {
    /// Required light per day, in ticks.
    pub daylength: u32,
    accumulated: u32,
    prev_status: ActuatorStatus,
}

impl Daylight {
    pub const fn new(daylength: u32) -> Self {
        Self {
            daylength,
            accumulated: 0,
            prev_status: ActuatorStatus::Off,
        }
    }

    /// Fold one bulb evaluation in and return the remaining work budget.
    pub fn update(&mut self, status: ActuatorStatus, elapsed: u32) -> u32 {
        if status == ActuatorStatus::Off {
            if self.prev_status != ActuatorStatus::Off {
                self.accumulated = 0;
            }
            self.accumulated = self.accumulated.saturating_add(elapsed);
        }
        self.prev_status = status;
        self.budget()
    }

    /// Update from the bulb's current status and set its next `max_worktime`.
    pub fn apply(&mut self, bulb: &mut Actuator, elapsed: u32) -> u32 {
        let budget = self.update(bulb.status, elapsed);
        bulb.max_worktime = budget;
        budget
    }

    pub fn accumulated(&self) -> u32 {
        self.accumulated
    }

    pub fn budget(&self) -> u32 {
        self.daylength.saturating_sub(self.accumulated)
    }
}
