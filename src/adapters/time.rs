//! Millisecond tick source.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microseconds since boot, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! Either way the value is truncated to a wrapping `u32`; the domain only
//! looks at unsigned differences.

use crate::app::ports::TickSource;

pub struct SystemTicks {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTicks {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl TickSource for SystemTicks {
    #[cfg(target_os = "espidf")]
    fn now(&self) -> u32 {
        // SAFETY: read-only query of the always-running system timer.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        (us / 1_000) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_advance() {
        let ticks = SystemTicks::new();
        let a = ticks.now();
        std::thread::sleep(std::time::Duration::from_millis(3));
        assert!(ticks.now().wrapping_sub(a) >= 3);
    }
}
