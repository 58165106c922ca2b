//! Wrap-safe time-of-day bookkeeping.
//!
//! The tick source is a free-running 32-bit millisecond counter that wraps
//! roughly every 49.7 days.  [`DayClock`] folds successive readings into a
//! `(day, ticks-of-day)` pair using unsigned-difference arithmetic, so a
//! wrap between two readings is just another delta.

use serde::{Deserialize, Serialize};

/// Ticks per second of the free-running counter.
pub const TICKS_PER_SEC: u32 = 1_000;

/// Ticks in one day.
pub const TICKS_PER_DAY: u32 = 24 * 60 * 60 * TICKS_PER_SEC;

/// Point in device time: days since boot plus ticks into the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub day: u16,
    pub ticks: u32,
}

/// Ticks elapsed from `earlier` to `now`, tolerating one counter wrap.
pub const fn ticks_since(earlier: u32, now: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Accumulates raw counter readings into a [`Timestamp`].
#[derive(Debug, Clone)]
pub struct DayClock {
    last_raw: u32,
    now: Timestamp,
}

impl DayClock {
    /// Start the clock at day 0, tick 0, anchored at the raw counter value.
    pub const fn new(raw_now: u32) -> Self {
        Self {
            last_raw: raw_now,
            now: Timestamp { day: 0, ticks: 0 },
        }
    }

    /// Fold a new raw reading in and return the updated time of day.
    pub fn update(&mut self, raw_now: u32) -> Timestamp {
        let delta = ticks_since(self.last_raw, raw_now);
        self.last_raw = raw_now;

        // Split into whole days first so `ticks` can never overflow.
        let mut days = delta / TICKS_PER_DAY;
        let mut ticks = self.now.ticks + delta % TICKS_PER_DAY;
        if ticks >= TICKS_PER_DAY {
            ticks -= TICKS_PER_DAY;
            days += 1;
        }
        self.now.ticks = ticks;
        self.now.day = self.now.day.wrapping_add(days as u16);
        self.now
    }

    /// Last computed time of day.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Raw counter value of the last update.
    pub fn last_raw(&self) -> u32 {
        self.last_raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_within_a_day() {
        let mut clock = DayClock::new(1_000);
        assert_eq!(clock.update(1_500), Timestamp { day: 0, ticks: 500 });
        assert_eq!(clock.update(2_000), Timestamp { day: 0, ticks: 1_000 });
    }

    #[test]
    fn rolls_over_into_next_day() {
        let mut clock = DayClock::new(0);
        clock.update(TICKS_PER_DAY - 10);
        let t = clock.update(TICKS_PER_DAY + 25);
        assert_eq!(t, Timestamp { day: 1, ticks: 25 });
    }

    #[test]
    fn survives_counter_wraparound() {
        let mut clock = DayClock::new(u32::MAX - 99);
        let t = clock.update(100);
        assert_eq!(t.ticks, 200);
        assert_eq!(ticks_since(u32::MAX - 4, 5), 10);
    }
}
