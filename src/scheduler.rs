//! Sensor read scheduler.
//!
//! Each sensor type is read once per `read_interval`.  The scheduler keeps
//! its own copy of the sensor descriptions because the soil fast-poll
//! state is runtime state, not configuration: an inbound config change
//! retunes the divisor but must not knock an engaged fast poll back to
//! the normal cadence.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │                       tick(now)                          │
//!  │                                                          │
//!  │   soil ──┐      air ──┐       light ──┐                  │
//!  │          ▼            ▼               ▼                  │
//!  │   since_last ≥ effective_interval ?  (wrap-safe delta)   │
//!  │          │                                               │
//!  │          ▼                                               │
//!  │   DueRead { kind, read_mask, interval, since_last }      │
//!  └──────────────────────────────────────────────────────────┘
//!                 │
//!                 ▼
//!        SensorPipeline::sample_all()
//! ```
//!
//! While the pump runs, soil is read every `read_interval / divisor`
//! ticks.  Intermediate reads only sample the fast-poll ID mask; every
//! `divisor`-th read is a full read.

use heapless::Vec;
use log::{debug, info};

use crate::clock::ticks_since;
use crate::config::SystemConfig;
use crate::events::SensorKind;
use crate::sensors::SensorMeta;

// ═══════════════════════════════════════════════════════════════
//  Due reads
// ═══════════════════════════════════════════════════════════════

/// A read the scheduler wants performed now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueRead {
    pub kind: SensorKind,
    /// IDs to sample.
    pub read_mask: u16,
    /// Effective interval at the time the read fell due.
    pub interval: u32,
    /// Ticks since the previous read of this type (0 on the first read).
    pub since_last: u32,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct ReadEntry {
    meta: SensorMeta,
    /// Raw tick of the last read.
    last_read: Option<u32>,
}

pub struct ReadScheduler {
    entries: [ReadEntry; SensorKind::COUNT],
}

impl ReadScheduler {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            entries: SensorKind::ALL.map(|k| ReadEntry {
                meta: config.sensor(k).clone(),
                last_read: None,
            }),
        }
    }

    /// Take over new sensor descriptions, keeping read times and the
    /// fast-poll runtime state.
    pub fn apply_config(&mut self, config: &SystemConfig) {
        for entry in &mut self.entries {
            let mut meta = config.sensor(entry.meta.kind).clone();
            if let (Some(new), Some(old)) = (&mut meta.fast_poll, &entry.meta.fast_poll) {
                new.carry_state_from(old);
            }
            entry.meta = meta;
        }
    }

    pub fn meta(&self, kind: SensorKind) -> &SensorMeta {
        &self.entries[kind.index()].meta
    }

    /// Engage or release fast polling of `kind`.  Returns whether the
    /// state changed; types without fast poll never change.
    pub fn set_fast_poll(&mut self, kind: SensorKind, engaged: bool) -> bool {
        let Some(fp) = self.entries[kind.index()].meta.fast_poll.as_mut() else {
            return false;
        };
        if fp.is_active() == engaged {
            return false;
        }
        if engaged {
            fp.engage();
        } else {
            fp.release();
        }
        info!("Scheduler: {} fast poll {}", kind.wire_name(), if engaged { "on" } else { "off" });
        true
    }

    pub fn is_fast_polling(&self, kind: SensorKind) -> bool {
        self.meta(kind).fast_poll.is_some_and(|fp| fp.is_active())
    }

    /// Collect every read due at raw tick `now`.  A type that has never
    /// been read is due immediately.
    pub fn tick(&mut self, now: u32) -> Vec<DueRead, { SensorKind::COUNT }> {
        let mut due = Vec::new();
        for entry in &mut self.entries {
            let interval = entry.meta.effective_interval();
            let since_last = entry.last_read.map_or(0, |last| ticks_since(last, now));
            if entry.last_read.is_some() && since_last < interval {
                continue;
            }
            let read_mask = entry.meta.next_read_mask();
            entry.last_read = Some(now);
            debug!(
                "Scheduler: {} due (mask=0b{:b}, {} ticks since last)",
                entry.meta.kind.wire_name(),
                read_mask,
                since_last
            );
            // At most one entry per type.
            let _ = due.push(DueRead {
                kind: entry.meta.kind,
                read_mask,
                interval,
                since_last,
            });
        }
        due
    }

    /// Ticks until the next read falls due.
    pub fn next_due_in(&self, now: u32) -> u32 {
        self.entries
            .iter()
            .map(|e| match e.last_read {
                None => 0,
                Some(last) => e.meta.effective_interval().saturating_sub(ticks_since(last, now)),
            })
            .min()
            .unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
