//! Sensor/control pipeline: the hexagonal core of the control task.
//!
//! [`SensorPipeline`] owns the read scheduler, the three actuator loops and
//! the daylight accumulator.  It borrows the shared arena and both consumer
//! queues.  All I/O flows through port traits injected at call sites, so
//! the whole pipeline runs on the host against mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ display queue
//!                 │        SensorPipeline         │
//! ActuatorPort ◀──│ aggregate · control · fan-out │ ──▶ network queue
//!                 └──────────────────────────────┘
//!                           │
//!                        EventSink
//! ```
//!
//! Configuration changes arrive from the network task through
//! [`ConfigCell`]; the pipeline picks them up between reads.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::clock::{DayClock, Timestamp};
use crate::config::SystemConfig;
use crate::control::{Actuator, ActuatorId, ActuatorLoop, ActuatorStatus, Daylight, Transition, control_value};
use crate::error::{Error, Result};
use crate::events::arena::{EventHandle, EventSource, SharedArena};
use crate::events::queue::EventQueue;
use crate::events::SensorKind;
use crate::scheduler::ReadScheduler;
use crate::sensors::outlier::{AggregateReport, aggregate_into};
use crate::sensors::{SampleBuffer, SensorMeta};

use super::events::{AppEvent, Consumer};
use super::ports::{ActuatorPort, EventSink, SensorPort};

// ───────────────────────────────────────────────────────────────
// ConfigCell
// ───────────────────────────────────────────────────────────────

/// The live [`SystemConfig`] shared between the network task (writer) and
/// the control task (reader), plus a generation counter bumped on every
/// store so readers can cheaply tell whether anything changed.
pub struct ConfigCell {
    inner: Mutex<CriticalSectionRawMutex, RefCell<(SystemConfig, u32)>>,
}

impl ConfigCell {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new((config, 0))),
        }
    }

    /// Copy of the current configuration and its generation.
    pub fn snapshot(&self) -> (SystemConfig, u32) {
        self.inner.lock(|cell| cell.borrow().clone())
    }

    pub fn generation(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().1)
    }

    /// Replace the configuration.  Returns the new generation.
    pub fn store(&self, config: SystemConfig) -> u32 {
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            slot.0 = config;
            slot.1 = slot.1.wrapping_add(1);
            slot.1
        })
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new(SystemConfig::default())
    }
}

// ───────────────────────────────────────────────────────────────
// PipelineStats
// ───────────────────────────────────────────────────────────────

/// Running counters for diagnostics.  Never reset while the task lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events aggregated and stored.
    pub events: u32,
    /// Readings that never became an event.
    pub dropped: u32,
    /// Allocations refused because every arena slot was taken.
    pub arena_exhausted: u32,
    pub display_evictions: u32,
    pub network_evictions: u32,
    pub sensor_failures: u32,
    /// Raw samples rejected as outliers.
    pub outliers: u32,
    pub actuator_faults: u32,
}

// ───────────────────────────────────────────────────────────────
// SensorPipeline
// ───────────────────────────────────────────────────────────────

/// Producer side of the event flow.  Owned by the control task.
///
/// `N` is the arena size, `QD`/`QN` the display and network queue depths.
pub struct SensorPipeline<'a, const N: usize, const QD: usize, const QN: usize> {
    arena: &'a SharedArena<N>,
    display: &'a EventQueue<QD>,
    network: &'a EventQueue<QN>,
    clock: DayClock,
    scheduler: ReadScheduler,
    /// Indexed by [`ActuatorId::index`].
    actuators: [ActuatorLoop; ActuatorId::COUNT],
    daylight: Daylight,
    generation: u32,
    stats: PipelineStats,
}

impl<'a, const N: usize, const QD: usize, const QN: usize> SensorPipeline<'a, N, QD, QN> {
    /// Build the pipeline from `config`, anchoring the day clock at raw
    /// tick `now`.
    pub fn new(
        arena: &'a SharedArena<N>,
        display: &'a EventQueue<QD>,
        network: &'a EventQueue<QN>,
        config: &SystemConfig,
        now: u32,
    ) -> Self {
        Self {
            arena,
            display,
            network,
            clock: DayClock::new(now),
            scheduler: ReadScheduler::new(config),
            actuators: ActuatorId::ALL.map(|id| ActuatorLoop::new(Actuator::new(id, config.actuator(id)))),
            daylight: Daylight::new(config.daylength),
            generation: 0,
            stats: PipelineStats::default(),
        }
    }

    /// Announce the control task.
    pub fn start(&self, sink: &mut impl EventSink) {
        info!(
            "Pipeline started: arena={} display_q={} network_q={}",
            N, QD, QN
        );
        sink.emit(&AppEvent::Started);
    }

    // ── Event production ──────────────────────────────────────

    /// Turn one raw read into a stored event and return its handle.
    ///
    /// The slot is allocated zeroed, filled outside the arena lock and
    /// published in one step.  On any failure the slot goes back to the
    /// pool before the error is returned.
    pub fn on_sensor_sample(&mut self, meta: &SensorMeta, raw: &SampleBuffer, now: u32) -> Result<EventHandle> {
        let timestamp = self.clock.update(now);
        let handle = match self.arena.alloc(meta.kind, usize::from(meta.num_items)) {
            Ok(h) => h,
            Err(e) => {
                if e == Error::ResourceExhausted {
                    self.stats.arena_exhausted += 1;
                }
                self.stats.dropped += 1;
                return Err(e);
            }
        };

        match fill_event(self.arena, handle, meta, raw, timestamp) {
            Ok(report) => {
                self.stats.events += 1;
                self.stats.outliers += report.total();
                debug!(
                    "Pipeline: {} event in slot {} ({} outliers)",
                    meta.kind.wire_name(),
                    handle.index(),
                    report.total()
                );
                Ok(handle)
            }
            Err(e) => {
                if let Err(free_err) = self.arena.free(handle) {
                    warn!("Pipeline: releasing slot {} failed: {}", handle.index(), free_err);
                }
                self.stats.dropped += 1;
                Err(e)
            }
        }
    }

    /// Fan `handle` out to both consumers: an arena copy to the network
    /// queue, the original to the display queue.
    ///
    /// A full queue drops its oldest entry.  If no copy can be made the
    /// network side misses this event; the display still gets it.
    pub fn on_event(&mut self, handle: EventHandle, sink: &mut impl EventSink) -> Result<()> {
        match self.arena.duplicate(handle) {
            Ok(copy) => match self.network.push_evicting(self.arena, copy) {
                Ok(Some(_)) => {
                    self.stats.network_evictions += 1;
                    sink.emit(&AppEvent::Evicted {
                        consumer: Consumer::Network,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Pipeline: network queue refused event: {}", e),
            },
            Err(e) => {
                if e == Error::ResourceExhausted {
                    self.stats.arena_exhausted += 1;
                }
                warn!("Pipeline: no copy for network queue: {}", e);
            }
        }

        if self.display.push_evicting(self.arena, handle)?.is_some() {
            self.stats.display_evictions += 1;
            sink.emit(&AppEvent::Evicted {
                consumer: Consumer::Display,
            });
        }
        Ok(())
    }

    // ── Control ───────────────────────────────────────────────

    /// Run the actuator coupled to the event's sensor type.
    ///
    /// `since_last` is the measured time since the previous read of that
    /// type; only the bulb uses it.  The pump runs on the current soil
    /// interval (fast-poll aware) and the fan on the air read interval.
    /// An event with no usable ID leaves the actuator untouched.
    pub fn control(
        &mut self,
        handle: EventHandle,
        since_last: u32,
        port: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<Option<Transition>> {
        let event = self.arena.snapshot(handle).ok_or(Error::InvalidReference)?;
        let id = ActuatorId::for_sensor(event.kind);
        let Some(value) = control_value(&event, self.actuators[id.index()].actuator().sensor_mask) else {
            debug!("Pipeline: {} event has no usable reading, {} skipped", event.kind.wire_name(), id.wire_name());
            return Ok(None);
        };

        let elapsed = match id {
            ActuatorId::Pump => self.scheduler.meta(SensorKind::SoilMoisture).effective_interval(),
            ActuatorId::Fan => self.scheduler.meta(SensorKind::AirClimate).read_interval,
            ActuatorId::Bulb => {
                let budget = self
                    .daylight
                    .apply(self.actuators[id.index()].actuator_mut(), since_last);
                debug!("Pipeline: daylight budget {} ticks", budget);
                since_last
            }
        };

        let result = self.actuators[id.index()].evaluate(value, elapsed, port);
        if id == ActuatorId::Pump {
            let running = self.actuators[id.index()].status() == ActuatorStatus::On;
            self.scheduler.set_fast_poll(SensorKind::SoilMoisture, running);
        }
        self.report(id, result, sink)
    }

    /// Re-arm a broken actuator and drive its output off.
    pub fn clear_fault(
        &mut self,
        id: ActuatorId,
        port: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<Option<Transition>> {
        let result = self.actuators[id.index()].clear_fault(port);
        self.report(id, result, sink)
    }

    fn report(
        &mut self,
        id: ActuatorId,
        result: Result<Option<Transition>>,
        sink: &mut impl EventSink,
    ) -> Result<Option<Transition>> {
        match result {
            Ok(Some(t)) => sink.emit(&AppEvent::ActuatorChanged(t)),
            Ok(None) => {}
            Err(error) => {
                self.stats.actuator_faults += 1;
                sink.emit(&AppEvent::ActuatorFault { id, error });
            }
        }
        result
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Read every sensor type due at raw tick `now`, then aggregate,
    /// control and fan out each reading.  Returns how many events were
    /// delivered.
    ///
    /// Each type is handled on its own; one failing never holds up the
    /// others.
    pub fn sample_all(
        &mut self,
        sensors: &mut impl SensorPort,
        actuators: &mut impl ActuatorPort,
        now: u32,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut delivered = 0;
        for due in self.scheduler.tick(now) {
            let meta = self.scheduler.meta(due.kind).clone();
            let raw = match sensors.read(&meta, due.read_mask) {
                Ok(raw) => raw.with_read_mask(due.read_mask),
                Err(error) => {
                    warn!("Pipeline: {} read failed: {}", due.kind.wire_name(), error);
                    self.stats.sensor_failures += 1;
                    sink.emit(&AppEvent::SensorFailed { kind: due.kind, error });
                    continue;
                }
            };

            let handle = match self.on_sensor_sample(&meta, &raw, now) {
                Ok(h) => h,
                Err(error) => {
                    warn!("Pipeline: {} reading dropped: {}", due.kind.wire_name(), error);
                    sink.emit(&AppEvent::ReadingDropped { kind: due.kind, error });
                    continue;
                }
            };

            // The reading is still delivered when control fails.
            if let Err(e) = self.control(handle, due.since_last, actuators, sink) {
                warn!("Pipeline: {} control skipped: {}", due.kind.wire_name(), e);
            }

            match self.on_event(handle, sink) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Pipeline: {} event not delivered: {}", due.kind.wire_name(), e),
            }
        }
        delivered
    }

    // ── Configuration ─────────────────────────────────────────

    /// Take over a new configuration.  Actuator runtime state (status,
    /// timers, EMA) and fast-poll state carry over.
    pub fn apply_config(&mut self, config: &SystemConfig) {
        self.scheduler.apply_config(config);
        for lp in &mut self.actuators {
            let id = lp.actuator().id;
            lp.actuator_mut().apply_config(config.actuator(id));
        }
        self.daylight.daylength = config.daylength;
    }

    /// Apply the shared configuration if it changed since the last sync.
    /// Returns whether anything was applied.
    pub fn sync_config(&mut self, cell: &ConfigCell) -> bool {
        if cell.generation() == self.generation {
            return false;
        }
        let (config, generation) = cell.snapshot();
        self.apply_config(&config);
        self.generation = generation;
        info!("Pipeline: configuration generation {} applied", generation);
        true
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn actuator(&self, id: ActuatorId) -> &Actuator {
        self.actuators[id.index()].actuator()
    }

    pub fn daylight(&self) -> &Daylight {
        &self.daylight
    }

    pub fn scheduler(&self) -> &ReadScheduler {
        &self.scheduler
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Ticks until the next sensor read falls due.
    pub fn next_due_in(&self, now: u32) -> u32 {
        self.scheduler.next_due_in(now)
    }
}

/// Aggregate `raw` into a copy of the zeroed slot, then publish it.
fn fill_event<const N: usize>(
    arena: &SharedArena<N>,
    handle: EventHandle,
    meta: &SensorMeta,
    raw: &SampleBuffer,
    timestamp: Timestamp,
) -> Result<AggregateReport> {
    let mut event = arena.snapshot(handle).ok_or(Error::InvalidReference)?;
    event.timestamp = timestamp;
    let report = aggregate_into(meta, raw, &mut event)?;
    arena.store(handle, &event)?;
    Ok(report)
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
