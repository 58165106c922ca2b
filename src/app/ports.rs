//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorPipeline / Uplink (domain)
//! ```
//!
//! Driven adapters (sensor buses, actuator outputs, clocks, event sinks)
//! implement these traits.  The pipeline consumes them via generics, so
//! the domain core never touches hardware directly.  The transport port
//! lives with the codec in [`crate::rpc::transport`].

use crate::control::ActuatorId;
use crate::error::Result;
use crate::sensors::{SampleBuffer, SensorMeta};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw-sample source, one call per sensor type per read interval.
pub trait SensorPort {
    /// Sample every ID in `read_mask`, `meta.num_resamples` times each.
    ///
    /// IDs outside the mask may be filled with anything; the returned
    /// buffer's `read_mask` tells the aggregator which ones are real.
    /// Bus failures surface as [`Error::SensorFail`](crate::Error::SensorFail)
    /// or [`Error::Timeout`](crate::Error::Timeout).
    fn read(&mut self, meta: &SensorMeta, read_mask: u16) -> Result<SampleBuffer>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Output sink, invoked exactly once per actuator status change.
pub trait ActuatorPort {
    fn write(&mut self, id: ActuatorId, on: bool) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Tick source (driven adapter: timer → domain)
// ───────────────────────────────────────────────────────────────

/// Free-running 32-bit millisecond counter.  Wraps; consumers only ever
/// look at unsigned differences.
pub trait TickSource {
    fn now(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
