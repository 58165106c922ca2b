//! Application core: pure domain logic, zero I/O.
//!
//! Two halves, one per task: [`service::SensorPipeline`] turns sensor reads
//! into events and actuator decisions, [`uplink::Uplink`] ships recorded
//! events to the supervisor and takes configuration back.  All interaction
//! with hardware happens through the **port traits** in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
pub mod uplink;

pub use events::{AppEvent, Consumer};
pub use ports::{ActuatorPort, EventSink, SensorPort, TickSource};
pub use service::{ConfigCell, PipelineStats, SensorPipeline};
pub use uplink::{Exchange, Uplink};
