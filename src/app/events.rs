//! Outbound application events.
//!
//! The pipeline and the uplink emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, display, ...).

use crate::control::{ActuatorId, Transition};
use crate::error::Error;
use crate::events::SensorKind;
use crate::rpc::InboundReport;

/// Which consumer queue an event was headed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Display,
    Network,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The control task is up.
    Started,

    /// An actuator output changed.
    ActuatorChanged(Transition),

    /// An actuator output write failed; the actuator is now broken.
    ActuatorFault { id: ActuatorId, error: Error },

    /// The sensor bus failed; the other sensors carry on.
    SensorFailed { kind: SensorKind, error: Error },

    /// A reading was sampled but could not be turned into an event.
    ReadingDropped { kind: SensorKind, error: Error },

    /// A consumer queue was full and its oldest event was discarded.
    Evicted { consumer: Consumer },

    /// An inbound configuration message was applied (possibly partially).
    ConfigApplied(InboundReport),

    /// An inbound configuration message stopped at an error.  The keys
    /// counted in the report stay applied.
    ConfigRejected { error: Error, report: InboundReport },

    /// A telemetry message went out.
    TelemetrySent { bytes: usize },
}
