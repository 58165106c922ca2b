//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | control task up"),
            AppEvent::ActuatorChanged(t) => {
                info!("ACT   | {} {:?} -> {:?}", t.id.wire_name(), t.from, t.to);
            }
            AppEvent::ActuatorFault { id, error } => {
                warn!("ACT   | {} broken: {}", id.wire_name(), error);
            }
            AppEvent::SensorFailed { kind, error } => {
                warn!("SENS  | {} read failed: {}", kind.wire_name(), error);
            }
            AppEvent::ReadingDropped { kind, error } => {
                warn!("SENS  | {} reading dropped: {}", kind.wire_name(), error);
            }
            AppEvent::Evicted { consumer } => info!("QUEUE | {:?} full, oldest dropped", consumer),
            AppEvent::ConfigApplied(r) => {
                info!(
                    "CONF  | applied={} skipped={} cardinality_changed={}",
                    r.applied, r.skipped, r.cardinality_changed
                );
            }
            AppEvent::ConfigRejected { error, report } => {
                warn!("CONF  | rejected ({}) after {} keys", error, report.applied);
            }
            AppEvent::TelemetrySent { bytes } => info!("NET   | telemetry sent, {} bytes", bytes),
        }
    }
}
