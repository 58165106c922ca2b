//! Supervisor message I/O.
//!
//! JSON-shaped telemetry out, configuration in.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Network task                           │
//! │                                                            │
//! │  network queue ──▶ RecordLog ──▶ outbound ──▶ Transport    │
//! │  (handles)         (rings)       (encoder)    (send)       │
//! │                                     │                      │
//! │                              MessageWriter                 │
//! │                           (bounds-checked)                 │
//! │                                                            │
//! │  Transport ──▶ inbound ──▶ SystemConfig (ConfigCell)       │
//! │  (recv)        (decoder)                                   │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod buffers;
pub mod inbound;
pub mod outbound;
pub mod record;
pub mod transport;
pub mod writer;

pub use buffers::{InboundBuffer, OutboundBuffer, RawMessageBuffers};
pub use inbound::InboundReport;
pub use record::{RecordLog, SensorRecord};
pub use transport::{NullTransport, Transport};
pub use writer::MessageWriter;
