//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements   | Connects to                    |
//! |------------------|--------------|--------------------------------|
//! | `hardware`       | SensorPort   | ESP32 ADC1 oneshot, air probe  |
//! | `gpio`           | ActuatorPort | relay pins (embedded-hal)      |
//! | `log_sink`       | EventSink    | Serial log output              |
//! | `time`           | TickSource   | ESP32 system timer             |
//! | `uart_transport` | Transport    | UART line link to supervisor   |

pub mod gpio;
pub mod hardware;
pub mod log_sink;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart_transport;
