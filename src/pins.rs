//! GPIO / peripheral pin assignments for the grow box controller board.
//!
//! Single source of truth: the boot path references this module rather
//! than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Actuator relays (active HIGH)
// ---------------------------------------------------------------------------

/// Irrigation pump relay.
pub const PUMP_RELAY_GPIO: i32 = 1;
/// Exhaust fan relay.
pub const FAN_RELAY_GPIO: i32 = 2;
/// Grow bulb relay.
pub const BULB_RELAY_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Sensors, analog (ADC1)
// ---------------------------------------------------------------------------

/// Capacitive soil probes, one ADC1 channel per sensor ID
/// (CH3 = GPIO 4, CH4 = GPIO 5 on ESP32-S3).
pub const SOIL_ADC_CHANNELS: [u32; 2] = [3, 4];

/// Photoresistor divider, ADC1 channel 5 (GPIO 6 on ESP32-S3).
pub const LIGHT_ADC_CHANNELS: [u32; 1] = [5];

// ---------------------------------------------------------------------------
// Supervisor link (UART1)
// ---------------------------------------------------------------------------

pub const SUPERVISOR_UART_TX_GPIO: i32 = 17;
pub const SUPERVISOR_UART_RX_GPIO: i32 = 18;
pub const SUPERVISOR_UART_BAUD: u32 = 115_200;
