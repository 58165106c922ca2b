//! Grow box firmware: main entry point.
//!
//! Three tasks share the event arena and talk through two queues.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHub (ADC1)  GpioActuators  LogEventSink  UartTransport  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  control task: SensorPipeline ──┬──▶ DISPLAY ──▶ display task  │
//! │                                 └──▶ NETWORK ──▶ network task  │
//! │                                                  (Uplink)      │
//! │                 ConfigCell ◀──────────── inbound config ───────│
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::thread;

use anyhow::{Context, Result, anyhow};
use embassy_time::Duration;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_svc::hal::units::Hertz;
use log::{debug, info, warn};

use growbox::adapters::gpio::GpioActuators;
use growbox::adapters::hardware::{Adc1, AdcBank, NoClimateProbe, SensorHub};
use growbox::adapters::log_sink::LogEventSink;
use growbox::adapters::time::SystemTicks;
use growbox::adapters::uart_transport::UartTransport;
use growbox::app::{ConfigCell, SensorPipeline, TickSource, Uplink};
use growbox::events::{EventQueue, Payload, SensorEvent, SharedArena, Wait};
use growbox::pins;

// ── Pools ─────────────────────────────────────────────────────
//
// Worst case in flight: every ring full (26), both queues full, plus the
// event being produced and its network copy.

const ARENA_SLOTS: usize = 48;
const DISPLAY_DEPTH: usize = 4;
const NETWORK_DEPTH: usize = 8;

/// How long the network task waits for a config reply after telemetry.
const REPLY_TIMEOUT_MS: u64 = 2_000;

static ARENA: SharedArena<ARENA_SLOTS> = SharedArena::new();
static DISPLAY: EventQueue<DISPLAY_DEPTH> = EventQueue::new();
static NETWORK: EventQueue<NETWORK_DEPTH> = EventQueue::new();

type Relay = PinDriver<'static, AnyOutputPin, Output>;
type Sensors = SensorHub<AdcBank, NoClimateProbe, AdcBank>;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Growbox v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (RAM only, defaults at boot) ─────────
    let config: &'static ConfigCell = Box::leak(Box::new(ConfigCell::default()));

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;

    let adc_channels: Vec<u32> = pins::SOIL_ADC_CHANNELS
        .iter()
        .chain(&pins::LIGHT_ADC_CHANNELS)
        .copied()
        .collect();
    let adc = Adc1::new(&adc_channels).map_err(|rc| anyhow!("ADC1 init failed (rc={})", rc))?;
    let sensors = SensorHub::new(
        adc.bank(&pins::SOIL_ADC_CHANNELS),
        NoClimateProbe,
        adc.bank(&pins::LIGHT_ADC_CHANNELS),
    );

    let mut outputs = GpioActuators::new(
        relay(pins::PUMP_RELAY_GPIO)?,
        relay(pins::FAN_RELAY_GPIO)?,
        relay(pins::BULB_RELAY_GPIO)?,
    );
    if let Err(e) = outputs.all_off() {
        warn!("Boot: could not switch all relays off: {}", e);
    }

    // SAFETY: the supervisor pins are not claimed by anything else.
    let (tx, rx) = unsafe {
        (
            AnyIOPin::new(pins::SUPERVISOR_UART_TX_GPIO),
            AnyIOPin::new(pins::SUPERVISOR_UART_RX_GPIO),
        )
    };
    let uart = UartDriver::new(
        peripherals.uart1,
        tx,
        rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::SUPERVISOR_UART_BAUD)),
    )
    .context("supervisor UART init failed")?;

    // ── 4. Tasks ──────────────────────────────────────────────
    thread::Builder::new()
        .name("control".into())
        .stack_size(12 * 1024)
        .spawn(move || control_task(sensors, outputs, config))?;

    thread::Builder::new()
        .name("display".into())
        .stack_size(6 * 1024)
        .spawn(display_task)?;

    thread::Builder::new()
        .name("network".into())
        .stack_size(12 * 1024)
        .spawn(move || network_task(UartTransport::new(uart), config))?;

    info!("System ready.");
    loop {
        thread::sleep(std::time::Duration::from_secs(60));
        debug!("Arena: {}/{} slots in use", ARENA.in_use(), ARENA_SLOTS);
    }
}

fn relay(gpio: i32) -> Result<Relay> {
    // SAFETY: each relay GPIO is claimed exactly once, here.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    PinDriver::output(pin).with_context(|| format!("relay GPIO{} init failed", gpio))
}

// ── Control task ──────────────────────────────────────────────

fn control_task(mut sensors: Sensors, mut outputs: GpioActuators<Relay>, config: &'static ConfigCell) {
    let ticks = SystemTicks::new();
    let mut sink = LogEventSink::new();
    let (initial, _) = config.snapshot();
    let mut pipeline = SensorPipeline::new(&ARENA, &DISPLAY, &NETWORK, &initial, ticks.now());
    pipeline.start(&mut sink);

    loop {
        pipeline.sync_config(config);
        pipeline.sample_all(&mut sensors, &mut outputs, ticks.now(), &mut sink);

        let wait = pipeline.next_due_in(ticks.now()).clamp(10, 1_000);
        thread::sleep(std::time::Duration::from_millis(u64::from(wait)));
    }
}

// ── Display task ──────────────────────────────────────────────

fn display_task() {
    loop {
        if let Err(e) = DISPLAY.consume(&ARENA, Wait::Forever, render) {
            warn!("Display: {}", e);
        }
    }
}

fn render(event: &SensorEvent) {
    let stamp = event.timestamp;
    match &event.payload {
        Payload::Scalar(values) => info!(
            "DISP  | {} day={} ticks={} values={:?} corrupt=0b{:b}",
            event.kind.wire_name(),
            stamp.day,
            stamp.ticks,
            values,
            event.corrupted
        ),
        Payload::Climate(values) => {
            for (id, c) in values.iter().enumerate() {
                info!(
                    "DISP  | {}[{}] day={} ticks={} {:.2}C {:.2}%",
                    event.kind.wire_name(),
                    id,
                    stamp.day,
                    stamp.ticks,
                    c.temperature,
                    c.humidity
                );
            }
        }
    }
}

// ── Network task ──────────────────────────────────────────────

fn network_task(mut transport: UartTransport, config: &'static ConfigCell) {
    let mut sink = LogEventSink::new();
    let mut uplink = Uplink::new(&ARENA, &NETWORK, config);

    loop {
        let interval = config.snapshot().0.netconn_interval;
        thread::sleep(std::time::Duration::from_millis(u64::from(interval)));

        match uplink.exchange(&mut transport, Duration::from_millis(REPLY_TIMEOUT_MS), &mut sink) {
            Ok(x) => debug!("Network: sent {} bytes, reply {:?}", x.sent, x.inbound),
            Err(e) => warn!("Network: exchange failed: {}", e),
        }
    }
}
