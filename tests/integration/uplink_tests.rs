//! Integration tests: network queue → Uplink → transport, and
//! configuration replies flowing back into the pipeline.

use embassy_time::Duration;
use growbox::app::{AppEvent, ConfigCell, SensorPipeline, Uplink};
use growbox::config::SystemConfig;
use growbox::events::{EventQueue, SensorKind, SharedArena, Wait};
use growbox::Error;

use super::mock_hw::{MockOutputs, MockSensors, RecordingSink, ScriptedTransport};

type Arena = SharedArena<48>;
type Display = EventQueue<4>;
type Network = EventQueue<8>;

const TIMEOUT: Duration = Duration::from_millis(100);

/// Empty the display queue the way the display task does.
fn drain_display(arena: &Arena, display: &Display) {
    while display.consume(arena, Wait::Poll, |_| ()).is_ok() {}
}

#[test]
fn exchange_sends_telemetry_and_applies_the_reply() {
    let (arena, display, network) = (Arena::new(), Display::new(), Network::new());
    let cell = ConfigCell::default();
    let (config, _) = cell.snapshot();
    let mut pipeline = SensorPipeline::new(&arena, &display, &network, &config, 0);
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut sensors = MockSensors::calm();
    let mut transport = ScriptedTransport::default();
    let mut sink = RecordingSink::default();

    pipeline.sample_all(&mut sensors, &mut MockOutputs::default(), 0, &mut sink);
    drain_display(&arena, &display);

    transport.reply(r#"{"sensor":{"soilmoist":{"interval":20000}},"netconn":{"interval":5000}}"#);
    let exchange = uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();

    let sent = transport.last_sent().unwrap();
    assert_eq!(exchange.sent, sent.len());
    let doc: serde_json::Value = serde_json::from_str(&sent).unwrap();
    assert_eq!(doc["soilmoist"]["qty"], 1);
    assert_eq!(doc["soilmoist"]["value"][0], serde_json::json!([1000, 1000]));
    assert_eq!(doc["airtemp"]["hum"][0][0], 55.0);

    let report = exchange.inbound.unwrap().unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(cell.generation(), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TelemetrySent { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ConfigApplied(_))), 1);

    // The control task picks the new configuration up on its next pass.
    assert!(pipeline.sync_config(&cell));
    assert!(!pipeline.sync_config(&cell));
    assert_eq!(pipeline.scheduler().meta(SensorKind::SoilMoisture).read_interval, 20_000);
    assert_eq!(pipeline.next_due_in(0), 20_000);
}

#[test]
fn silence_from_the_supervisor_is_not_an_error() {
    let (arena, network) = (Arena::new(), Network::new());
    let cell = ConfigCell::default();
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut transport = ScriptedTransport::default();

    let exchange = uplink.exchange(&mut transport, TIMEOUT, &mut RecordingSink::default()).unwrap();
    assert_eq!(exchange.inbound, None);
    assert_eq!(transport.sent.len(), 1);
    assert_eq!(cell.generation(), 0);
}

#[test]
fn failed_send_propagates_and_skips_the_reply() {
    let (arena, network) = (Arena::new(), Network::new());
    let cell = ConfigCell::default();
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut transport = ScriptedTransport {
        send_fails: true,
        ..ScriptedTransport::default()
    };
    transport.reply(r#"{"daylength":1}"#);

    assert_eq!(
        uplink.exchange(&mut transport, TIMEOUT, &mut RecordingSink::default()),
        Err(Error::Timeout)
    );
    assert_eq!(transport.replies.len(), 1, "reply left unread");
    assert_eq!(cell.snapshot().0.daylength, SystemConfig::default().daylength);
}

#[test]
fn rejected_reply_is_reported_and_partially_kept() {
    let (arena, network) = (Arena::new(), Network::new());
    let cell = ConfigCell::default();
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut transport = ScriptedTransport::default();
    let mut sink = RecordingSink::default();
    transport.reply(r#"{"actuators":{"pump":{"max_worktime":30000}},"sensor":{"light":{"qty":0}}}"#);

    let exchange = uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();
    assert_eq!(exchange.inbound, Some(Err(Error::InvalidRequest)));
    assert_eq!(cell.snapshot().0.pump.max_worktime, 30_000);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ConfigRejected { error: Error::InvalidRequest, .. })),
        1
    );
}

#[test]
fn steady_state_reuses_the_outbound_buffer() {
    let (arena, display, network) = (Arena::new(), Display::new(), Network::new());
    let cell = ConfigCell::default();
    let (config, _) = cell.snapshot();
    let mut pipeline = SensorPipeline::new(&arena, &display, &network, &config, 0);
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut sensors = MockSensors::calm();
    let mut transport = ScriptedTransport::default();
    let mut sink = RecordingSink::default();

    for round in 0..5u32 {
        pipeline.sample_all(&mut sensors, &mut MockOutputs::default(), round * 60_000, &mut sink);
        drain_display(&arena, &display);
        uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();
    }
    assert_eq!(uplink.reallocations(), 1);

    // A cardinality change resizes once, then settles again.
    transport.reply(r#"{"sensor":{"light":{"qty":3}}}"#);
    uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();
    uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();
    uplink.exchange(&mut transport, TIMEOUT, &mut sink).unwrap();
    assert_eq!(uplink.reallocations(), 2);
}

#[test]
fn ring_overflow_returns_slots_to_the_arena() {
    let (arena, display, network) = (Arena::new(), Display::new(), Network::new());
    let cell = ConfigCell::default();
    let (config, _) = cell.snapshot();
    let mut pipeline = SensorPipeline::new(&arena, &display, &network, &config, 0);
    let mut uplink = Uplink::new(&arena, &network, &cell);
    let mut sensors = MockSensors::calm();
    let mut sink = RecordingSink::default();

    // Light is read every minute and its ring holds six records.
    for minute in 0..10u32 {
        pipeline.sample_all(&mut sensors, &mut MockOutputs::default(), minute * 60_000, &mut sink);
        drain_display(&arena, &display);
        uplink.drain();
    }

    let records = uplink.records();
    assert_eq!(records.len(SensorKind::Lightness), records.capacity(SensorKind::Lightness));
    assert_eq!(records.len(SensorKind::SoilMoisture), records.capacity(SensorKind::SoilMoisture));
    let held: usize = SensorKind::ALL.iter().map(|&k| records.len(k)).sum();
    assert_eq!(arena.in_use(), held);

    assert_eq!(uplink.release(), held);
    assert_eq!(arena.in_use(), 0);
}
