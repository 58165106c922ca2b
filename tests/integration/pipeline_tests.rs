//! Integration tests: SensorPipeline → aggregation → actuators → queues.

use growbox::app::{AppEvent, Consumer, SensorPipeline};
use growbox::config::SystemConfig;
use growbox::control::{ActuatorId, ActuatorStatus};
use growbox::events::{Climate, EventQueue, SensorKind, SharedArena, Wait};
use growbox::Error;

use super::mock_hw::{MockOutputs, MockSensors, RecordingSink};

type Arena = SharedArena<32>;
type Queue = EventQueue<8>;

fn pipeline<'a>(arena: &'a Arena, dq: &'a Queue, nq: &'a Queue, config: &SystemConfig) -> SensorPipeline<'a, 32, 8, 8> {
    SensorPipeline::new(arena, dq, nq, config, 0)
}

// ── Fan-out ───────────────────────────────────────────────────

#[test]
fn boot_reads_every_sensor_and_feeds_both_queues() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors::calm();
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    p.start(&mut sink);
    assert_eq!(p.sample_all(&mut sensors, &mut outputs, 0, &mut sink), 3);

    assert_eq!(dq.len(), 3);
    assert_eq!(nq.len(), 3);
    assert_eq!(arena.in_use(), 6);
    assert_eq!(p.stats().events, 3);
    assert!(outputs.writes.is_empty(), "calm readings switch nothing");
    assert_eq!(sink.events.first(), Some(&AppEvent::Started));
}

#[test]
fn display_consumer_returns_slots() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors::calm();

    p.sample_all(&mut sensors, &mut MockOutputs::default(), 0, &mut RecordingSink::default());

    let mut kinds = Vec::new();
    while let Ok(kind) = dq.consume(&arena, Wait::Poll, |evt| evt.kind) {
        kinds.push(kind);
    }
    assert_eq!(kinds, [SensorKind::SoilMoisture, SensorKind::AirClimate, SensorKind::Lightness]);
    assert_eq!(arena.in_use(), 3, "network copies stay until the uplink drains them");
}

#[test]
fn full_queues_evict_and_free_oldest() {
    let arena: SharedArena<16> = SharedArena::new();
    let dq: EventQueue<2> = EventQueue::new();
    let nq: EventQueue<2> = EventQueue::new();
    let config = SystemConfig::default();
    let mut p = SensorPipeline::new(&arena, &dq, &nq, &config, 0);
    let mut sensors = MockSensors::calm();
    let mut sink = RecordingSink::default();

    p.sample_all(&mut sensors, &mut MockOutputs::default(), 0, &mut sink);
    p.sample_all(&mut sensors, &mut MockOutputs::default(), 60_000, &mut sink);

    let stats = p.stats();
    assert_eq!(stats.events, 6);
    assert_eq!(stats.display_evictions, 4);
    assert_eq!(stats.network_evictions, 4);
    assert_eq!(arena.in_use(), 4, "only queued events hold slots");
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::Evicted { consumer: Consumer::Display })),
        4
    );
}

#[test]
fn arena_exhaustion_drops_readings_not_the_loop() {
    let arena: SharedArena<2> = SharedArena::new();
    let dq: EventQueue<4> = EventQueue::new();
    let nq: EventQueue<4> = EventQueue::new();
    let config = SystemConfig::default();
    let mut p = SensorPipeline::new(&arena, &dq, &nq, &config, 0);
    let mut sensors = MockSensors::calm();
    let mut sink = RecordingSink::default();

    assert_eq!(p.sample_all(&mut sensors, &mut MockOutputs::default(), 0, &mut sink), 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ReadingDropped { error: Error::ResourceExhausted, .. })),
        2
    );
    assert_eq!(p.stats().arena_exhausted, 2);
    assert_eq!(p.stats().dropped, 2);

    // Freeing the display copy leaves room for one event but no network copy.
    dq.consume(&arena, Wait::Poll, |_| ()).unwrap();
    assert_eq!(p.sample_all(&mut sensors, &mut MockOutputs::default(), 30_000, &mut sink), 1);
    assert_eq!(dq.len(), 1);
    assert_eq!(nq.len(), 1);
    assert_eq!(p.stats().arena_exhausted, 3);
}

#[test]
fn failing_sensor_does_not_block_the_others() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        failing: Some(SensorKind::AirClimate),
        ..MockSensors::calm()
    };
    let mut sink = RecordingSink::default();

    assert_eq!(p.sample_all(&mut sensors, &mut MockOutputs::default(), 0, &mut sink), 2);
    assert_eq!(sensors.reads_of(SensorKind::Lightness), 1);
    assert_eq!(p.stats().sensor_failures, 1);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::SensorFailed {
                kind: SensorKind::AirClimate,
                error: Error::SensorFail
            }
        )),
        1
    );
}

// ── Elapsed time per actuator ─────────────────────────────────

#[test]
fn pump_runs_on_the_soil_interval_not_the_measured_gap() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let mut config = SystemConfig::default();
    config.pump.max_worktime = 200_000;
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        soil: 3_000,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    p.sample_all(&mut sensors, &mut outputs, 0, &mut sink);
    let pump = p.actuator(ActuatorId::Pump);
    assert_eq!(pump.status, ActuatorStatus::On);
    assert_eq!(pump.curr_worktime, 60_000);
    assert!(outputs.is_on(ActuatorId::Pump));
    assert!(p.scheduler().is_fast_polling(SensorKind::SoilMoisture));

    // Fast poll: soil every 10 s, intermediate reads only sample ID 0.
    p.sample_all(&mut sensors, &mut outputs, 12_000, &mut sink);
    assert_eq!(sensors.reads.last(), Some(&(SensorKind::SoilMoisture, 0b01)));
    assert_eq!(p.actuator(ActuatorId::Pump).curr_worktime, 70_000);
    assert_eq!(outputs.writes_to(ActuatorId::Pump), 1, "no write without a status change");
}

#[test]
fn pump_pause_releases_fast_poll() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        soil: 3_000,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    p.sample_all(&mut sensors, &mut outputs, 0, &mut sink);
    p.sample_all(&mut sensors, &mut outputs, 10_000, &mut sink);

    assert_eq!(p.actuator(ActuatorId::Pump).status, ActuatorStatus::Pause);
    assert_eq!(outputs.writes, [(ActuatorId::Pump, true), (ActuatorId::Pump, false)]);
    assert!(!p.scheduler().is_fast_polling(SensorKind::SoilMoisture));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ActuatorChanged(t) if t.id == ActuatorId::Pump)),
        2
    );
}

#[test]
fn fan_runs_on_the_air_read_interval() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        air: Climate {
            temperature: 35.0,
            humidity: 40.0,
        },
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    p.sample_all(&mut sensors, &mut outputs, 0, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Fan).status, ActuatorStatus::On);
    assert_eq!(p.actuator(ActuatorId::Fan).curr_worktime, 30_000);

    p.sample_all(&mut sensors, &mut outputs, 45_000, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Fan).curr_worktime, 60_000);
}

#[test]
fn bulb_runs_on_the_measured_gap() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        light: 0,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    p.sample_all(&mut sensors, &mut outputs, 0, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Bulb).status, ActuatorStatus::On);
    assert_eq!(p.actuator(ActuatorId::Bulb).curr_worktime, 0);

    p.sample_all(&mut sensors, &mut outputs, 90_000, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Bulb).curr_worktime, 90_000);
}

#[test]
fn daylight_budget_follows_natural_light() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let day = config.daylength;
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        light: 700,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();
    let mut sink = RecordingSink::default();

    for now in [0, 60_000, 130_000] {
        p.sample_all(&mut sensors, &mut outputs, now, &mut sink);
    }
    assert_eq!(p.daylight().accumulated(), 130_000);
    assert_eq!(p.actuator(ActuatorId::Bulb).max_worktime, day - 130_000);

    // Dusk: the smoothed reading drops below the threshold.
    sensors.light = 0;
    p.sample_all(&mut sensors, &mut outputs, 190_000, &mut sink);
    let bulb = p.actuator(ActuatorId::Bulb);
    assert_eq!(bulb.status, ActuatorStatus::On);
    assert_eq!(bulb.max_worktime, day - 190_000);
    assert_eq!(bulb.curr_worktime, 60_000);

    // Bright again: the lit period ends and the count restarts.
    sensors.light = 700;
    p.sample_all(&mut sensors, &mut outputs, 250_000, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Bulb).status, ActuatorStatus::Off);
    p.sample_all(&mut sensors, &mut outputs, 310_000, &mut sink);
    assert_eq!(p.daylight().accumulated(), 60_000);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn failed_output_breaks_actuator_until_cleared() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let config = SystemConfig::default();
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        soil: 3_000,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs {
        failing: Some(ActuatorId::Pump),
        ..MockOutputs::default()
    };
    let mut sink = RecordingSink::default();

    assert_eq!(p.sample_all(&mut sensors, &mut outputs, 0, &mut sink), 3, "event still delivered");
    assert_eq!(p.actuator(ActuatorId::Pump).status, ActuatorStatus::Broken);
    assert_eq!(p.stats().actuator_faults, 1);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::ActuatorFault {
                id: ActuatorId::Pump,
                error: Error::ActuatorFail
            }
        )),
        1
    );

    outputs.failing = None;
    p.sample_all(&mut sensors, &mut outputs, 60_000, &mut sink);
    assert_eq!(p.actuator(ActuatorId::Pump).status, ActuatorStatus::Broken);
    assert_eq!(outputs.writes_to(ActuatorId::Pump), 0);

    let t = p.clear_fault(ActuatorId::Pump, &mut outputs, &mut sink).unwrap().unwrap();
    assert_eq!((t.from, t.to), (ActuatorStatus::Broken, ActuatorStatus::Off));
    assert_eq!(outputs.writes, [(ActuatorId::Pump, false)]);
}

#[test]
fn reading_without_the_pumps_ids_leaves_it_alone() {
    let (arena, dq, nq) = (Arena::new(), Queue::new(), Queue::new());
    let mut config = SystemConfig::default();
    config.pump.sensor_mask = 0b10;
    let mut p = pipeline(&arena, &dq, &nq, &config);
    let mut sensors = MockSensors {
        soil: 3_000,
        ..MockSensors::calm()
    };
    let mut outputs = MockOutputs::default();

    p.sample_all(&mut sensors, &mut outputs, 0, &mut RecordingSink::default());
    assert_eq!(p.actuator(ActuatorId::Pump).status, ActuatorStatus::On);

    // A partial read of ID 0 only: the pump listens to ID 1.
    let h = {
        let meta = config.soil.clone();
        let raw = growbox::sensors::SampleBuffer::from_scalars(
            SensorKind::SoilMoisture,
            meta.num_items,
            meta.num_resamples,
            &vec![3_000; meta.sample_count()],
        )
        .unwrap()
        .with_read_mask(0b01);
        p.on_sensor_sample(&meta, &raw, 5_000).unwrap()
    };
    assert_eq!(p.control(h, 5_000, &mut outputs, &mut RecordingSink::default()), Ok(None));
    assert_eq!(p.actuator(ActuatorId::Pump).curr_worktime, 60_000, "skipped, not stepped");
}
