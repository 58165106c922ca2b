//! Integration tests: record rings → telemetry sizing and encoding, and
//! configuration messages changing the telemetry shape.

use growbox::clock::Timestamp;
use growbox::config::SystemConfig;
use growbox::events::{Climate, EventArena, MAX_SENSOR_ITEMS, Payload, SensorKind};
use growbox::rpc::inbound;
use growbox::rpc::outbound::{encode, required_size, shapes};
use growbox::rpc::{InboundReport, MessageWriter, RecordLog};
use growbox::sensors::SampleBuffer;
use growbox::sensors::outlier::aggregate_into;
use growbox::Error;
use heapless::Vec as HVec;

type Arena = EventArena<32>;

/// Fill every ring with events at the widest value each field can take,
/// carrying the maximum number of IDs.
fn widest_log(arena: &mut Arena) -> RecordLog {
    let mut log = RecordLog::new();
    for kind in SensorKind::ALL {
        for _ in 0..log.capacity(kind) {
            let h = arena.alloc(kind, MAX_SENSOR_ITEMS).unwrap();
            let evt = arena.get_mut(h).unwrap();
            evt.payload = if kind.is_climate() {
                let cell = Climate {
                    temperature: -999.99,
                    humidity: 999.99,
                };
                Payload::Climate(HVec::from_slice(&[cell; MAX_SENSOR_ITEMS]).unwrap())
            } else {
                Payload::Scalar(HVec::from_slice(&[u32::MAX; MAX_SENSOR_ITEMS]).unwrap())
            };
            evt.corrupted = (1 << MAX_SENSOR_ITEMS) - 1;
            evt.written = (1 << MAX_SENSOR_ITEMS) - 1;
            evt.timestamp = Timestamp {
                day: u16::MAX,
                ticks: 86_399_999,
            };
            assert_eq!(log.insert(kind, h), None);
        }
    }
    log
}

fn encode_into(log: &RecordLog, arena: &Arena, buf: &mut [u8]) -> (Result<(), Error>, usize, std::vec::Vec<u8>) {
    let mut w = MessageWriter::new(buf);
    let result = encode(log, arena, &mut w);
    (result, w.written(), w.as_bytes().to_vec())
}

#[test]
fn worst_case_rings_fit_the_computed_size() {
    let mut arena = Arena::new();
    let log = widest_log(&mut arena);

    // The configured cardinality is narrower than what is stored.
    let size = required_size(&shapes(&log, &arena, &SystemConfig::default()));
    let mut buf = vec![0u8; size];
    let (result, written, bytes) = encode_into(&log, &arena, &mut buf);

    assert_eq!(result, Ok(()));
    assert!(written <= size, "{} written into {}", written, size);

    let doc: serde_json::Value = serde_json::from_slice(&bytes).expect("telemetry is valid JSON");
    assert_eq!(doc["soilmoist"]["qty"], 8);
    assert_eq!(doc["airtemp"]["qty"], 12);
    assert_eq!(doc["light"]["qty"], 6);
    assert_eq!(doc["light"]["day"], 65535);
    assert_eq!(doc["airtemp"]["temp"][0][7], -999.99);
    assert_eq!(doc["soilmoist"]["value"][7][7], u64::from(u32::MAX));
}

#[test]
fn truncated_buffer_keeps_a_clean_prefix() {
    let mut arena = Arena::new();
    let log = widest_log(&mut arena);
    let size = required_size(&shapes(&log, &arena, &SystemConfig::default()));
    let mut buf = vec![0u8; size];
    let (_, full_len, full) = encode_into(&log, &arena, &mut buf);

    for cut in (0..full_len).step_by(7) {
        let mut small = vec![0u8; cut];
        let (result, written, bytes) = encode_into(&log, &arena, &mut small);
        assert_eq!(result, Err(Error::OutOfMemory), "cut at {}", cut);
        assert_eq!(bytes[..], full[..written]);
        assert!(cut - written < 16, "cut {} stopped at {}", cut, written);
    }
}

#[test]
fn wider_cardinality_grows_the_message_budget() {
    let arena = Arena::new();
    let log = RecordLog::new();
    let mut config = SystemConfig::default();
    let before = required_size(&shapes(&log, &arena, &config));

    let mut report = InboundReport::default();
    inbound::apply(br#"{"sensor":{"light":{"qty":4}}}"#, &mut config, &mut report).unwrap();
    assert!(report.cardinality_changed);

    let after = required_size(&shapes(&log, &arena, &config));
    assert!(after > before);
}

#[test]
fn narrower_cardinality_still_fits_stored_events() {
    let mut arena = Arena::new();
    let mut log = RecordLog::new();
    let h = arena.alloc(SensorKind::SoilMoisture, 2).unwrap();
    arena.get_mut(h).unwrap().payload = Payload::Scalar(HVec::from_slice(&[4_000_000_000, 4_000_000_000]).unwrap());
    log.insert(SensorKind::SoilMoisture, h);

    let mut config = SystemConfig::default();
    let mut report = InboundReport::default();
    inbound::apply(br#"{"sensor":{"soilmoist":{"qty":1}}}"#, &mut config, &mut report).unwrap();

    let size = required_size(&shapes(&log, &arena, &config));
    let mut buf = vec![0u8; size];
    let (result, _, bytes) = encode_into(&log, &arena, &mut buf);
    assert_eq!(result, Ok(()));
    assert!(std::str::from_utf8(&bytes).unwrap().contains("[[4000000000,4000000000]]"));
}

#[test]
fn config_message_survives_unknown_and_partial_content() {
    let mut config = SystemConfig::default();
    let mut report = InboundReport::default();
    let result = inbound::apply(
        br#"{"firmware":{"ota":{"url":"x","chunks":[1,2,3]}},
             "actuators":{"fan":{"threshold":300},"heater":{"threshold":1}},
             "sensor":{"airtemp":{"threshold":310,"resample":9}}}"#,
        &mut config,
        &mut report,
    );

    assert_eq!(result, Err(Error::InvalidRequest));
    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(config.fan.threshold, 310, "sensor threshold applied after the actuator one");
    assert_eq!(config.air.num_resamples, SystemConfig::default().air.num_resamples);
}

#[test]
fn zero_ratio_reply_cannot_stall_aggregation() {
    let mut config = SystemConfig::default();
    for msg in [
        br#"{"sensor":{"soilmoist":{"outlier":[0,1]}}}"#.as_slice(),
        br#"{"sensor":{"soilmoist":{"mad":[0,1]}}}"#.as_slice(),
    ] {
        let mut report = InboundReport::default();
        assert_eq!(inbound::apply(msg, &mut config, &mut report), Err(Error::InvalidRequest));
    }
    assert_eq!(config.validate(), Ok(()));

    let meta = &config.soil;
    let values = vec![1200u32; meta.sample_count()];
    let raw = SampleBuffer::from_scalars(SensorKind::SoilMoisture, meta.num_items, meta.num_resamples, &values).unwrap();
    let mut arena = Arena::new();
    let h = arena.alloc(SensorKind::SoilMoisture, usize::from(meta.num_items)).unwrap();
    assert!(aggregate_into(meta, &raw, arena.get_mut(h).unwrap()).is_ok());
}
