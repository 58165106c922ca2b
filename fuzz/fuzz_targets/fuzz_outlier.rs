//! Fuzz target: `aggregate_into`
//!
//! Interprets the input as a soil read: the first byte picks the read
//! mask, the rest are little-endian `u32` samples.  Aggregation must never
//! panic, and every written value must lie inside the range of its ID's
//! samples.
//!
//! cargo fuzz run fuzz_outlier

#![no_main]

use growbox::events::{EventArena, SensorKind};
use growbox::sensors::{SampleBuffer, SensorMeta, outlier::aggregate_into};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&mask, rest)) = data.split_first() else {
        return;
    };
    let meta = SensorMeta::soil_default();
    let per_id = usize::from(meta.num_resamples);
    let values: Vec<u32> = rest
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .chain(core::iter::repeat(0))
        .take(meta.sample_count())
        .collect();

    let raw = SampleBuffer::from_scalars(SensorKind::SoilMoisture, meta.num_items, meta.num_resamples, &values)
        .unwrap()
        .with_read_mask(u16::from(mask));

    let mut arena: EventArena<1> = EventArena::new();
    let h = arena.alloc(SensorKind::SoilMoisture, usize::from(meta.num_items)).unwrap();
    let event = arena.get_mut(h).unwrap();
    aggregate_into(&meta, &raw, event).unwrap();

    for id in 0..usize::from(meta.num_items) {
        if !event.is_written(id) {
            continue;
        }
        let samples = &values[id * per_id..(id + 1) * per_id];
        let lo = samples.iter().copied().min().unwrap();
        let hi = samples.iter().copied().max().unwrap();
        let v = event.scalar(id).unwrap();
        assert!(v == 0 || (lo..=hi).contains(&v), "id {} aggregate {} outside {}..={}", id, v, lo, hi);
    }
});
