//! Impulse-noise rejection and per-ID aggregation.
//!
//! All sampled IDs of one read are flattened into a single working set so
//! the median and MAD describe the whole sensor population.  Each sample
//! gets a modified z-score `0.6745 * (x − median) / MAD` (MAD floored at
//! the configured minimum); anything outside `±threshold` is an outlier.
//!
//! Per ID, the non-outlier resamples are averaged into the event.  An ID
//! with at least half of its resamples rejected gets its corruption bit
//! set; its aggregate is still written from whatever survived.

use heapless::Vec;

use super::stats::{self, MODIFIED_Z_RATIO, Sample};
use super::{MAX_RAW_SAMPLES, RawSamples, SampleBuffer, SensorMeta};
use crate::error::{Error, Result};
use crate::events::{Climate, MAX_SENSOR_ITEMS, Payload, SensorEvent};

/// Outliers found per ID during one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub outliers: [u8; MAX_SENSOR_ITEMS],
}

impl AggregateReport {
    pub fn outliers(&self, id: usize) -> u8 {
        self.outliers.get(id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.outliers.iter().map(|&n| u32::from(n)).sum()
    }
}

/// OR outlier flags for `samples` into `flags`.  Flags already set are
/// never cleared, so a second field can be checked against the same flags.
pub fn detect_outliers<T: Sample>(
    samples: &[T],
    threshold: f32,
    mad_floor: f32,
    flags: &mut [bool],
) -> Result<()> {
    if threshold <= 0.0 || mad_floor <= 0.0 || flags.len() != samples.len() {
        return Err(Error::InvalidArgument);
    }
    if samples.is_empty() {
        return Ok(());
    }

    let mut work: Vec<T, MAX_RAW_SAMPLES> = Vec::from_slice(samples).map_err(|()| Error::OutOfMemory)?;
    let median = stats::median(&mut work)?;
    let mad = stats::median_abs_deviation(median, &mut work)?
        .to_f32()
        .max(mad_floor);

    let median = median.to_f32();
    for (x, flag) in samples.iter().zip(flags.iter_mut()) {
        let z = stats::modified_z_score(x.to_f32(), median, mad, MODIFIED_Z_RATIO);
        if z < -threshold || z > threshold {
            *flag = true;
        }
    }
    Ok(())
}

/// Fold one raw read into `event`.
///
/// Only IDs present in both `raw.read_mask` and the event's active range
/// are touched; the others keep their written bit clear.
pub fn aggregate_into(meta: &SensorMeta, raw: &SampleBuffer, event: &mut SensorEvent) -> Result<AggregateReport> {
    if raw.kind != event.kind {
        return Err(Error::UnsupportedType);
    }
    let resamples = usize::from(raw.num_resamples);
    if resamples == 0 || raw.samples.len() != usize::from(raw.num_items) * resamples {
        return Err(Error::InvalidArgument);
    }
    let threshold = meta.outlier_threshold.value();
    let mad_floor = meta.mad_floor.value();
    if threshold <= 0.0 || mad_floor <= 0.0 {
        return Err(Error::InvalidArgument);
    }

    let items = usize::from(raw.num_items).min(usize::from(event.active));
    let ids: Vec<usize, MAX_SENSOR_ITEMS> = (0..items).filter(|&id| raw.read_mask & (1 << id) != 0).collect();
    if ids.is_empty() {
        return Ok(AggregateReport::default());
    }

    let mut flags: Vec<bool, MAX_RAW_SAMPLES> = Vec::new();
    flags.resize(ids.len() * resamples, false).map_err(|()| Error::OutOfMemory)?;

    match (&raw.samples, &mut event.payload) {
        (RawSamples::Scalar(samples), Payload::Scalar(out)) => {
            let flat = gather(&ids, resamples, samples)?;
            detect_outliers(&flat, threshold, mad_floor, &mut flags)?;
            let report = for_each_id(&ids, resamples, &flags, |id, kept| {
                let (sum, n) = kept.fold((0u64, 0u64), |(s, n), pos| (s + u64::from(flat[pos]), n + 1));
                if let Some(slot) = out.get_mut(id) {
                    *slot = if n == 0 { 0 } else { (sum / n) as u32 };
                }
            });
            Ok(mark(event, &ids, resamples, report))
        }
        (RawSamples::Climate(samples), Payload::Climate(out)) => {
            let flat = gather(&ids, resamples, samples)?;
            let temps: Vec<f32, MAX_RAW_SAMPLES> = flat.iter().map(|c| c.temperature).collect();
            let hums: Vec<f32, MAX_RAW_SAMPLES> = flat.iter().map(|c| c.humidity).collect();
            detect_outliers(&temps, threshold, mad_floor, &mut flags)?;
            detect_outliers(&hums, threshold, mad_floor, &mut flags)?;
            let report = for_each_id(&ids, resamples, &flags, |id, kept| {
                let (t, h, n) = kept.fold((0.0f32, 0.0f32, 0u32), |(t, h, n), pos| {
                    (t + temps[pos], h + hums[pos], n + 1)
                });
                if let Some(slot) = out.get_mut(id) {
                    *slot = if n == 0 {
                        Climate::default()
                    } else {
                        Climate {
                            temperature: t / n as f32,
                            humidity: h / n as f32,
                        }
                    };
                }
            });
            Ok(mark(event, &ids, resamples, report))
        }
        _ => Err(Error::UnsupportedType),
    }
}

/// Copy the resamples of the selected IDs into one contiguous working set.
fn gather<T: Copy>(ids: &[usize], resamples: usize, samples: &[T]) -> Result<Vec<T, MAX_RAW_SAMPLES>> {
    let mut flat = Vec::new();
    for &id in ids {
        let start = id * resamples;
        let chunk = samples.get(start..start + resamples).ok_or(Error::InvalidArgument)?;
        flat.extend_from_slice(chunk).map_err(|()| Error::OutOfMemory)?;
    }
    Ok(flat)
}

/// Hand each ID the positions of its surviving samples and count the
/// rejected ones.
fn for_each_id(
    ids: &[usize],
    resamples: usize,
    flags: &[bool],
    mut write: impl FnMut(usize, &mut dyn Iterator<Item = usize>),
) -> AggregateReport {
    let mut report = AggregateReport::default();
    for (slot, &id) in ids.iter().enumerate() {
        let base = slot * resamples;
        let span = &flags[base..base + resamples];
        report.outliers[id] = span.iter().filter(|&&f| f).count() as u8;
        let mut kept = span.iter().enumerate().filter(|(_, f)| !**f).map(|(i, _)| base + i);
        write(id, &mut kept);
    }
    report
}

fn mark(event: &mut SensorEvent, ids: &[usize], resamples: usize, report: AggregateReport) -> AggregateReport {
    let limit = resamples.div_ceil(2);
    for &id in ids {
        let bit = 1u16 << id;
        event.written |= bit;
        if usize::from(report.outliers[id]) >= limit {
            event.corrupted |= bit;
        } else {
            event.corrupted &= !bit;
        }
    }
    report
}
