//! Configuration decoder.
//!
//! Recognised paths:
//!
//! ```text
//! sensor/{soilmoist,airtemp,light}/{interval,threshold,qty,resample,outlier,mad}
//! netconn/interval
//! actuators/{pump,fan,bulb}/{max_worktime,min_resttime,threshold}
//! daylength
//! ```
//!
//! The message is parsed into a `serde_json::Value` tree and walked in
//! document order.  An unknown key is skipped together with its whole value
//! node, whatever it contains.  Each recognised leaf is applied as soon as
//! it is read; the first error aborts the rest of the message and leaves
//! the keys already applied in place.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::config::SystemConfig;
use crate::control::ActuatorId;
use crate::error::{Error, Result};
use crate::events::{MAX_SENSOR_ITEMS, SensorKind};
use crate::sensors::{MAX_RESAMPLES, Ratio};

/// What an inbound message changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundReport {
    /// Leaves applied.
    pub applied: u16,
    /// Leaves skipped because their key is unknown.
    pub skipped: u16,
    /// A `qty` or `resample` leaf was applied, so buffers sized from the
    /// sensor cardinality are stale.
    pub cardinality_changed: bool,
}

/// Apply `bytes` onto `config`, recording progress in `report` even when
/// an error stops the walk half way.
pub fn apply(bytes: &[u8], config: &mut SystemConfig, report: &mut InboundReport) -> Result<()> {
    let root: Value = serde_json::from_slice(bytes).map_err(|e| {
        warn!("inbound: parse failed: {}", e);
        Error::MalformedData
    })?;
    let root = object(&root)?;

    for (key, value) in root {
        match key.as_str() {
            "sensor" => {
                for (name, fields) in object(value)? {
                    match SensorKind::from_wire_name(name) {
                        Some(kind) => apply_sensor(kind, object(fields)?, config, report)?,
                        None => skip(report, name),
                    }
                }
            }
            "netconn" => {
                for (name, leaf) in object(value)? {
                    match name.as_str() {
                        "interval" => {
                            config.netconn_interval = interval(leaf)?;
                            report.applied += 1;
                        }
                        _ => skip(report, name),
                    }
                }
            }
            "actuators" => {
                for (name, fields) in object(value)? {
                    match ActuatorId::from_wire_name(name) {
                        Some(id) => apply_actuator(id, object(fields)?, config, report)?,
                        None => skip(report, name),
                    }
                }
            }
            "daylength" => {
                config.daylength = uint(value)?;
                report.applied += 1;
            }
            _ => skip(report, key),
        }
    }
    Ok(())
}

fn apply_sensor(
    kind: SensorKind,
    fields: &Map<String, Value>,
    config: &mut SystemConfig,
    report: &mut InboundReport,
) -> Result<()> {
    for (name, leaf) in fields {
        match name.as_str() {
            "interval" => config.sensor_mut(kind).read_interval = interval(leaf)?,
            "threshold" => config.actuator_mut(ActuatorId::for_sensor(kind)).threshold = int(leaf)?,
            "qty" => {
                config.sensor_mut(kind).num_items = bounded(leaf, MAX_SENSOR_ITEMS)?;
                report.cardinality_changed = true;
            }
            "resample" => {
                config.sensor_mut(kind).num_resamples = bounded(leaf, MAX_RESAMPLES)?;
                report.cardinality_changed = true;
            }
            "outlier" => config.sensor_mut(kind).outlier_threshold = positive_ratio(leaf)?,
            "mad" => config.sensor_mut(kind).mad_floor = positive_ratio(leaf)?,
            _ => {
                skip(report, name);
                continue;
            }
        }
        report.applied += 1;
    }
    Ok(())
}

fn apply_actuator(
    id: ActuatorId,
    fields: &Map<String, Value>,
    config: &mut SystemConfig,
    report: &mut InboundReport,
) -> Result<()> {
    for (name, leaf) in fields {
        let target = config.actuator_mut(id);
        match name.as_str() {
            "max_worktime" => target.max_worktime = uint(leaf)?,
            "min_resttime" => target.min_resttime = uint(leaf)?,
            "threshold" => target.threshold = int(leaf)?,
            _ => {
                skip(report, name);
                continue;
            }
        }
        report.applied += 1;
    }
    Ok(())
}

fn skip(report: &mut InboundReport, key: &str) {
    debug!("inbound: skipping unknown key '{}'", key);
    report.skipped += 1;
}

// ───────────────────────────────────────────────────────────────
// Leaf conversion
// ───────────────────────────────────────────────────────────────

fn object(value: &Value) -> Result<&Map<String, Value>> {
    value.as_object().ok_or(Error::MalformedData)
}

/// Non-negative integer that fits `u32`.
fn uint(value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(Error::MalformedData)
}

fn int(value: &Value) -> Result<i32> {
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(Error::MalformedData)
}

/// Interval in ticks; zero is a policy violation.
fn interval(value: &Value) -> Result<u32> {
    match uint(value)? {
        0 => Err(Error::InvalidRequest),
        v => Ok(v),
    }
}

/// Count in `1..=max`.
fn bounded(value: &Value, max: usize) -> Result<u8> {
    let v = uint(value)?;
    if v == 0 || v as usize > max {
        return Err(Error::InvalidRequest);
    }
    Ok(v as u8)
}

/// `[numerator, denominator]`, both non-zero.  A zero ratio would leave the
/// aggregator unable to run.
fn positive_ratio(value: &Value) -> Result<Ratio> {
    match value.as_array().map(Vec::as_slice) {
        Some([num, den]) => match uint(num)? {
            0 => Err(Error::InvalidRequest),
            num => Ratio::new(num, uint(den)?),
        },
        _ => Err(Error::MalformedData),
    }
}
