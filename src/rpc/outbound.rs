//! Telemetry encoder.
//!
//! One section per sensor type, rows newest first:
//!
//! ```text
//! {"soilmoist":{"qty":2,"day":3,"ticks":4500,"corrupt":[0,2],"value":[[512,530],[509,9000]]},
//!  "airtemp":{"qty":1,"day":3,"ticks":4100,"corrupt":[0],"temp":[[24.50]],"hum":[[61.25]]},
//!  "light":{"qty":0,"day":0,"ticks":0,"corrupt":[],"value":[]}}
//! ```
//!
//! (without the line breaks).  `day`/`ticks` are the timestamp of the
//! newest row; holes in the ring are skipped and never count as newest.

use heapless::Vec;

use super::record::{MAX_RECORDS, RecordLog};
use super::writer::MessageWriter;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::events::{EventSource, SensorEvent, SensorKind};

/// Display widths, in characters.
pub const QTY_WIDTH: usize = 3;
pub const DAY_WIDTH: usize = 5;
pub const TICKS_WIDTH: usize = 8;
pub const CORRUPT_WIDTH: usize = 3;
pub const VALUE_WIDTH: usize = 10;
pub const TEMP_WIDTH: usize = 7;
pub const HUM_WIDTH: usize = 6;

const OPEN: &str = "{";
const CLOSE: &str = "}";
const SEP: &str = ",";
const QUOTE: &str = "\"";
const QTY: &str = "\":{\"qty\":";
const DAY: &str = ",\"day\":";
const TICKS: &str = ",\"ticks\":";
const CORRUPT: &str = ",\"corrupt\":[";
const VALUE: &str = "],\"value\":[";
const TEMP: &str = "],\"temp\":[";
const HUM: &str = "],\"hum\":[";
const SECTION_CLOSE: &str = "]}";
const ROW_OPEN: &str = "[";
const ROW_CLOSE: &str = "]";

/// Worst-case rows and values per row of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionShape {
    pub rows: usize,
    pub items: usize,
}

/// Shapes for the current configuration, widened by any stored event
/// that carries more IDs than currently configured.
pub fn shapes(log: &RecordLog, source: &impl EventSource, config: &SystemConfig) -> [SectionShape; SensorKind::COUNT] {
    SensorKind::ALL.map(|kind| {
        let stored = log
            .newest_first(kind)
            .into_iter()
            .filter_map(|h| source.snapshot(h))
            .map(|e| usize::from(e.active))
            .max()
            .unwrap_or(0);
        SectionShape {
            rows: log.capacity(kind),
            items: usize::from(config.sensor(kind).num_items).max(stored),
        }
    })
}

/// Upper bound on the encoded size for the given shapes.
pub fn required_size(shapes: &[SectionShape; SensorKind::COUNT]) -> usize {
    let rows_of = |shape: &SectionShape, width: usize| {
        shape.rows * (ROW_OPEN.len() + shape.items * (width + SEP.len()) + ROW_CLOSE.len() + SEP.len())
    };
    let sections: usize = SensorKind::ALL
        .iter()
        .zip(shapes)
        .map(|(kind, shape)| {
            let head = QUOTE.len()
                + kind.wire_name().len()
                + QTY.len()
                + QTY_WIDTH
                + DAY.len()
                + DAY_WIDTH
                + TICKS.len()
                + TICKS_WIDTH
                + CORRUPT.len()
                + shape.rows * (CORRUPT_WIDTH + SEP.len());
            let body = if kind.is_climate() {
                TEMP.len() + rows_of(shape, TEMP_WIDTH) + HUM.len() + rows_of(shape, HUM_WIDTH)
            } else {
                VALUE.len() + rows_of(shape, VALUE_WIDTH)
            };
            head + body + SECTION_CLOSE.len()
        })
        .sum();
    OPEN.len() + sections + SEP.len() * (SensorKind::COUNT - 1) + CLOSE.len()
}

/// Encode every ring into `w`.
pub fn encode(log: &RecordLog, source: &impl EventSource, w: &mut MessageWriter<'_>) -> Result<()> {
    w.write_literal(OPEN)?;
    for (i, kind) in SensorKind::ALL.into_iter().enumerate() {
        if i > 0 {
            w.write_literal(SEP)?;
        }
        let rows: Vec<SensorEvent, MAX_RECORDS> = log
            .newest_first(kind)
            .into_iter()
            .filter_map(|h| source.snapshot(h))
            .filter(|e| e.kind == kind)
            .collect();
        encode_section(kind, &rows, w)?;
    }
    w.write_literal(CLOSE)
}

fn encode_section(kind: SensorKind, rows: &[SensorEvent], w: &mut MessageWriter<'_>) -> Result<()> {
    let stamp = rows.first().map(|e| e.timestamp).unwrap_or_default();

    w.write_literal(QUOTE)?;
    w.write_literal(kind.wire_name())?;
    w.write_literal(QTY)?;
    w.write_uint(rows.len() as u64, QTY_WIDTH)?;
    w.write_literal(DAY)?;
    w.write_uint(u64::from(stamp.day), DAY_WIDTH)?;
    w.write_literal(TICKS)?;
    w.write_uint(u64::from(stamp.ticks), TICKS_WIDTH)?;

    w.write_literal(CORRUPT)?;
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            w.write_literal(SEP)?;
        }
        w.write_uint(u64::from(row.corrupted), CORRUPT_WIDTH)?;
    }

    if kind.is_climate() {
        w.write_literal(TEMP)?;
        write_rows(w, rows, temperature_cell)?;
        w.write_literal(HUM)?;
        write_rows(w, rows, humidity_cell)?;
    } else {
        w.write_literal(VALUE)?;
        write_rows(w, rows, scalar_cell)?;
    }
    w.write_literal(SECTION_CLOSE)
}

fn write_rows(
    w: &mut MessageWriter<'_>,
    rows: &[SensorEvent],
    cell: fn(&mut MessageWriter<'_>, &SensorEvent, usize) -> Result<()>,
) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            w.write_literal(SEP)?;
        }
        w.write_literal(ROW_OPEN)?;
        for id in 0..row.payload.len() {
            if id > 0 {
                w.write_literal(SEP)?;
            }
            cell(w, row, id)?;
        }
        w.write_literal(ROW_CLOSE)?;
    }
    Ok(())
}

fn scalar_cell(w: &mut MessageWriter<'_>, row: &SensorEvent, id: usize) -> Result<()> {
    w.write_uint(u64::from(row.scalar(id).unwrap_or(0)), VALUE_WIDTH)
}

fn temperature_cell(w: &mut MessageWriter<'_>, row: &SensorEvent, id: usize) -> Result<()> {
    w.write_fixed(row.climate(id).map_or(0.0, |c| c.temperature), TEMP_WIDTH)
}

fn humidity_cell(w: &mut MessageWriter<'_>, row: &SensorEvent, id: usize) -> Result<()> {
    w.write_fixed(row.climate(id).map_or(0.0, |c| c.humidity), HUM_WIDTH)
}
