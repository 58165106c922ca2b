//! Mock adapters for integration tests.
//!
//! Sensors return a constant reading per type, actuators record every
//! write, the sink records every event and the transport replays scripted
//! replies.  Each can be told to fail.

use std::collections::VecDeque;

use embassy_time::Duration;
use growbox::app::{ActuatorPort, AppEvent, EventSink, SensorPort};
use growbox::control::ActuatorId;
use growbox::events::{Climate, SensorKind};
use growbox::rpc::Transport;
use growbox::sensors::{SampleBuffer, SensorMeta};
use growbox::{Error, Result};

// ── Sensors ───────────────────────────────────────────────────

pub struct MockSensors {
    pub soil: u32,
    pub air: Climate,
    pub light: u32,
    pub failing: Option<SensorKind>,
    /// Every request, in order: (type, read mask).
    pub reads: Vec<(SensorKind, u16)>,
}

#[allow(dead_code)]
impl MockSensors {
    /// Dry soil, mild air, bright light: nothing needs to run.
    pub fn calm() -> Self {
        Self {
            soil: 1_000,
            air: Climate {
                temperature: 22.0,
                humidity: 55.0,
            },
            light: 900,
            failing: None,
            reads: Vec::new(),
        }
    }

    pub fn reads_of(&self, kind: SensorKind) -> usize {
        self.reads.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl SensorPort for MockSensors {
    fn read(&mut self, meta: &SensorMeta, read_mask: u16) -> Result<SampleBuffer> {
        self.reads.push((meta.kind, read_mask));
        if self.failing == Some(meta.kind) {
            return Err(Error::SensorFail);
        }
        let n = meta.sample_count();
        let buffer = match meta.kind {
            SensorKind::SoilMoisture => {
                SampleBuffer::from_scalars(meta.kind, meta.num_items, meta.num_resamples, &vec![self.soil; n])?
            }
            SensorKind::Lightness => {
                SampleBuffer::from_scalars(meta.kind, meta.num_items, meta.num_resamples, &vec![self.light; n])?
            }
            SensorKind::AirClimate => SampleBuffer::from_climate(meta.num_items, meta.num_resamples, &vec![self.air; n])?,
        };
        Ok(buffer.with_read_mask(read_mask))
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockOutputs {
    pub writes: Vec<(ActuatorId, bool)>,
    pub failing: Option<ActuatorId>,
}

#[allow(dead_code)]
impl MockOutputs {
    pub fn is_on(&self, id: ActuatorId) -> bool {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == id)
            .is_some_and(|(_, on)| *on)
    }

    pub fn writes_to(&self, id: ActuatorId) -> usize {
        self.writes.iter().filter(|(a, _)| *a == id).count()
    }
}

impl ActuatorPort for MockOutputs {
    fn write(&mut self, id: ActuatorId, on: bool) -> Result<()> {
        if self.failing == Some(id) {
            return Err(Error::ActuatorFail);
        }
        self.writes.push((id, on));
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedTransport {
    pub sent: Vec<Vec<u8>>,
    pub replies: VecDeque<Vec<u8>>,
    pub send_fails: bool,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn reply(&mut self, msg: &str) {
        self.replies.push_back(msg.as_bytes().to_vec());
    }

    pub fn last_sent(&self) -> Option<String> {
        self.sent.last().map(|m| String::from_utf8_lossy(m).into_owned())
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.send_fails {
            return Err(Error::Timeout);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let msg = self.replies.pop_front().ok_or(Error::Timeout)?;
        let dst = buf.get_mut(..msg.len()).ok_or(Error::OutOfMemory)?;
        dst.copy_from_slice(&msg);
        Ok(msg.len())
    }
}
