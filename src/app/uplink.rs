//! Network side of the event flow.
//!
//! [`Uplink`] drains the network queue into the per-sensor record rings,
//! renders them into a telemetry message and applies configuration sent
//! back by the supervisor.  It is owned by the network task; the rings and
//! the message buffers never leave it.
//!
//! ```text
//!  network queue ──▶ drain ──▶ RecordLog ──▶ outbound_payload ──▶ Transport::send
//!                                                                      │
//!  ConfigCell ◀── apply_inbound ◀── InboundBuffer ◀── Transport::recv ◀┘
//! ```

use embassy_time::Duration;
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::arena::{EventSource, SharedArena};
use crate::events::queue::EventQueue;
use crate::rpc::transport::Transport;
use crate::rpc::{InboundReport, RawMessageBuffers, RecordLog, inbound, outbound};

use super::events::AppEvent;
use super::ports::EventSink;
use super::service::ConfigCell;

/// Outcome of one [`Uplink::exchange`].
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Telemetry bytes sent.
    pub sent: usize,
    /// Result of applying the reply, if one arrived.
    pub inbound: Option<Result<InboundReport>>,
}

pub struct Uplink<'a, const N: usize, const QN: usize> {
    arena: &'a SharedArena<N>,
    network: &'a EventQueue<QN>,
    config: &'a ConfigCell,
    records: RecordLog,
    buffers: RawMessageBuffers,
}

impl<'a, const N: usize, const QN: usize> Uplink<'a, N, QN> {
    pub fn new(arena: &'a SharedArena<N>, network: &'a EventQueue<QN>, config: &'a ConfigCell) -> Self {
        Self {
            arena,
            network,
            config,
            records: RecordLog::new(),
            buffers: RawMessageBuffers::new(),
        }
    }

    /// Move every queued handle into its ring.  Handles pushed out of a
    /// full ring go back to the arena.  Returns how many were recorded.
    pub fn drain(&mut self) -> usize {
        let mut recorded = 0;
        while let Some(handle) = self.network.try_receive() {
            let Some(event) = self.arena.snapshot(handle) else {
                warn!("Uplink: queued slot {} is not allocated", handle.index());
                continue;
            };
            if let Some(old) = self.records.insert(event.kind, handle) {
                if let Err(e) = self.arena.free(old) {
                    warn!("Uplink: freeing evicted slot {} failed: {}", old.index(), e);
                }
            }
            recorded += 1;
        }
        recorded
    }

    /// Render the rings into the outbound buffer.
    ///
    /// The buffer is sized for the worst case of the current cardinality
    /// first, reusing the previous allocation when the size is unchanged.
    pub fn outbound_payload(&mut self) -> Result<&[u8]> {
        let (config, _) = self.config.snapshot();
        let shapes = outbound::shapes(&self.records, self.arena, &config);
        let size = outbound::required_size(&shapes);
        self.buffers.outbound.prepare(size);

        let records = &self.records;
        let arena = self.arena;
        self.buffers.outbound.fill(|w| outbound::encode(records, arena, w))
    }

    /// Apply a configuration message to the shared config.
    ///
    /// The message is applied to a copy; the copy is published if at least
    /// one key took effect, even when a later key failed.
    pub fn apply_inbound(&self, bytes: &[u8], sink: &mut impl EventSink) -> Result<InboundReport> {
        let (mut config, _) = self.config.snapshot();
        let mut report = InboundReport::default();
        let result = inbound::apply(bytes, &mut config, &mut report);

        if report.applied > 0 {
            let generation = self.config.store(config);
            info!(
                "Uplink: {} config keys applied (generation {}, {} skipped)",
                report.applied, generation, report.skipped
            );
        }

        match result {
            Ok(()) => {
                sink.emit(&AppEvent::ConfigApplied(report));
                Ok(report)
            }
            Err(error) => {
                warn!("Uplink: config message rejected: {}", error);
                sink.emit(&AppEvent::ConfigRejected { error, report });
                Err(error)
            }
        }
    }

    /// One network round: drain, send telemetry, then wait up to `timeout`
    /// for a configuration reply.
    pub fn exchange(
        &mut self,
        transport: &mut impl Transport,
        timeout: Duration,
        sink: &mut impl EventSink,
    ) -> Result<Exchange> {
        let drained = self.drain();
        debug!("Uplink: {} new records", drained);

        let payload = self.outbound_payload()?;
        let sent = payload.len();
        transport.send(payload)?;
        sink.emit(&AppEvent::TelemetrySent { bytes: sent });

        self.buffers.inbound.clear();
        let inbound = match transport.recv(self.buffers.inbound.as_mut_slice(), timeout) {
            Ok(len) => {
                self.buffers.inbound.set_len(len);
                Some(self.apply_inbound(self.buffers.inbound.as_bytes(), sink))
            }
            Err(Error::Timeout) => None,
            Err(e) => return Err(e),
        };
        Ok(Exchange { sent, inbound })
    }

    /// Hand every recorded slot back to the arena.
    pub fn release(&mut self) -> usize {
        self.records.release_all(self.arena)
    }

    pub fn records(&self) -> &RecordLog {
        &self.records
    }

    /// Times the outbound buffer had to be reallocated.
    pub fn reallocations(&self) -> u32 {
        self.buffers.outbound.reallocations()
    }
}
