//! Owned message buffers for the network task.
//!
//! The outbound buffer is sized from the sensor cardinality before each
//! fill.  [`OutboundBuffer::prepare`] keeps the allocation when the size
//! is unchanged and reallocates otherwise, so steady-state operation never
//! touches the heap.

use log::debug;

use super::writer::MessageWriter;
use crate::error::Result;

/// Largest inbound configuration message accepted.
pub const MAX_INBOUND: usize = 1024;

#[derive(Debug, Default)]
pub struct OutboundBuffer {
    buf: Vec<u8>,
    written: usize,
    reallocations: u32,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the buffer exactly `size` bytes long and empty.  Returns
    /// whether it had to reallocate.
    pub fn prepare(&mut self, size: usize) -> bool {
        self.written = 0;
        if self.buf.len() == size {
            return false;
        }
        debug!("outbound buffer: {} -> {} bytes", self.buf.len(), size);
        self.buf = vec![0; size];
        self.reallocations += 1;
        true
    }

    /// Run `fill` over the whole buffer.  On failure the bytes written up
    /// to the error stay readable through [`as_bytes`](Self::as_bytes).
    pub fn fill(&mut self, fill: impl FnOnce(&mut MessageWriter<'_>) -> Result<()>) -> Result<&[u8]> {
        let mut w = MessageWriter::new(&mut self.buf);
        let result = fill(&mut w);
        self.written = w.written();
        result.map(|()| &self.buf[..self.written])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.written]
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }
}

/// Receive buffer sized for the largest accepted message.
#[derive(Debug)]
pub struct InboundBuffer {
    buf: Vec<u8>,
    len: usize,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self {
            buf: vec![0; MAX_INBOUND],
            len: 0,
        }
    }

    /// Whole buffer, for the transport to receive into.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Record how many bytes the transport delivered.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.buf.len());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for InboundBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound and inbound buffers of the network task.
#[derive(Debug, Default)]
pub struct RawMessageBuffers {
    pub outbound: OutboundBuffer,
    pub inbound: InboundBuffer,
}

impl RawMessageBuffers {
    pub fn new() -> Self {
        Self::default()
    }
}
