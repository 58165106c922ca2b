//! Transport abstraction: any message-oriented link to the supervisor.
//!
//! Framing, security and retries belong to the implementation (MQTT
//! client, serial bridge, ...).  The uplink only hands over whole
//! messages and asks for whole messages back.

use embassy_time::Duration;

use crate::error::{Error, Result};

/// Message-oriented transport channel.
pub trait Transport {
    /// Send one complete message.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one message into `buf`, waiting at most `timeout`.
    /// Returns the message length; [`Error::Timeout`] if nothing arrived.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

/// A null transport that discards all sends and never receives.
/// Useful as a default when no supervisor is connected.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn recv(&mut self, _buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        Err(Error::Timeout)
    }
}
