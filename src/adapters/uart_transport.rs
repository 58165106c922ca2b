//! Supervisor link over a UART.
//!
//! One message per line: the telemetry JSON goes out followed by `\n`, and
//! a configuration reply is read up to the next `\n` or until the timeout
//! runs out.  The payloads never contain raw newlines.

use embassy_time::Duration;
use esp_idf_svc::hal::delay::TickType;
use esp_idf_svc::hal::uart::UartDriver;
use log::warn;

use crate::error::{Error, Result};
use crate::rpc::transport::Transport;

pub struct UartTransport {
    uart: UartDriver<'static>,
}

impl UartTransport {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self { uart }
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.uart.write(data).map_err(|e| {
                warn!("uart: write failed: {}", e);
                Error::Timeout
            })?;
            data = &data[n..];
        }
        Ok(())
    }
}

impl Transport for UartTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)?;
        self.write_all(b"\n")
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let ticks = TickType::new_millis(timeout.as_millis()).ticks();
        let mut len = 0;
        let mut byte = [0u8; 1];
        while len < buf.len() {
            let n = self.uart.read(&mut byte, ticks).map_err(|e| {
                warn!("uart: read failed: {}", e);
                Error::Timeout
            })?;
            if n == 0 {
                return Err(Error::Timeout);
            }
            if byte[0] == b'\n' {
                return Ok(len);
            }
            buf[len] = byte[0];
            len += 1;
        }
        Err(Error::OutOfMemory)
    }
}
