//! Bounds-checked primitive writer for outbound messages.
//!
//! Every primitive is rendered into a small stack buffer first and only
//! copied into the destination once it is known to fit, so a failed write
//! leaves the already-written prefix intact and [`MessageWriter::written`]
//! is exactly the length of that prefix.
//!
//! Two failure modes are kept apart:
//!
//! * [`Error::OutOfMemory`]: the destination has no room for the next
//!   primitive.
//! * [`Error::EncodingOverflow`]: the value has more characters than its
//!   fixed display width, however much room is left.

use core::fmt::Write as _;

use heapless::String;

use crate::error::{Error, Result};

/// Scratch size for one rendered primitive.
const SCRATCH: usize = 32;

pub struct MessageWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> MessageWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.written
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.written]
    }

    pub fn write_literal(&mut self, text: &str) -> Result<()> {
        self.put(text.as_bytes())
    }

    /// Unsigned integer with at most `width` digits.
    pub fn write_uint(&mut self, value: u64, width: usize) -> Result<()> {
        self.render(width, |s| write!(s, "{}", value))
    }

    /// Signed integer with at most `width` characters including the sign.
    pub fn write_int(&mut self, value: i64, width: usize) -> Result<()> {
        self.render(width, |s| write!(s, "{}", value))
    }

    /// Float with two decimals, at most `width` characters including sign
    /// and point.  Non-finite values never fit.
    pub fn write_fixed(&mut self, value: f32, width: usize) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::EncodingOverflow);
        }
        self.render(width, |s| write!(s, "{:.2}", value))
    }

    fn render(&mut self, width: usize, fmt: impl FnOnce(&mut String<SCRATCH>) -> core::fmt::Result) -> Result<()> {
        let mut scratch = String::<SCRATCH>::new();
        fmt(&mut scratch).map_err(|_| Error::EncodingOverflow)?;
        if scratch.len() > width {
            return Err(Error::EncodingOverflow);
        }
        self.put(scratch.as_bytes())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(Error::OutOfMemory);
        }
        self.buf[self.written..self.written + bytes.len()].copy_from_slice(bytes);
        self.written += bytes.len();
        Ok(())
    }
}
