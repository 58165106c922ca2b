//! Unified error type for the growbox firmware.
//!
//! A single `Error` enum that every subsystem returns, keeping the task
//! loops' error handling uniform.  All variants are `Copy` so they can be
//! passed through the pipeline, logged and counted without allocation.
//!
//! Nothing here is fatal: arena, ring and codec errors return to the
//! immediate caller, which logs and carries on with its loop.

use core::fmt;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument was empty, zero or otherwise unusable.
    InvalidArgument,
    /// A fixed-capacity pool (arena slot, queue slot) is full.
    ResourceExhausted,
    /// A handle does not name a slot of the pool it was passed to.
    InvalidReference,
    /// An inbound wire value could not be parsed.
    MalformedData,
    /// A well-formed request violates policy (zero denominator, range).
    InvalidRequest,
    /// The payload type does not match what the operation handles.
    UnsupportedType,
    /// A blocking operation ran out of time.
    Timeout,
    /// The destination buffer is too small for the next write.
    OutOfMemory,
    /// A value has more digits than its fixed display width allows.
    EncodingOverflow,
    /// A sensor read failed at the bus level.
    SensorFail,
    /// An actuator output could not be driven.
    ActuatorFail,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::ResourceExhausted => write!(f, "resource exhausted"),
            Self::InvalidReference => write!(f, "invalid reference"),
            Self::MalformedData => write!(f, "malformed data"),
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::UnsupportedType => write!(f, "unsupported type"),
            Self::Timeout => write!(f, "timed out"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::EncodingOverflow => write!(f, "encoding overflow"),
            Self::SensorFail => write!(f, "sensor failure"),
            Self::ActuatorFail => write!(f, "actuator output failed"),
        }
    }
}

impl core::error::Error for Error {}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
