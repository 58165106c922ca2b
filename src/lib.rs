//! Grow box firmware library.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! ESP-IDF binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod pins;
pub mod rpc;
pub mod scheduler;
pub mod sensors;

pub use error::{Error, Result};
