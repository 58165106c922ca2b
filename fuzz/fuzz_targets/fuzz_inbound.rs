//! Fuzz target: `inbound::apply`
//!
//! Feeds arbitrary bytes to the configuration decoder.  It must never
//! panic, and whatever prefix it applied must leave a configuration that
//! still validates.
//!
//! cargo fuzz run fuzz_inbound

#![no_main]

use growbox::config::SystemConfig;
use growbox::rpc::{InboundReport, inbound};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut config = SystemConfig::default();
    let mut report = InboundReport::default();
    let result = inbound::apply(data, &mut config, &mut report);

    assert!(config.validate().is_ok(), "decoder left an invalid config");
    if result.is_ok() {
        assert!(report.applied as usize + report.skipped as usize <= data.len());
    }
});
