#![no_main]
use libfuzzer_sys::fuzz_target;
use pidpanel_core::{Telemetry, decode_line};

fuzz_target!(|data: &str| {
    // Any inbound line either decodes or is rejected; it never panics.
    if let Ok(Some(Telemetry::Rpm(rpm))) = decode_line(data) {
        // A decoded sample must render back to something that decodes the same.
        assert_eq!(decode_line(&format!("RPM:{rpm}")), Ok(Some(Telemetry::Rpm(rpm))));
    }
});
