#![no_main]
use libfuzzer_sys::fuzz_target;
use pidpanel_hardware::LineFramer;

fuzz_target!(|chunks: Vec<Vec<u8>>| {
    let mut framer = LineFramer::new();
    for chunk in &chunks {
        framer.push(chunk);
        while let Some(line) = framer.next_line() {
            assert!(!line.contains('\n'));
        }
    }
});
