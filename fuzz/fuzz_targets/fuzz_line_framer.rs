//! Fuzz target: `LineFramer::push`
//!
//! Drives arbitrary byte sequences into the serial line framer and asserts
//! that it never panics, never yields an empty or oversized line, and
//! accepts bytes cleanly again after a clear.
//!
//! cargo fuzz run fuzz_line_framer

#![no_main]

use buoypower::rpc::codec::LineFramer;
use buoypower::timing::MAX_LINE_LEN;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut framer = LineFramer::new();

    for &byte in data {
        if framer.push(byte) {
            let line = framer.line();
            assert!(!line.is_empty(), "framer must not yield an empty line");
            assert!(line.len() <= MAX_LINE_LEN, "line exceeds MAX_LINE_LEN");
        }
    }

    framer.clear();
    assert!(!framer.is_complete());
    for &byte in data {
        let _ = framer.push(byte);
    }
});
