//! Fuzz target: `decode_record`
//!
//! Feeds arbitrary bytes through the EEPROM record decoder. A record either
//! fails its checks or decodes to values that encode back to the same bytes.
//!
//! cargo fuzz run fuzz_config_record

#![no_main]

use buoypower::adapters::eeprom::{RECORD_LEN, decode_record, encode_record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(raw) = data.get(..RECORD_LEN) else {
        return;
    };
    let Ok(raw): Result<[u8; RECORD_LEN], _> = raw.try_into() else {
        return;
    };

    if let Ok(config) = decode_record(&raw) {
        // Byte comparison: NaN fields never compare equal.
        assert_eq!(encode_record(&config), raw, "decoded record must re-encode identically");
    }
});
