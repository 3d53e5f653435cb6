//! Fuzz target: framer → `handle_line`
//!
//! Splits arbitrary bytes into lines and runs each through the command
//! dispatcher against simulated peripherals. Every response must be a JSON
//! object within the outbound capacity.
//!
//! cargo fuzz run fuzz_dispatcher

#![no_main]

use buoypower::adapters::eeprom::{ConfigStore, MemEeprom};
use buoypower::adapters::sim::SimRtc;
use buoypower::config::PowerConfig;
use buoypower::events::AlarmLine;
use buoypower::fsm::context::ControllerState;
use buoypower::rpc::codec::LineFramer;
use buoypower::rpc::engine::{CommandContext, handle_line};
use buoypower::rtc::AlarmScheduler;
use buoypower::sensors::SampleStats;
use buoypower::timing::MAX_RESPONSE_LEN;
use libfuzzer_sys::fuzz_target;

// 2024-06-15 12:34:56 UTC
const START_UNIXTIME: u32 = 1_718_454_896;

fuzz_target!(|data: &[u8]| {
    let line = AlarmLine::new();
    let mut scheduler = AlarmScheduler::new(SimRtc::at(START_UNIXTIME), &line);
    let mut store = ConfigStore::new(MemEeprom::new());
    let mut state = ControllerState::new();
    let mut config = PowerConfig::default();
    let stats = SampleStats::default();
    let mut framer = LineFramer::new();

    for &byte in data {
        if !framer.push(byte) {
            continue;
        }
        let mut ctx = CommandContext {
            state: &mut state,
            stats: &stats,
            config: &mut config,
            store: &mut store,
            scheduler: &mut scheduler,
            now_ms: 0,
        };
        let response = handle_line(framer.line(), &mut ctx);
        assert!(response.len() <= MAX_RESPONSE_LEN, "response exceeds capacity");
        assert!(
            serde_json::from_str::<serde_json::Value>(&response).is_ok(),
            "response is not JSON"
        );
        framer.clear();
    }

    assert!(config.validate().is_ok(), "dispatcher accepted an invalid config");
});
