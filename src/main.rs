//! Buoy power controller: host simulator entry point.
//!
//! Runs the real controller core against simulated peripherals. Protocol
//! lines go in on stdin and responses come out on stdout; logs go to stderr.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter<SimPin, SimAdc>   SimRtc        StdioSerial   │
//! │  (Sensor+Actuator+Clock+Delay)     (RtcDevice)   (SerialPort)  │
//! │  ConfigStore<MemEeprom>                                        │
//! │  (ConfigPort)                                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Sampling · Power FSM · Alarm · Override · Protocol    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines starting with `!` drive the simulation instead of the protocol:
//! `!button`, `!supply <volts>`, `!current <milliamps>`.
//!
//! Environment: `BUOY_SIM_SUPPLY_V`, `BUOY_SIM_CURRENT_MA` set the initial
//! analog inputs, `BUOY_SIM_LOOP_MS` the main-loop period.

#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use buoypower::adapters::eeprom::{ConfigStore, MemEeprom};
use buoypower::adapters::hardware::{HardwareAdapter, Pins};
use buoypower::adapters::sim::{Directive, SimAdc, SimPin, SimRtc, StdioSerial};
use buoypower::adapters::time::{MonotonicClock, StdDelay};
use buoypower::app::ports::ClockPort;
use buoypower::app::service::Controller;
use buoypower::events::Interrupts;
use buoypower::sensors::supply::{AnalogChannel, CURRENT_SCALE, SUPPLY_SCALE};

static IRQS: Interrupts = Interrupts::new();

type SimBoard = HardwareAdapter<SimPin, SimPin, SimPin, SimAdc, StdDelay, MonotonicClock>;

const DEFAULT_SUPPLY_V: f32 = 13.0;
const DEFAULT_CURRENT_MA: f32 = 400.0;
const DEFAULT_LOOP_MS: u64 = 10;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name}={raw:?} is not a valid value")),
        Err(_) => Ok(default),
    }
}

fn set_supply(board: &mut SimBoard, volts: f32) {
    let counts = SUPPLY_SCALE.counts_for(volts);
    board.adc_mut().set_raw(AnalogChannel::SupplyVoltage, counts);
}

fn set_current(board: &mut SimBoard, milliamps: f32) {
    let counts = CURRENT_SCALE.counts_for(milliamps);
    board.adc_mut().set_raw(AnalogChannel::RpiCurrent, counts);
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("buoypower-sim v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Simulation parameters ──────────────────────────────
    let supply_v = env_or("BUOY_SIM_SUPPLY_V", DEFAULT_SUPPLY_V)?;
    let current_ma = env_or("BUOY_SIM_CURRENT_MA", DEFAULT_CURRENT_MA)?;
    let loop_ms = env_or("BUOY_SIM_LOOP_MS", DEFAULT_LOOP_MS)?;

    // ── 3. Construct adapters ─────────────────────────────────
    let pins = Pins {
        host_power: SimPin::new(),
        ext_power: SimPin::new(),
        led: SimPin::new(),
    };
    let mut board: SimBoard =
        HardwareAdapter::new(pins, SimAdc::new(), StdDelay, MonotonicClock::new());
    set_supply(&mut board, supply_v);
    set_current(&mut board, current_ma);

    let store = ConfigStore::new(MemEeprom::new());
    let mut serial = StdioSerial::spawn();

    // ── 4. Boot ───────────────────────────────────────────────
    let mut controller = Controller::new(board, SimRtc::new(), store, &IRQS);
    controller.boot(&mut serial);
    info!("System ready. Entering main loop.");

    // ── 5. Main loop ──────────────────────────────────────────
    let period = Duration::from_millis(loop_ms);
    loop {
        while let Some(directive) = serial.take_directive() {
            match directive {
                Directive::Button => {
                    let now = controller.board().now_ms();
                    IRQS.button.on_falling_edge(now);
                }
                Directive::Supply(v) => set_supply(controller.board_mut(), v),
                Directive::Current(ma) => set_current(controller.board_mut(), ma),
            }
        }

        controller.rtc_mut().tick(&IRQS.alarm);
        controller.tick(&mut serial);

        if serial.is_closed() {
            info!("stdin closed, exiting");
            return Ok(());
        }
        std::thread::sleep(period);
    }
}
