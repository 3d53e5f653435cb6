//! Controller service: the hexagonal core.
//!
//! [`Controller`] owns the controller state, the sampling engine, the power
//! state machine and the protocol framer, plus the injected board, RTC and
//! configuration store. One [`tick`](Controller::tick) is one main-loop
//! iteration and runs the subsystems in a fixed order:
//!
//! ```text
//!  1. serial bytes ──▶ framer ──▶ dispatcher ──▶ response line
//!  2. alarm line   ──▶ wake: request power, disarm, announce
//!  3. sample timer ──▶ SampleEngine::poll_sample
//!  4. button line  ──▶ OverrideInput::poll
//!  5. PowerFsm::step
//! ```
//!
//! Nothing in here blocks except the stuck-host power cycle inside step 5.

use log::{info, warn};
use serde_json::Value;

use crate::config::PowerConfig;
use crate::drivers::button::OverrideInput;
use crate::events::Interrupts;
use crate::fsm::context::ControllerState;
use crate::fsm::{Decision, PowerFsm, apply_power};
use crate::rpc::codec::LineFramer;
use crate::rpc::engine::{Command, CommandContext, handle_line, run_command};
use crate::rpc::messages::FIRMWARE_VERSION;
use crate::rtc::AlarmScheduler;
use crate::sensors::{SampleEngine, SampleStats};
use crate::timing::{SAMPLE_INTERVAL_MS, has_elapsed};

use super::ports::{Board, ConfigPort, RtcDevice, SerialPort};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<'a, B, R, C> {
    board: B,
    scheduler: AlarmScheduler<'a, R>,
    store: C,
    override_input: OverrideInput<'a>,
    fsm: PowerFsm,
    sampler: SampleEngine,
    framer: LineFramer,
    state: ControllerState,
    config: PowerConfig,
    last_sample_ms: u32,
}

impl<'a, B: Board, R: RtcDevice, C: ConfigPort> Controller<'a, B, R, C> {
    /// Wire the controller to its board and interrupt lines.
    ///
    /// Does not touch hardware; call [`boot`](Self::boot) next.
    pub fn new(board: B, rtc: R, store: C, irqs: &'a Interrupts) -> Self {
        Self {
            board,
            scheduler: AlarmScheduler::new(rtc, &irqs.alarm),
            store,
            override_input: OverrideInput::new(&irqs.button),
            fsm: PowerFsm::new(),
            sampler: SampleEngine::new(),
            framer: LineFramer::new(),
            state: ControllerState::new(),
            config: PowerConfig::default(),
            last_sample_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Cold boot: load configuration, bring up the RTC, start with the rail
    /// off, and announce configuration then sensors.
    pub fn boot(&mut self, serial: &mut impl SerialPort) {
        info!("controller: boot, firmware {FIRMWARE_VERSION}");
        self.config = self.store.load();

        if let Err(e) = self.scheduler.init_rtc(&mut self.state.alarm) {
            warn!("controller: rtc unavailable at boot: {e}");
        }

        apply_power(&mut self.state.power, &mut self.board, false);
        self.board.set_led(false);
        self.last_sample_ms = self.board.now_ms();
        self.announce(serial);
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One main-loop iteration. Returns what the state machine decided.
    pub fn tick(&mut self, serial: &mut impl SerialPort) -> Decision {
        // 1. Inbound serial
        while let Some(byte) = serial.read_byte() {
            if self.framer.push(byte) {
                self.dispatch_line(serial);
            }
        }

        // 2. Wake alarm
        if self.scheduler.take_alarm(&mut self.state.alarm) {
            info!("controller: wake alarm, requesting host power");
            self.state.power.requested_power_state = true;
            if let Err(e) = self.scheduler.disable_alarm(&mut self.state.alarm) {
                warn!("controller: could not disarm alarm: {e}");
            }
            self.announce(serial);
        }

        // 3. Sampling
        let now = self.board.now_ms();
        if has_elapsed(now, self.last_sample_ms, SAMPLE_INTERVAL_MS) {
            self.last_sample_ms = now;
            self.sampler.poll_sample(&mut self.board);
        }

        // 4. Override button
        self.override_input
            .poll(&mut self.state.power, &self.config, &mut self.board);

        // 5. Power state machine
        self.fsm.step(
            &mut self.state,
            self.sampler.stats(),
            &self.config,
            &mut self.board,
        )
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SampleStats {
        self.sampler.stats()
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn rtc_mut(&mut self) -> &mut R {
        self.scheduler.rtc_mut()
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    // ── Internal ──────────────────────────────────────────────

    /// Handle the buffered line with the indicator lit, then clear it.
    fn dispatch_line(&mut self, serial: &mut impl SerialPort) {
        self.board.set_led(true);
        let mut ctx = CommandContext {
            state: &mut self.state,
            stats: self.sampler.stats(),
            config: &mut self.config,
            store: &mut self.store,
            scheduler: &mut self.scheduler,
            now_ms: self.board.now_ms(),
        };
        let response = handle_line(self.framer.line(), &mut ctx);
        serial.write_line(&response);
        self.framer.clear();
        self.board.set_led(false);
    }

    /// Boot-style status dump: `getconfig`, then `sensors`.
    fn announce(&mut self, serial: &mut impl SerialPort) {
        for cmd in [Command::GetConfig, Command::Sensors] {
            let mut ctx = CommandContext {
                state: &mut self.state,
                stats: self.sampler.stats(),
                config: &mut self.config,
                store: &mut self.store,
                scheduler: &mut self.scheduler,
                now_ms: self.board.now_ms(),
            };
            let response = run_command(cmd, &Value::Null, &mut ctx);
            serial.write_line(&response);
        }
    }
}
