//! Power control state machine.
//!
//! Table-driven, in the classic embedded style:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  StateTable                                  │
//! │  ┌─────────────┬────────────────────────┐    │
//! │  │ StateId     │ on_update              │    │
//! │  ├─────────────┼────────────────────────┤    │
//! │  │ PoweredOff  │ fn(&Inputs) -> Decision │    │
//! │  │ PoweredOn   │ fn(&Inputs) -> Decision │    │
//! │  └─────────────┴────────────────────────┘    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The current state is not stored here: it is read from
//! `ControllerState::power.power_state`, because the override button may
//! flip the rail behind the machine's back. Each step looks up the handler
//! for the current state, gets a [`Decision`], and [`PowerFsm::step`]
//! carries it out against the board.
//!
//! The whole machine is gated: while a manual override window is open, or
//! before the one-minute statistics are valid, every step is [`Decision::Stay`].

pub mod context;
pub mod states;

use context::{ControllerState, PowerState};
use log::{info, warn};

use crate::app::ports::{ActuatorPort, Board, ClockPort};
use crate::config::PowerConfig;
use crate::sensors::SampleStats;
use crate::timing::RESET_HOLD_MS;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PowerStateId {
    PoweredOff = 0,
    PoweredOn = 1,
}

impl PowerStateId {
    pub const COUNT: usize = 2;
}

/// Why the rail is being cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffReason {
    /// Mean supply voltage fell below `shutdownVoltage`.
    LowVoltage,
    /// Host snoozed and its current dropped to idle.
    HostShutdown,
    /// Host snoozed and the grace period ran out.
    SnoozeTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Stay,
    PowerOff(OffReason),
    PowerOn,
    /// Host looks wedged: rail off, hold, rail on.
    PowerCycle,
}

/// Everything a state handler may look at. Handlers never mutate.
pub struct Inputs<'a> {
    pub state: &'a ControllerState,
    pub stats: &'a SampleStats,
    pub config: &'a PowerConfig,
    pub now_ms: u32,
}

pub type StateUpdateFn = fn(&Inputs<'_>) -> Decision;

pub struct StateDescriptor {
    pub id: PowerStateId,
    pub name: &'static str,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct PowerFsm {
    /// Indexed by `PowerStateId as usize`.
    table: [StateDescriptor; PowerStateId::COUNT],
}

impl PowerFsm {
    pub fn new() -> Self {
        Self {
            table: states::build_state_table(),
        }
    }

    pub fn state_name(&self, id: PowerStateId) -> &'static str {
        self.table[id as usize].name
    }

    /// Decide what to do this iteration without touching hardware.
    pub fn evaluate(&self, inputs: &Inputs<'_>) -> Decision {
        if inputs.state.power.power_state_override || !inputs.stats.mean_valid {
            return Decision::Stay;
        }
        let descriptor = &self.table[inputs.state.current() as usize];
        debug_assert_eq!(descriptor.id, inputs.state.current());
        (descriptor.on_update)(inputs)
    }

    /// Evaluate and carry out one decision.
    ///
    /// A power cycle blocks for [`RESET_HOLD_MS`] with the rail off.
    pub fn step<B: Board>(
        &self,
        state: &mut ControllerState,
        stats: &SampleStats,
        config: &PowerConfig,
        board: &mut B,
    ) -> Decision {
        let decision = self.evaluate(&Inputs {
            state: &*state,
            stats,
            config,
            now_ms: board.now_ms(),
        });

        match decision {
            Decision::Stay => {}
            Decision::PowerOff(reason) => {
                info!(
                    "power: {} -> {} ({reason:?}, mean {:.2} V / {:.0} mA)",
                    self.state_name(PowerStateId::PoweredOn),
                    self.state_name(PowerStateId::PoweredOff),
                    stats.mean_supply_voltage,
                    stats.mean_rpi_current
                );
                apply_power(&mut state.power, board, false);
            }
            Decision::PowerOn => {
                info!(
                    "power: {} -> {} (mean {:.2} V)",
                    self.state_name(PowerStateId::PoweredOff),
                    self.state_name(PowerStateId::PoweredOn),
                    stats.mean_supply_voltage
                );
                apply_power(&mut state.power, board, true);
            }
            Decision::PowerCycle => {
                warn!(
                    "power: host idle at {:.0} mA without shutdown request, cycling rail",
                    stats.mean_rpi_current
                );
                apply_power(&mut state.power, board, false);
                board.delay_ms(RESET_HOLD_MS);
                apply_power(&mut state.power, board, true);
            }
        }
        decision
    }
}

impl Default for PowerFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive both rails to `on` and restart the time-since-change clock.
pub fn apply_power<B: ActuatorPort + ClockPort + ?Sized>(
    power: &mut PowerState,
    board: &mut B,
    on: bool,
) {
    power.power_state = on;
    board.set_host_power(on);
    board.set_ext_power(on);
    power.power_change_ms = board.now_ms();
}
