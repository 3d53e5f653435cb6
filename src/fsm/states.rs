//! State handlers and table builder.
//!
//! ```text
//!              [mean V >= startupV && requested]
//!  POWERED_OFF ─────────────────────────────────▶ POWERED_ON
//!       ▲                                            │  │
//!       │  [mean V < shutdownV]                      │  │ [idle, requested,
//!       │  [snoozed && (idle || grace expired)]      │  │  no change for
//!       └────────────────────────────────────────────┘  │  snoozeTimeout]
//!                                                       ▼
//!                                               cycle: off, 3 s, on
//! ```

use super::{Decision, Inputs, OffReason, PowerStateId, StateDescriptor};
use crate::timing::elapsed_ms;

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; PowerStateId::COUNT] {
    [
        // Index 0
        StateDescriptor {
            id: PowerStateId::PoweredOff,
            name: "POWERED_OFF",
            on_update: powered_off_update,
        },
        // Index 1
        StateDescriptor {
            id: PowerStateId::PoweredOn,
            name: "POWERED_ON",
            on_update: powered_on_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  POWERED_OFF
// ═══════════════════════════════════════════════════════════════════════════

fn powered_off_update(inputs: &Inputs<'_>) -> Decision {
    if inputs.stats.mean_supply_voltage >= inputs.config.startup_voltage
        && inputs.state.power.requested_power_state
    {
        return Decision::PowerOn;
    }
    Decision::Stay
}

// ═══════════════════════════════════════════════════════════════════════════
//  POWERED_ON
// ═══════════════════════════════════════════════════════════════════════════

fn powered_on_update(inputs: &Inputs<'_>) -> Decision {
    let Inputs {
        state,
        stats,
        config,
        now_ms,
    } = *inputs;

    // Battery protection comes before any host-intent logic.
    if stats.mean_supply_voltage < config.shutdown_voltage {
        return Decision::PowerOff(OffReason::LowVoltage);
    }

    let host_idle = stats.mean_rpi_current < config.shutdown_rpi_current;
    let timeout_ms = config.snooze_timeout_ms();

    if state.power.requested_power_state {
        if host_idle && elapsed_ms(now_ms, state.power.power_change_ms) >= timeout_ms {
            return Decision::PowerCycle;
        }
    } else if host_idle {
        return Decision::PowerOff(OffReason::HostShutdown);
    } else if elapsed_ms(now_ms, state.alarm.snooze_start_ms) > timeout_ms {
        return Decision::PowerOff(OffReason::SnoozeTimeout);
    }

    Decision::Stay
}
