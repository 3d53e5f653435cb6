//! Controller state threaded through every subsystem step.
//!
//! `ControllerState` is the one owned struct that the override input, the
//! alarm scheduler, the power state machine and the protocol handlers read
//! from and write to. Nothing in the crate keeps module-level mutable state;
//! the main loop owns one of these and lends it out by `&mut`.

use super::PowerStateId;

// ---------------------------------------------------------------------------
// Power rail state (written by the state machine and the override input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerState {
    /// Ground truth of the host rail. The external rail follows it.
    pub power_state: bool,
    /// A manual toggle is inside its suppression window.
    pub power_state_override: bool,
    /// Host intent. Cleared by `snooze`, set again by the wake alarm.
    pub requested_power_state: bool,
    /// Monotonic time of the last rail change.
    pub power_change_ms: u32,
    /// Monotonic time of the last honoured button press, until the window
    /// it opened has expired.
    pub override_time_ms: Option<u32>,
}

impl Default for PowerState {
    fn default() -> Self {
        Self {
            power_state: false,
            power_state_override: false,
            requested_power_state: true,
            power_change_ms: 0,
            override_time_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Alarm state (written by the RTC scheduler)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmState {
    /// Day alarm armed and its interrupt line attached.
    pub alarm_set: bool,
    /// Alarm fired and has not yet been handled by the main loop.
    pub got_alarm: bool,
    /// Wall-clock time at the last `snooze` call.
    pub snooze_unixtime: u32,
    /// Monotonic time at the last `snooze` call.
    pub snooze_start_ms: u32,
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub power: PowerState,
    pub alarm: AlarmState,
}

impl ControllerState {
    /// Cold-boot state: rail off, host wanted on.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> PowerStateId {
        if self.power.power_state {
            PowerStateId::PoweredOn
        } else {
            PowerStateId::PoweredOff
        }
    }
}
