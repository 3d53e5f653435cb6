//! Manual power override button.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up. The GPIO fires on the falling
//! edge and the ISR stores the press time in the [`ButtonLine`]; contact
//! bounce within one loop iteration collapses to the latest timestamp.
//!
//! ## Behaviour
//!
//! | Condition                                  | Effect                           |
//! |--------------------------------------------|----------------------------------|
//! | Press, `overrideEnabled`                   | Toggle rail, request = new state |
//! | Press, override disabled                   | Ignored                          |
//! | < `OVERRIDE_INTERVAL_MS` since last toggle | `powerStateOverride = true`      |
//!
//! While the override flag is set the power state machine does nothing.

use log::info;

use crate::app::ports::{ActuatorPort, ClockPort};
use crate::config::PowerConfig;
use crate::events::ButtonLine;
use crate::fsm::apply_power;
use crate::fsm::context::PowerState;
use crate::timing::{OVERRIDE_INTERVAL_MS, elapsed_ms};

pub struct OverrideInput<'a> {
    line: &'a ButtonLine,
}

impl<'a> OverrideInput<'a> {
    pub fn new(line: &'a ButtonLine) -> Self {
        Self { line }
    }

    /// Call once per main-loop iteration.
    ///
    /// Returns `true` if a press toggled the rail this call.
    pub fn poll<B: ActuatorPort + ClockPort + ?Sized>(
        &mut self,
        power: &mut PowerState,
        config: &PowerConfig,
        board: &mut B,
    ) -> bool {
        let mut toggled = false;

        if let Some(pressed_at) = self.line.take_press() {
            if config.override_enabled {
                let on = !power.power_state;
                power.requested_power_state = on;
                apply_power(power, board, on);
                power.override_time_ms = Some(pressed_at);
                toggled = true;
                info!("override: button toggled power {}", if on { "on" } else { "off" });
            } else {
                info!("override: button ignored, override disabled");
            }
        }

        let now = board.now_ms();
        power.power_state_override = match power.override_time_ms {
            Some(t) if elapsed_ms(now, t) < OVERRIDE_INTERVAL_MS => true,
            Some(_) => {
                power.override_time_ms = None;
                info!("override: window expired, automatic control resumed");
                false
            }
            None => false,
        };

        toggled
    }
}
