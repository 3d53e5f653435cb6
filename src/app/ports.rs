//! Port traits: the hexagonal boundary between control logic and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (ADC, rails, RTC, EEPROM, serial) implement these traits.
//! The [`Controller`](super::service::Controller) consumes them via generics,
//! so the control loop never touches registers directly and the whole
//! pipeline runs on the host against mocks.

use embedded_hal::delay::DelayNs;

use crate::config::PowerConfig;
use crate::error::{RtcError, StorageError};

// ───────────────────────────────────────────────────────────────
// Sensor port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the sampling engine calls this once per sample period.
pub trait SensorPort {
    /// Battery/solar supply voltage in volts.
    fn read_supply_voltage(&mut self) -> f32;

    /// Host current draw in milliamps.
    fn read_rpi_current(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: rails and the status indicator.
pub trait ActuatorPort {
    /// Switch the host's power rail.
    fn set_host_power(&mut self, on: bool);

    /// Switch the auxiliary external-power rail (follows the host rail).
    fn set_ext_power(&mut self, on: bool);

    /// Status LED, lit while a command is being processed.
    fn set_led(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond counter. Wraps at `u32::MAX`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

/// Everything the control loop needs from the board in one bound.
pub trait Board: SensorPort + ActuatorPort + ClockPort + DelayNs {}

impl<T: SensorPort + ActuatorPort + ClockPort + DelayNs> Board for T {}

// ───────────────────────────────────────────────────────────────
// RTC port
// ───────────────────────────────────────────────────────────────

/// Battery-backed real-time clock with a single hour:minute day alarm.
pub trait RtcDevice {
    /// Put the oscillator in running mode.
    fn init(&mut self) -> Result<(), RtcError>;

    /// Seconds since the Unix epoch.
    fn unixtime(&mut self) -> Result<u32, RtcError>;

    /// Set the wall clock.
    fn set_unixtime(&mut self, unixtime: u32) -> Result<(), RtcError>;

    /// Backup battery below the RTC's detection threshold.
    fn battery_low(&mut self) -> Result<bool, RtcError>;

    /// Oscillator running and time valid.
    fn is_running(&mut self) -> Result<bool, RtcError>;

    /// Arm the day alarm to match `hour:minute` and enable its interrupt.
    fn set_day_alarm(&mut self, hour: u8, minute: u8) -> Result<(), RtcError>;

    /// Disarm the alarm, clear its flag, and disable its interrupt.
    fn disable_alarm(&mut self) -> Result<(), RtcError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ EEPROM)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile memory.
pub trait StoragePort {
    /// Fill `buf` from `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` at `offset`. Implementations commit before returning.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the controller configuration.
///
/// `load` never fails outright: a corrupt record is replaced by defaults,
/// which are persisted before being returned.
pub trait ConfigPort {
    fn load(&mut self) -> PowerConfig;

    /// Persist `config`. Callers validate first.
    fn save(&mut self, config: &PowerConfig) -> Result<(), StorageError>;

    /// Persist and return the hardcoded defaults.
    fn reset(&mut self) -> Result<PowerConfig, StorageError> {
        let defaults = PowerConfig::default();
        self.save(&defaults)?;
        Ok(defaults)
    }
}

// ───────────────────────────────────────────────────────────────
// Serial port
// ───────────────────────────────────────────────────────────────

/// Line-oriented serial link to the host.
pub trait SerialPort {
    /// Next inbound byte, if one is waiting.
    fn read_byte(&mut self) -> Option<u8>;

    /// Send one response line. The adapter appends the terminator.
    fn write_line(&mut self, line: &str);
}
