//! Controller configuration parameters.
//!
//! The persisted, operator-tunable thresholds for the power control loop.
//! Loaded once at boot by the [`ConfigStore`](crate::adapters::eeprom::ConfigStore)
//! and changed only through `setconfig` / `defaultconfig`.

use core::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Valid band for both voltage thresholds (V), upper bound exclusive.
pub const VOLTAGE_RANGE: core::ops::Range<f32> = 12.0..14.0;
/// Valid band for the idle-current threshold (mA).
pub const RPI_CURRENT_RANGE: core::ops::RangeInclusive<f32> = 50.0..=800.0;
/// Valid band for the snooze grace period (s).
pub const SNOOZE_TIMEOUT_RANGE: core::ops::RangeInclusive<u32> = 90..=600;

/// Persisted power-control configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerConfig {
    /// Mean supply voltage (V) below which host power is cut.
    pub shutdown_voltage: f32,
    /// Mean supply voltage (V) at or above which host power is granted.
    pub startup_voltage: f32,
    /// Mean host current (mA) below which the host is considered idle.
    pub shutdown_rpi_current: f32,
    /// Shutdown grace after a snooze, and minimum spacing between
    /// stuck-host power cycles (s).
    pub snooze_timeout: u32,
    /// Whether the manual button may toggle power.
    pub override_enabled: bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            shutdown_voltage: 12.8,
            startup_voltage: 13.0,
            shutdown_rpi_current: 100.0,
            snooze_timeout: 120,
            override_enabled: true,
        }
    }
}

impl PowerConfig {
    /// Range-check every field, reporting the first violation in
    /// declaration order.
    pub fn validate(&self) -> Result<()> {
        if !VOLTAGE_RANGE.contains(&self.shutdown_voltage) {
            return Err(Error::InvalidShutdownVoltage);
        }
        if !VOLTAGE_RANGE.contains(&self.startup_voltage) {
            return Err(Error::InvalidStartupVoltage);
        }
        if self.startup_voltage <= self.shutdown_voltage {
            return Err(Error::StartupNotAboveShutdown);
        }
        if !RPI_CURRENT_RANGE.contains(&self.shutdown_rpi_current) {
            return Err(Error::InvalidShutdownRpiCurrent);
        }
        if !SNOOZE_TIMEOUT_RANGE.contains(&self.snooze_timeout) {
            return Err(Error::InvalidSnoozeTimeout);
        }
        Ok(())
    }

    /// Snooze grace period in milliseconds.
    pub fn snooze_timeout_ms(&self) -> u32 {
        self.snooze_timeout.saturating_mul(1000)
    }

    /// Merge a partial update over `self` and validate the result.
    ///
    /// Absent or zero numeric fields keep the current value. Nothing is
    /// applied unless the merged configuration is valid.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self> {
        fn pick_f32(new: Option<f32>, old: f32) -> f32 {
            match new {
                Some(v) if v != 0.0 => v,
                _ => old,
            }
        }

        let candidate = Self {
            shutdown_voltage: pick_f32(update.shutdown_voltage, self.shutdown_voltage),
            startup_voltage: pick_f32(update.startup_voltage, self.startup_voltage),
            shutdown_rpi_current: pick_f32(update.shutdown_rpi_current, self.shutdown_rpi_current),
            snooze_timeout: match update.snooze_timeout {
                Some(v) if v != 0 => v,
                _ => self.snooze_timeout,
            },
            override_enabled: update.override_enabled.unwrap_or(self.override_enabled),
        };
        candidate.validate()?;
        Ok(candidate)
    }
}

/// Partial configuration carried by a `setconfig` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub shutdown_voltage: Option<f32>,
    pub startup_voltage: Option<f32>,
    pub shutdown_rpi_current: Option<f32>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub snooze_timeout: Option<u32>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub override_enabled: Option<bool>,
}

impl ConfigUpdate {
    /// Pull the configuration fields out of a request object. Other keys
    /// (such as `command`) are ignored.
    pub fn from_json(args: &serde_json::Value) -> core::result::Result<Self, String> {
        Self::deserialize(args).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

/// Accepts `true` / `false` or the integers `0` / `1`. Host tools send the
/// override flag as an integer.
fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<Option<bool>, D::Error> {
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or 0/1")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> core::result::Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> core::result::Result<Self::Value, E> {
            match v {
                0 => Ok(Some(false)),
                1 => Ok(Some(true)),
                _ => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> core::result::Result<Self::Value, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
            }
        }

        fn visit_unit<E: de::Error>(self) -> core::result::Result<Self::Value, E> {
            Ok(None)
        }
    }

    d.deserialize_any(FlagVisitor)
}

/// Accepts a non-negative integer, or a float with no fractional part
/// (`120.0`), that fits in `u32`.
fn lenient_seconds<'de, D: Deserializer<'de>>(d: D) -> core::result::Result<Option<u32>, D::Error> {
    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = Option<u32>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a whole number of seconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> core::result::Result<Self::Value, E> {
            u32::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> core::result::Result<Self::Value, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
            }
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> core::result::Result<Self::Value, E> {
            if v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) {
                Ok(Some(v as u32))
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_unit<E: de::Error>(self) -> core::result::Result<Self::Value, E> {
            Ok(None)
        }
    }

    d.deserialize_any(SecondsVisitor)
}
