//! Wire shapes of protocol responses.
//!
//! Every response is one [`Envelope`]: the command echo, an error string
//! (empty on success), the command-specific [`Body`] fields flattened in,
//! then `uptimems` and `version`.
//!
//! ```text
//! {"command":"getconfig","error":"","shutdownVoltage":12.8,...,"uptimems":5021,"version":"0.3.0"}
//! ```

use serde::Serialize;

use crate::config::PowerConfig;
use crate::fsm::context::{AlarmState, PowerState};
use crate::rtc::{SnoozeInfo, TimeInfo};
use crate::sensors::SampleStats;

/// Firmware version reported in every response.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command echo used when the request named no known command.
pub const UNKNOWN_COMMAND: &str = "unknown";

#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    /// Absent when the request line was not valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<&'a str>,
    pub error: &'a str,
    #[serde(flatten)]
    pub body: Option<Body>,
    pub uptimems: u32,
    pub version: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    Sensors(SensorsBody),
    Time(TimeBody),
    Config(PowerConfig),
    Snooze(SnoozeBody),
    LastSnooze(LastSnoozeBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsBody {
    pub supply_voltage: f32,
    pub rpi_current: f32,
    #[serde(rename = "mean1mSupplyVoltage")]
    pub mean_supply_voltage: f32,
    #[serde(rename = "mean1mRpiCurrent")]
    pub mean_rpi_current: f32,
    #[serde(rename = "min1mSupplyVoltage")]
    pub min_supply_voltage: f32,
    #[serde(rename = "min1mRpiCurrent")]
    pub min_rpi_current: f32,
    #[serde(rename = "max1mSupplyVoltage")]
    pub max_supply_voltage: f32,
    #[serde(rename = "max1mRpiCurrent")]
    pub max_rpi_current: f32,
    pub mean_valid: bool,
    pub power_state: bool,
    pub power_state_override: bool,
    pub requested_power_state: bool,
}

impl SensorsBody {
    pub fn new(stats: &SampleStats, power: &PowerState) -> Self {
        Self {
            supply_voltage: stats.supply_voltage,
            rpi_current: stats.rpi_current,
            mean_supply_voltage: stats.mean_supply_voltage,
            mean_rpi_current: stats.mean_rpi_current,
            min_supply_voltage: stats.min_supply_voltage,
            min_rpi_current: stats.min_rpi_current,
            max_supply_voltage: stats.max_supply_voltage,
            max_rpi_current: stats.max_rpi_current,
            mean_valid: stats.mean_valid,
            power_state: power.power_state,
            power_state_override: power.power_state_override,
            requested_power_state: power.requested_power_state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBody {
    pub unixtime: u32,
    pub rtc_battery_low: bool,
    pub rtc_running: bool,
}

impl From<TimeInfo> for TimeBody {
    fn from(t: TimeInfo) -> Self {
        Self {
            unixtime: t.unixtime,
            rtc_battery_low: t.rtc_battery_low,
            rtc_running: t.rtc_running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeBody {
    pub duration: u32,
    pub alarm_hour: u8,
    pub alarm_minute: u8,
    pub alarm_unixtime: u32,
    pub unixtime: u32,
}

impl From<SnoozeInfo> for SnoozeBody {
    fn from(s: SnoozeInfo) -> Self {
        Self {
            duration: s.duration,
            alarm_hour: s.alarm_hour,
            alarm_minute: s.alarm_minute,
            alarm_unixtime: s.alarm_unixtime,
            unixtime: s.unixtime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSnoozeBody {
    pub snooze_unixtime: u32,
    pub snooze_start_time: u32,
    pub alarm_set: bool,
}

impl From<&AlarmState> for LastSnoozeBody {
    fn from(a: &AlarmState) -> Self {
        Self {
            snooze_unixtime: a.snooze_unixtime,
            snooze_start_time: a.snooze_start_ms,
            alarm_set: a.alarm_set,
        }
    }
}
