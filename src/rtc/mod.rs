//! Wall clock and wake-alarm scheduling.
//!
//! [`AlarmScheduler`] pairs an [`RtcDevice`] with the [`AlarmLine`] its
//! interrupt output is wired to. Arming the alarm attaches the line,
//! disarming detaches it, and the main loop asks [`AlarmScheduler::take_alarm`]
//! once per iteration whether the wake edge arrived.
//!
//! The RTC only matches hour and minute, so a snooze can never be longer
//! than one day minus a margin; see [`MAX_SNOOZE_MINUTES`].

pub mod pcf8523;

use log::{debug, info, warn};
use time::OffsetDateTime;

use crate::app::ports::RtcDevice;
use crate::error::{Error, Result, RtcError};
use crate::events::AlarmLine;
use crate::fsm::context::{AlarmState, ControllerState};
use crate::timing::{MAX_SNOOZE_MINUTES, MIN_SNOOZE_MINUTES};

/// Reply to a successful `snooze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoozeInfo {
    pub duration: u32,
    pub alarm_hour: u8,
    pub alarm_minute: u8,
    pub alarm_unixtime: u32,
    /// Wall-clock time when the snooze was accepted.
    pub unixtime: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInfo {
    pub unixtime: u32,
    pub rtc_battery_low: bool,
    pub rtc_running: bool,
}

/// UTC hour and minute of `unixtime`.
pub fn hour_minute(unixtime: u32) -> core::result::Result<(u8, u8), RtcError> {
    let dt = OffsetDateTime::from_unix_timestamp(i64::from(unixtime))
        .map_err(|_| RtcError::InvalidTime)?;
    Ok((dt.hour(), dt.minute()))
}

pub struct AlarmScheduler<'a, R> {
    rtc: R,
    line: &'a AlarmLine,
}

impl<'a, R: RtcDevice> AlarmScheduler<'a, R> {
    pub fn new(rtc: R, line: &'a AlarmLine) -> Self {
        Self { rtc, line }
    }

    pub fn rtc(&self) -> &R {
        &self.rtc
    }

    pub fn rtc_mut(&mut self) -> &mut R {
        &mut self.rtc
    }

    /// Start the oscillator and leave the alarm cleanly disarmed.
    ///
    /// The part raises its alarm flag right after power-up, so a throwaway
    /// alarm is armed one minute out and disarmed again to discharge it.
    pub fn init_rtc(&mut self, alarm: &mut AlarmState) -> Result<()> {
        self.rtc.init().map_err(|e| {
            warn!("rtc: init failed: {e}");
            Error::from(e)
        })?;

        let (hour, minute) = self
            .rtc
            .unixtime()
            .and_then(|now| hour_minute(now.saturating_add(60)))
            .unwrap_or((0, 0));
        self.rtc.set_day_alarm(hour, minute)?;
        self.disable_alarm(alarm)?;
        debug!("rtc: initialised, alarm disarmed");
        Ok(())
    }

    /// Arm the day alarm for `hour:minute` and start listening for it.
    pub fn enable_alarm(&mut self, hour: u8, minute: u8, alarm: &mut AlarmState) -> Result<()> {
        self.rtc.set_day_alarm(hour, minute)?;
        self.line.attach();
        alarm.alarm_set = true;
        alarm.got_alarm = false;
        info!("rtc: alarm armed for {hour:02}:{minute:02} UTC");
        Ok(())
    }

    /// Stop listening and disarm. The flags are cleared even if the RTC
    /// does not answer.
    pub fn disable_alarm(&mut self, alarm: &mut AlarmState) -> Result<()> {
        self.line.detach();
        let was_set = alarm.alarm_set;
        alarm.alarm_set = false;
        alarm.got_alarm = false;
        self.rtc.disable_alarm()?;
        if was_set {
            info!("rtc: alarm disarmed");
        }
        Ok(())
    }

    /// Latch a pending alarm edge into `got_alarm` and report it.
    pub fn take_alarm(&mut self, alarm: &mut AlarmState) -> bool {
        if self.line.take() {
            info!("rtc: wake alarm fired");
            alarm.got_alarm = true;
        }
        alarm.got_alarm
    }

    /// Schedule a wake-up `minutes` from now and withdraw the power request.
    pub fn snooze(
        &mut self,
        minutes: u32,
        state: &mut ControllerState,
        now_ms: u32,
    ) -> Result<SnoozeInfo> {
        if !(MIN_SNOOZE_MINUTES..=MAX_SNOOZE_MINUTES).contains(&minutes) {
            return Err(Error::InvalidSnoozeDuration);
        }

        let unixtime = self.rtc.unixtime().map_err(read_fault)?;
        let alarm_unixtime = unixtime
            .checked_add(minutes * 60)
            .ok_or(Error::InvalidUnixtime)?;
        let (alarm_hour, alarm_minute) = hour_minute(alarm_unixtime)?;

        self.enable_alarm(alarm_hour, alarm_minute, &mut state.alarm)?;
        state.power.requested_power_state = false;
        state.alarm.snooze_start_ms = now_ms;
        state.alarm.snooze_unixtime = unixtime;
        info!("rtc: snooze {minutes} min, host power request withdrawn");

        Ok(SnoozeInfo {
            duration: minutes,
            alarm_hour,
            alarm_minute,
            alarm_unixtime,
            unixtime,
        })
    }

    pub fn get_time(&mut self) -> Result<TimeInfo> {
        Ok(TimeInfo {
            unixtime: self.rtc.unixtime().map_err(read_fault)?,
            rtc_battery_low: self.rtc.battery_low()?,
            rtc_running: self.rtc.is_running()?,
        })
    }

    pub fn set_time(&mut self, unixtime: u32) -> Result<()> {
        if unixtime == 0 {
            return Err(Error::InvalidUnixtime);
        }
        self.rtc.set_unixtime(unixtime)?;
        info!("rtc: clock set to {unixtime}");
        Ok(())
    }
}

/// Unreadable calendar registers are a device fault, not bad input.
fn read_fault(e: RtcError) -> Error {
    warn!("rtc: read failed: {e}");
    Error::HardwareFault
}
