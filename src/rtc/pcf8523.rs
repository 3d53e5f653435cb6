//! NXP PCF8523 real-time clock over I2C.
//!
//! ## Registers used
//!
//! | Addr | Name        | Bits                                    |
//! |------|-------------|-----------------------------------------|
//! | 0x00 | Control_1   | 5 STOP, 1 AIE                           |
//! | 0x01 | Control_2   | 3 AF                                    |
//! | 0x02 | Control_3   | 7..5 PM (000 = switch-over + BLF), 2 BLF |
//! | 0x03 | Seconds     | 7 OS, BCD seconds                       |
//! | 0x04 | Minutes     | BCD                                     |
//! | 0x05 | Hours       | BCD, 24 h mode                          |
//! | 0x06 | Days        | BCD                                     |
//! | 0x07 | Weekdays    | 0 = Sunday                              |
//! | 0x08 | Months      | BCD                                     |
//! | 0x09 | Years       | BCD, offset from 2000                   |
//! | 0x0A | Minute_alarm| 7 AEN_M (1 = ignored), BCD              |
//! | 0x0B | Hour_alarm  | 7 AEN_H                                 |
//! | 0x0C | Day_alarm   | 7 AEN_D                                 |
//! | 0x0D | Weekday_alarm| 7 AEN_W                                |
//!
//! The INT1 output goes low when AF sets while AIE is enabled, which is
//! the falling edge the alarm line latches.

use embedded_hal::i2c::I2c;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::app::ports::RtcDevice;
use crate::error::RtcError;

pub const ADDRESS: u8 = 0x68;

const REG_CONTROL_1: u8 = 0x00;
const REG_CONTROL_2: u8 = 0x01;
const REG_CONTROL_3: u8 = 0x02;
const REG_SECONDS: u8 = 0x03;
const REG_MINUTE_ALARM: u8 = 0x0A;

const CTRL1_STOP: u8 = 1 << 5;
const CTRL1_AIE: u8 = 1 << 1;
const CTRL2_AF: u8 = 1 << 3;
const CTRL3_PM_MASK: u8 = 0b1110_0000;
const CTRL3_BLF: u8 = 1 << 2;
const SECONDS_OS: u8 = 1 << 7;
const ALARM_DISABLED: u8 = 1 << 7;

/// First and last calendar year the 2-digit year register can hold.
pub const YEAR_RANGE: core::ops::RangeInclusive<i32> = 2000..=2099;

pub struct Pcf8523<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Pcf8523<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, RtcError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[reg], &mut buf)
            .map_err(|_| RtcError::Bus)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), RtcError> {
        self.i2c
            .write(ADDRESS, &[reg, value])
            .map_err(|_| RtcError::Bus)
    }

    fn update_reg(&mut self, reg: u8, clear: u8, set: u8) -> Result<(), RtcError> {
        let value = self.read_reg(reg)?;
        self.write_reg(reg, (value & !clear) | set)
    }
}

impl<I2C: I2c> RtcDevice for Pcf8523<I2C> {
    fn init(&mut self) -> Result<(), RtcError> {
        // Battery switch-over in standard mode with low-battery detection.
        self.update_reg(REG_CONTROL_3, CTRL3_PM_MASK, 0)?;
        self.update_reg(REG_CONTROL_1, CTRL1_STOP, 0)
    }

    fn unixtime(&mut self) -> Result<u32, RtcError> {
        let mut raw = [0u8; 7];
        self.i2c
            .write_read(ADDRESS, &[REG_SECONDS], &mut raw)
            .map_err(|_| RtcError::Bus)?;
        registers_to_unixtime(&raw)
    }

    fn set_unixtime(&mut self, unixtime: u32) -> Result<(), RtcError> {
        let regs = unixtime_to_registers(unixtime)?;
        let mut frame = [0u8; 8];
        frame[0] = REG_SECONDS;
        frame[1..].copy_from_slice(&regs);
        self.i2c.write(ADDRESS, &frame).map_err(|_| RtcError::Bus)
    }

    fn battery_low(&mut self) -> Result<bool, RtcError> {
        Ok(self.read_reg(REG_CONTROL_3)? & CTRL3_BLF != 0)
    }

    fn is_running(&mut self) -> Result<bool, RtcError> {
        let stopped = self.read_reg(REG_CONTROL_1)? & CTRL1_STOP != 0;
        let osc_lost = self.read_reg(REG_SECONDS)? & SECONDS_OS != 0;
        Ok(!stopped && !osc_lost)
    }

    fn set_day_alarm(&mut self, hour: u8, minute: u8) -> Result<(), RtcError> {
        if hour > 23 || minute > 59 {
            return Err(RtcError::InvalidTime);
        }
        self.i2c
            .write(
                ADDRESS,
                &[
                    REG_MINUTE_ALARM,
                    to_bcd(minute),
                    to_bcd(hour),
                    ALARM_DISABLED,
                    ALARM_DISABLED,
                ],
            )
            .map_err(|_| RtcError::Bus)?;
        self.update_reg(REG_CONTROL_2, CTRL2_AF, 0)?;
        self.update_reg(REG_CONTROL_1, 0, CTRL1_AIE)
    }

    fn disable_alarm(&mut self) -> Result<(), RtcError> {
        self.update_reg(REG_CONTROL_1, CTRL1_AIE, 0)?;
        self.i2c
            .write(ADDRESS, &[REG_MINUTE_ALARM, ALARM_DISABLED, ALARM_DISABLED, ALARM_DISABLED, ALARM_DISABLED])
            .map_err(|_| RtcError::Bus)?;
        self.update_reg(REG_CONTROL_2, CTRL2_AF, 0)
    }
}

// ---------------------------------------------------------------------------
// Calendar conversion
// ---------------------------------------------------------------------------

fn to_bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

fn from_bcd(v: u8) -> u8 {
    (v >> 4) * 10 + (v & 0x0F)
}

/// Decode Seconds..Years (7 registers) into Unix seconds.
pub fn registers_to_unixtime(raw: &[u8; 7]) -> Result<u32, RtcError> {
    let second = from_bcd(raw[0] & 0x7F);
    let minute = from_bcd(raw[1] & 0x7F);
    let hour = from_bcd(raw[2] & 0x3F);
    let day = from_bcd(raw[3] & 0x3F);
    let month = Month::try_from(from_bcd(raw[5] & 0x1F)).map_err(|_| RtcError::InvalidTime)?;
    let year = 2000 + i32::from(from_bcd(raw[6]));

    let date = Date::from_calendar_date(year, month, day).map_err(|_| RtcError::InvalidTime)?;
    let time = Time::from_hms(hour, minute, second).map_err(|_| RtcError::InvalidTime)?;
    let ts = PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp();
    u32::try_from(ts).map_err(|_| RtcError::InvalidTime)
}

/// Encode Unix seconds into Seconds..Years. Clears the OS flag.
pub fn unixtime_to_registers(unixtime: u32) -> Result<[u8; 7], RtcError> {
    let dt = OffsetDateTime::from_unix_timestamp(i64::from(unixtime))
        .map_err(|_| RtcError::InvalidTime)?;
    if !YEAR_RANGE.contains(&dt.year()) {
        return Err(RtcError::InvalidTime);
    }
    Ok([
        to_bcd(dt.second()),
        to_bcd(dt.minute()),
        to_bcd(dt.hour()),
        to_bcd(dt.day()),
        dt.weekday().number_days_from_sunday(),
        to_bcd(u8::from(dt.month())),
        to_bcd((dt.year() - 2000) as u8),
    ])
}
