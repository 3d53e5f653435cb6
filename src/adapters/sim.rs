//! Simulated peripherals for running the controller on a host.
//!
//! | Type          | Stands in for                 |
//! |---------------|-------------------------------|
//! | `SimPin`      | rail / LED GPIO               |
//! | `SimAdc`      | supply divider + current shunt|
//! | `SimRtc`      | PCF8523 with INT1 wired up    |
//! | `StdioSerial` | UART to the host computer     |

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info, warn};

use crate::app::ports::{RtcDevice, SerialPort};
use crate::error::RtcError;
use crate::events::AlarmLine;
use crate::rpc::codec::LINE_TERMINATOR;
use crate::rtc::hour_minute;
use crate::sensors::supply::{AnalogChannel, AnalogSource};

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

// ── ADC ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimAdc {
    supply: u16,
    current: u16,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&mut self, channel: AnalogChannel, counts: u16) {
        match channel {
            AnalogChannel::SupplyVoltage => self.supply = counts,
            AnalogChannel::RpiCurrent => self.current = counts,
        }
    }
}

impl AnalogSource for SimAdc {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::SupplyVoltage => self.supply,
            AnalogChannel::RpiCurrent => self.current,
        }
    }
}

// ── RTC ───────────────────────────────────────────────────────

/// Wall clock derived from the host clock, plus an hour:minute alarm that
/// pulls the alarm line when [`tick`](Self::tick) sees it match.
pub struct SimRtc {
    base_unixtime: u32,
    base: Instant,
    running: bool,
    alarm: Option<(u8, u8)>,
    flag: bool,
}

impl SimRtc {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self::at(now)
    }

    pub fn at(unixtime: u32) -> Self {
        Self {
            base_unixtime: unixtime,
            base: Instant::now(),
            running: false,
            alarm: None,
            flag: false,
        }
    }

    fn now(&self) -> u32 {
        self.base_unixtime
            .wrapping_add(self.base.elapsed().as_secs() as u32)
    }

    /// Raise the alarm edge once when the armed minute arrives.
    pub fn tick(&mut self, line: &AlarmLine) {
        let Some(target) = self.alarm else { return };
        if self.flag {
            return;
        }
        if hour_minute(self.now()).is_ok_and(|hm| hm == target) {
            self.flag = true;
            debug!("sim rtc: alarm match {:02}:{:02}", target.0, target.1);
            line.on_falling_edge();
        }
    }
}

impl Default for SimRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcDevice for SimRtc {
    fn init(&mut self) -> Result<(), RtcError> {
        self.running = true;
        Ok(())
    }

    fn unixtime(&mut self) -> Result<u32, RtcError> {
        Ok(self.now())
    }

    fn set_unixtime(&mut self, unixtime: u32) -> Result<(), RtcError> {
        self.base_unixtime = unixtime;
        self.base = Instant::now();
        Ok(())
    }

    fn battery_low(&mut self) -> Result<bool, RtcError> {
        Ok(false)
    }

    fn is_running(&mut self) -> Result<bool, RtcError> {
        Ok(self.running)
    }

    fn set_day_alarm(&mut self, hour: u8, minute: u8) -> Result<(), RtcError> {
        self.alarm = Some((hour, minute));
        self.flag = false;
        Ok(())
    }

    fn disable_alarm(&mut self) -> Result<(), RtcError> {
        self.alarm = None;
        self.flag = false;
        Ok(())
    }
}

// ── Serial ────────────────────────────────────────────────────

/// Operator directives typed on the simulator's stdin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    /// Press the override button.
    Button,
    /// Set the simulated supply voltage (V).
    Supply(f32),
    /// Set the simulated host current (mA).
    Current(f32),
}

impl Directive {
    /// Parse a `!`-prefixed line. `None` if the line is not a directive.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let rest = line.trim().strip_prefix('!')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let value = parts.next().map(str::parse::<f32>);
        Some(match (name, value) {
            ("button", None) => Ok(Self::Button),
            ("supply", Some(Ok(v))) => Ok(Self::Supply(v)),
            ("current", Some(Ok(v))) => Ok(Self::Current(v)),
            _ => Err(format!("unrecognised directive: {}", line.trim())),
        })
    }
}

/// Serial link over stdin/stdout. A reader thread forwards stdin lines;
/// directives are split off, everything else is replayed byte by byte.
pub struct StdioSerial {
    rx: Receiver<String>,
    pending: VecDeque<u8>,
    directives: VecDeque<Directive>,
    closed: bool,
}

impl StdioSerial {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self::from_receiver(rx)
    }

    pub fn from_receiver(rx: Receiver<String>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            directives: VecDeque::new(),
            closed: false,
        }
    }

    /// `true` once stdin has closed and every byte has been consumed.
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }

    pub fn take_directive(&mut self) -> Option<Directive> {
        self.pump();
        self.directives.pop_front()
    }

    fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(line) => match Directive::parse(&line) {
                    Some(Ok(d)) => self.directives.push_back(d),
                    Some(Err(e)) => warn!("sim: {e}"),
                    None => {
                        self.pending.extend(line.bytes());
                        self.pending.push_back(b'\n');
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        info!("sim: stdin closed");
                    }
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

impl SerialPort for StdioSerial {
    fn read_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.pump();
        }
        self.pending.pop_front()
    }

    fn write_line(&mut self, line: &str) {
        let mut out = std::io::stdout().lock();
        if out
            .write_all(line.as_bytes())
            .and_then(|()| out.write_all(LINE_TERMINATOR.as_bytes()))
            .and_then(|()| out.flush())
            .is_err()
        {
            warn!("sim: stdout write failed");
        }
    }
}
