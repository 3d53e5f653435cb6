//! Unified error types for the buoy power controller.
//!
//! Every fallible operation funnels into [`Error`]. The `Display` output of
//! each variant is the exact token reported in the protocol `error` field,
//! so command handlers can format a response straight from the `Err` arm.
//! All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // ── Validation ────────────────────────────────────────────
    InvalidShutdownVoltage,
    InvalidStartupVoltage,
    StartupNotAboveShutdown,
    InvalidShutdownRpiCurrent,
    InvalidSnoozeTimeout,
    InvalidSnoozeDuration,
    InvalidUnixtime,

    // ── Protocol ──────────────────────────────────────────────
    UnknownCommand,
    MissingCommand,
    ResponseTooLong,

    // ── Hardware ──────────────────────────────────────────────
    /// The RTC did not answer on the bus.
    HardwareFault,
    /// Non-volatile storage rejected a read or write.
    Storage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::InvalidShutdownVoltage => "invalid shutdownVoltage",
            Self::InvalidStartupVoltage => "invalid startupVoltage",
            Self::StartupNotAboveShutdown => {
                "startupVoltage must be greater than shutdownVoltage"
            }
            Self::InvalidShutdownRpiCurrent => "invalid shutdownRpiCurrent",
            Self::InvalidSnoozeTimeout => "invalid snoozeTimeout",
            Self::InvalidSnoozeDuration => "invalid snooze duration",
            Self::InvalidUnixtime => "invalid unixtime",
            Self::UnknownCommand => "unknown command",
            Self::MissingCommand => "missing command",
            Self::ResponseTooLong => "response too long",
            Self::HardwareFault => "rtc hardware fault",
            Self::Storage => "storage failure",
        };
        f.write_str(token)
    }
}

// ---------------------------------------------------------------------------
// RTC errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError {
    /// I2C transaction failed.
    Bus,
    /// Time is outside what the RTC calendar can represent.
    InvalidTime,
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "RTC bus error"),
            Self::InvalidTime => write!(f, "time out of RTC range"),
        }
    }
}

impl From<RtcError> for Error {
    fn from(e: RtcError) -> Self {
        match e {
            RtcError::Bus => Self::HardwareFault,
            RtcError::InvalidTime => Self::InvalidUnixtime,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access past the end of the device.
    OutOfBounds,
    /// Generic I/O error from the backend.
    Io,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(_: StorageError) -> Self {
        Self::Storage
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
