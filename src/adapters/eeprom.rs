//! Persisted configuration record.
//!
//! Implements [`ConfigPort`] on top of any byte-addressable [`StoragePort`].
//!
//! Layout at [`RECORD_OFFSET`], little-endian:
//! ```text
//! 0..4    crc32 (IEEE) over 4..21
//! 4..8    shutdownVoltage     f32
//! 8..12   startupVoltage      f32
//! 12..16  shutdownRpiCurrent  f32
//! 16..20  snoozeTimeout       u32
//! 20      overrideEnabled     u8 (0 / 1)
//! ```
//!
//! A record that fails its checksum, or that decodes to values outside the
//! valid ranges, is replaced by the defaults, which are written back before
//! `load` returns.

use log::{info, warn};

use crate::app::ports::{ConfigPort, StoragePort};
use crate::config::PowerConfig;
use crate::error::StorageError;

pub const RECORD_OFFSET: usize = 0;
pub const RECORD_LEN: usize = 21;
const CRC_LEN: usize = 4;

const OFF_SHUTDOWN_V: usize = 4;
const OFF_STARTUP_V: usize = 8;
const OFF_CURRENT: usize = 12;
const OFF_SNOOZE: usize = 16;
const OFF_OVERRIDE: usize = 20;

/// Why a stored record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    CrcMismatch { stored: u32, computed: u32 },
    BadFlag(u8),
}

pub fn crc32_ieee(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            let mask = 0u32.wrapping_sub(crc & 1);
            crc = (crc >> 1) ^ (0xEDB8_8320u32 & mask);
        }
    }
    !crc
}

pub fn encode_record(config: &PowerConfig) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[OFF_SHUTDOWN_V..OFF_SHUTDOWN_V + 4].copy_from_slice(&config.shutdown_voltage.to_le_bytes());
    out[OFF_STARTUP_V..OFF_STARTUP_V + 4].copy_from_slice(&config.startup_voltage.to_le_bytes());
    out[OFF_CURRENT..OFF_CURRENT + 4].copy_from_slice(&config.shutdown_rpi_current.to_le_bytes());
    out[OFF_SNOOZE..OFF_SNOOZE + 4].copy_from_slice(&config.snooze_timeout.to_le_bytes());
    out[OFF_OVERRIDE] = u8::from(config.override_enabled);

    let crc = crc32_ieee(&out[CRC_LEN..]);
    out[..CRC_LEN].copy_from_slice(&crc.to_le_bytes());
    out
}

pub fn decode_record(bytes: &[u8; RECORD_LEN]) -> Result<PowerConfig, RecordError> {
    let word = |off: usize| [bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]];

    let stored = u32::from_le_bytes(word(0));
    let computed = crc32_ieee(&bytes[CRC_LEN..]);
    if stored != computed {
        return Err(RecordError::CrcMismatch { stored, computed });
    }

    let override_enabled = match bytes[OFF_OVERRIDE] {
        0 => false,
        1 => true,
        other => return Err(RecordError::BadFlag(other)),
    };

    Ok(PowerConfig {
        shutdown_voltage: f32::from_le_bytes(word(OFF_SHUTDOWN_V)),
        startup_voltage: f32::from_le_bytes(word(OFF_STARTUP_V)),
        shutdown_rpi_current: f32::from_le_bytes(word(OFF_CURRENT)),
        snooze_timeout: u32::from_le_bytes(word(OFF_SNOOZE)),
        override_enabled,
    })
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

pub struct ConfigStore<S> {
    storage: S,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn read_record(&mut self) -> Result<PowerConfig, &'static str> {
        let mut raw = [0u8; RECORD_LEN];
        self.storage
            .read(RECORD_OFFSET, &mut raw)
            .map_err(|_| "storage read failed")?;
        match decode_record(&raw) {
            Ok(cfg) if cfg.validate().is_ok() => Ok(cfg),
            Ok(_) => Err("stored values out of range"),
            Err(RecordError::CrcMismatch { stored, computed }) => {
                warn!("config: checksum mismatch (stored {stored:#010x}, computed {computed:#010x})");
                Err("checksum mismatch")
            }
            Err(RecordError::BadFlag(_)) => Err("corrupt override flag"),
        }
    }
}

impl<S: StoragePort> ConfigPort for ConfigStore<S> {
    fn load(&mut self) -> PowerConfig {
        match self.read_record() {
            Ok(cfg) => {
                info!("config: loaded {cfg:?}");
                cfg
            }
            Err(reason) => {
                warn!("config: {reason}, restoring defaults");
                let defaults = PowerConfig::default();
                if let Err(e) = self.save(&defaults) {
                    warn!("config: could not persist defaults: {e}");
                }
                defaults
            }
        }
    }

    fn save(&mut self, config: &PowerConfig) -> Result<(), StorageError> {
        self.storage.write(RECORD_OFFSET, &encode_record(config))?;
        info!("config: saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory EEPROM
// ---------------------------------------------------------------------------

pub const MEM_EEPROM_SIZE: usize = 1024;

/// Host-side EEPROM image, erased to `0xFF` like a fresh part.
pub struct MemEeprom {
    bytes: [u8; MEM_EEPROM_SIZE],
    writes: u32,
    write_protected: bool,
}

impl MemEeprom {
    pub fn new() -> Self {
        Self {
            bytes: [0xFF; MEM_EEPROM_SIZE],
            writes: 0,
            write_protected: false,
        }
    }

    /// Drive the part's WP line. While set, every write fails with
    /// [`StorageError::Io`] and leaves the image untouched.
    pub fn set_write_protected(&mut self, on: bool) {
        self.write_protected = on;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Completed write calls since construction.
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}

impl Default for MemEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MemEeprom {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let src = self
            .bytes
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfBounds)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        if self.write_protected {
            return Err(StorageError::Io);
        }
        let dst = self
            .bytes
            .get_mut(offset..offset + data.len())
            .ok_or(StorageError::OutOfBounds)?;
        dst.copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
