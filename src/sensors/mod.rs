//! Analog sampling and rolling statistics.
//!
//! The [`SampleEngine`] owns a fixed ring of [`SAMPLE_SLOTS`] readings and
//! the [`SampleStats`] derived from it. One sample is taken every
//! [`SAMPLE_INTERVAL_MS`](crate::timing::SAMPLE_INTERVAL_MS), so the ring
//! spans one minute and its statistics carry the `1m` suffix on the wire.
//!
//! A slot that still holds the `{0, 0}` boot value does not count towards
//! the statistics. The control loop must not act until `mean_valid` is set,
//! which happens once every slot has been written.

pub mod supply;

use crate::app::ports::SensorPort;
use crate::timing::SAMPLE_SLOTS;

/// One reading of both analog channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub supply_voltage: f32,
    pub rpi_current: f32,
}

impl Sample {
    /// Slot still holds the boot value.
    fn is_unwritten(&self) -> bool {
        self.supply_voltage == 0.0 && self.rpi_current == 0.0
    }
}

/// Statistics over the ring, recomputed after every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    pub supply_voltage: f32,
    pub rpi_current: f32,
    pub mean_supply_voltage: f32,
    pub mean_rpi_current: f32,
    pub min_supply_voltage: f32,
    pub min_rpi_current: f32,
    pub max_supply_voltage: f32,
    pub max_rpi_current: f32,
    /// Every slot written at least once; the means may be trusted.
    pub mean_valid: bool,
}

pub struct SampleEngine {
    ring: [Sample; SAMPLE_SLOTS],
    cursor: usize,
    stats: SampleStats,
}

impl SampleEngine {
    pub fn new() -> Self {
        Self {
            ring: [Sample::default(); SAMPLE_SLOTS],
            cursor: SAMPLE_SLOTS - 1,
            stats: SampleStats::default(),
        }
    }

    /// Advance the cursor, read both channels into the new slot and
    /// recompute the statistics.
    pub fn poll_sample(&mut self, sensors: &mut impl SensorPort) -> &SampleStats {
        let sample = Sample {
            supply_voltage: sensors.read_supply_voltage(),
            rpi_current: sensors.read_rpi_current(),
        };
        self.push(sample)
    }

    /// Store an already-taken sample.
    pub fn push(&mut self, sample: Sample) -> &SampleStats {
        self.cursor = (self.cursor + 1) % SAMPLE_SLOTS;
        self.ring[self.cursor] = sample;
        self.recompute(sample);
        &self.stats
    }

    pub fn stats(&self) -> &SampleStats {
        &self.stats
    }

    /// Most recently written sample.
    pub fn latest(&self) -> Sample {
        self.ring[self.cursor]
    }

    fn recompute(&mut self, latest: Sample) {
        let mut min_v = latest.supply_voltage;
        let mut max_v = latest.supply_voltage;
        let mut min_c = latest.rpi_current;
        let mut max_c = latest.rpi_current;
        let mut sum_v = 0.0f32;
        let mut sum_c = 0.0f32;
        let mut valid = 0usize;

        for s in self.ring.iter().filter(|s| !s.is_unwritten()) {
            valid += 1;
            sum_v += s.supply_voltage;
            sum_c += s.rpi_current;
            min_v = min_v.min(s.supply_voltage);
            max_v = max_v.max(s.supply_voltage);
            min_c = min_c.min(s.rpi_current);
            max_c = max_c.max(s.rpi_current);
        }

        let (mean_v, mean_c) = if valid == 0 {
            (0.0, 0.0)
        } else {
            (sum_v / valid as f32, sum_c / valid as f32)
        };

        self.stats = SampleStats {
            supply_voltage: latest.supply_voltage,
            rpi_current: latest.rpi_current,
            mean_supply_voltage: mean_v,
            mean_rpi_current: mean_c,
            min_supply_voltage: min_v,
            min_rpi_current: min_c,
            max_supply_voltage: max_v,
            max_rpi_current: max_c,
            mean_valid: valid == SAMPLE_SLOTS,
        };
    }
}

impl Default for SampleEngine {
    fn default() -> Self {
        Self::new()
    }
}
