//! Raw ADC channels and their conversion to engineering units.
//!
//! The power HAT exposes the battery/solar supply through a resistor divider
//! and the host current through a shunt amplifier. Both land on 10-bit ADC
//! inputs; a linear [`AdcScale`] turns counts into volts or milliamps.

/// The two analog inputs the controller samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    SupplyVoltage,
    RpiCurrent,
}

/// Source of raw ADC counts. Platform code implements this.
pub trait AnalogSource {
    fn read_raw(&mut self, channel: AnalogChannel) -> u16;
}

/// `value = counts * per_count + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcScale {
    pub per_count: f32,
    pub offset: f32,
}

/// Supply divider: 0.03125 V per count.
pub const SUPPLY_SCALE: AdcScale = AdcScale {
    per_count: 0.031_25,
    offset: 0.0,
};

/// Host current shunt: 1.759 mA per count.
pub const CURRENT_SCALE: AdcScale = AdcScale {
    per_count: 1.759,
    offset: 0.0,
};

impl AdcScale {
    pub fn apply(&self, counts: u16) -> f32 {
        f32::from(counts) * self.per_count + self.offset
    }

    /// Raw count that reads back closest to `value`. Used by simulations.
    pub fn counts_for(&self, value: f32) -> u16 {
        if self.per_count <= 0.0 {
            return 0;
        }
        let counts = ((value - self.offset) / self.per_count).round();
        counts.clamp(0.0, f32::from(u16::MAX)) as u16
    }
}
