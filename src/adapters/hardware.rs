//! Hardware adapter: bridges board peripherals to the domain port traits.
//!
//! Owns the rail and LED output pins, the ADC, the blocking delay and the
//! millisecond clock, and exposes them together as a [`Board`](crate::app::ports::Board).
//! This is the only module that touches pins; it is generic over
//! `embedded-hal` traits so the same code drives real GPIO or the
//! simulated pins in [`sim`](super::sim).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{ActuatorPort, ClockPort, SensorPort};
use crate::sensors::supply::{AdcScale, AnalogChannel, AnalogSource, CURRENT_SCALE, SUPPLY_SCALE};

pub struct Pins<HOST, EXT, LED> {
    pub host_power: HOST,
    pub ext_power: EXT,
    pub led: LED,
}

pub struct HardwareAdapter<HOST, EXT, LED, ADC, D, CLK> {
    pins: Pins<HOST, EXT, LED>,
    adc: ADC,
    delay: D,
    clock: CLK,
    supply_scale: AdcScale,
    current_scale: AdcScale,
}

impl<HOST, EXT, LED, ADC, D, CLK> HardwareAdapter<HOST, EXT, LED, ADC, D, CLK>
where
    HOST: OutputPin,
    EXT: OutputPin,
    LED: OutputPin,
    ADC: AnalogSource,
    D: DelayNs,
    CLK: ClockPort,
{
    pub fn new(pins: Pins<HOST, EXT, LED>, adc: ADC, delay: D, clock: CLK) -> Self {
        Self {
            pins,
            adc,
            delay,
            clock,
            supply_scale: SUPPLY_SCALE,
            current_scale: CURRENT_SCALE,
        }
    }

    /// Override the default divider/shunt calibration.
    pub fn with_scales(mut self, supply: AdcScale, current: AdcScale) -> Self {
        self.supply_scale = supply;
        self.current_scale = current;
        self
    }

    pub fn adc_mut(&mut self) -> &mut ADC {
        &mut self.adc
    }

    pub fn pins(&self) -> &Pins<HOST, EXT, LED> {
        &self.pins
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool, name: &str) {
    let result = if on { pin.set_high() } else { pin.set_low() };
    if result.is_err() {
        warn!("hw: failed to drive {name} {}", if on { "high" } else { "low" });
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<HOST, EXT, LED, ADC, D, CLK> SensorPort for HardwareAdapter<HOST, EXT, LED, ADC, D, CLK>
where
    ADC: AnalogSource,
{
    fn read_supply_voltage(&mut self) -> f32 {
        self.supply_scale.apply(self.adc.read_raw(AnalogChannel::SupplyVoltage))
    }

    fn read_rpi_current(&mut self) -> f32 {
        self.current_scale.apply(self.adc.read_raw(AnalogChannel::RpiCurrent))
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<HOST, EXT, LED, ADC, D, CLK> ActuatorPort for HardwareAdapter<HOST, EXT, LED, ADC, D, CLK>
where
    HOST: OutputPin,
    EXT: OutputPin,
    LED: OutputPin,
{
    fn set_host_power(&mut self, on: bool) {
        drive(&mut self.pins.host_power, on, "host rail");
    }

    fn set_ext_power(&mut self, on: bool) {
        drive(&mut self.pins.ext_power, on, "ext rail");
    }

    fn set_led(&mut self, on: bool) {
        drive(&mut self.pins.led, on, "led");
    }
}

impl<HOST, EXT, LED, ADC, D, CLK> ClockPort for HardwareAdapter<HOST, EXT, LED, ADC, D, CLK>
where
    CLK: ClockPort,
{
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}

impl<HOST, EXT, LED, ADC, D, CLK> DelayNs for HardwareAdapter<HOST, EXT, LED, ADC, D, CLK>
where
    D: DelayNs,
{
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
