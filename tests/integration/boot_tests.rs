//! Cold-boot behaviour: configuration recovery, RTC bring-up and the two
//! status lines announced before the main loop starts.

use buoypower::adapters::eeprom::{MemEeprom, RECORD_OFFSET, RECORD_LEN, decode_record, encode_record};
use buoypower::app::ports::StoragePort;
use buoypower::config::PowerConfig;
use buoypower::events::Interrupts;

use crate::mock_hw::{MockBoard, MockSerial, controller, controller_with};

#[test]
fn blank_eeprom_boots_with_defaults_and_heals_record() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();

    ctl.boot(&mut serial);

    assert_eq!(*ctl.config(), PowerConfig::default());
    let raw: [u8; RECORD_LEN] = ctl.store().storage().bytes()
        [RECORD_OFFSET..RECORD_OFFSET + RECORD_LEN]
        .try_into()
        .unwrap();
    assert_eq!(decode_record(&raw), Ok(PowerConfig::default()));
}

#[test]
fn boot_announces_config_then_empty_sensors() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();

    ctl.boot(&mut serial);
    let lines = serial.take_json();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["command"], "getconfig");
    assert_eq!(lines[0]["error"], "");
    assert_eq!(lines[0]["shutdownVoltage"].as_f64(), Some(12.8));
    assert_eq!(lines[0]["snoozeTimeout"], 120);
    assert_eq!(lines[0]["overrideEnabled"], true);

    assert_eq!(lines[1]["command"], "sensors");
    assert_eq!(lines[1]["meanValid"], false);
    assert_eq!(lines[1]["supplyVoltage"].as_f64(), Some(0.0));
    assert_eq!(lines[1]["powerState"], false);
    assert_eq!(lines[1]["requestedPowerState"], true);
}

#[test]
fn boot_keeps_valid_stored_config() {
    let stored = PowerConfig {
        shutdown_voltage: 12.5,
        startup_voltage: 13.5,
        shutdown_rpi_current: 150.0,
        snooze_timeout: 300,
        override_enabled: false,
    };
    let mut eeprom = MemEeprom::new();
    eeprom
        .write(RECORD_OFFSET, &encode_record(&stored))
        .unwrap();
    let writes_before = eeprom.write_count();

    let irqs = Interrupts::new();
    let mut ctl = controller_with(&irqs, MockBoard::new(), eeprom);
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    assert_eq!(*ctl.config(), stored);
    assert_eq!(ctl.store().storage().write_count(), writes_before);
    let lines = serial.take_json();
    assert_eq!(lines[0]["snoozeTimeout"], 300);
    assert_eq!(lines[0]["overrideEnabled"], false);
}

#[test]
fn boot_starts_with_rails_off() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();

    ctl.boot(&mut serial);

    assert!(!ctl.board().host_on());
    assert!(!ctl.board().ext_on());
    assert!(!ctl.state().power.power_state);
    assert!(ctl.state().power.requested_power_state);
}

#[test]
fn boot_survives_unresponsive_rtc() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    ctl.rtc_mut().fail = true;
    let mut serial = MockSerial::new();

    ctl.boot(&mut serial);

    let lines = serial.take_json();
    assert_eq!(lines.len(), 2);
    assert!(!ctl.state().alarm.alarm_set);
    assert!(!irqs.alarm.is_attached());
}

#[test]
fn boot_leaves_alarm_disarmed() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();

    ctl.boot(&mut serial);

    assert_eq!(ctl.rtc_mut().alarm, None);
    assert!(!irqs.alarm.is_attached());
}
