//! Serial protocol through the controller loop: framing, routing, the
//! response envelope and configuration persistence.

use buoypower::adapters::eeprom::{RECORD_LEN, RECORD_OFFSET, decode_record};
use buoypower::config::PowerConfig;
use buoypower::events::Interrupts;
use buoypower::rpc::messages::FIRMWARE_VERSION;

use crate::mock_hw::{BOOT_UNIXTIME, MockSerial, TestController, controller, fill_ring, step};

fn booted(irqs: &Interrupts) -> (TestController<'_>, MockSerial) {
    let mut ctl = controller(irqs);
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);
    serial.take_json();
    (ctl, serial)
}

fn stored_config(ctl: &TestController<'_>) -> PowerConfig {
    let raw: [u8; RECORD_LEN] = ctl.store().storage().bytes()[RECORD_OFFSET..RECORD_OFFSET + RECORD_LEN]
        .try_into()
        .unwrap();
    decode_record(&raw).unwrap()
}

// ── Framing and envelope ──────────────────────────────────────

#[test]
fn each_line_gets_one_response_in_order() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send_raw(b"{\"command\":\"gettime\"}\r\n{\"command\":\"getconfig\"}\n");
    step(&mut ctl, &mut serial, 0);

    let lines = serial.take_json();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["command"], "gettime");
    assert_eq!(lines[1]["command"], "getconfig");
}

#[test]
fn envelope_carries_uptime_and_version() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"sensors"}"#);
    step(&mut ctl, &mut serial, 1_234);

    let line = &serial.take_json()[0];
    assert_eq!(line["error"], "");
    assert_eq!(line["uptimems"], 1_234);
    assert_eq!(line["version"], FIRMWARE_VERSION);
}

#[test]
fn indicator_lit_while_dispatching() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);
    let leds_at_boot = ctl.board().led_writes().len();

    serial.send(r#"{"command":"sensors"}"#);
    step(&mut ctl, &mut serial, 0);

    assert_eq!(&ctl.board().led_writes()[leds_at_boot..], &[true, false]);
}

#[test]
fn incomplete_line_waits_for_terminator() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send_raw(br#"{"command":"sen"#);
    step(&mut ctl, &mut serial, 0);
    assert!(serial.outbound.is_empty());

    serial.send_raw(b"sors\"}\r\n");
    step(&mut ctl, &mut serial, 0);
    assert_eq!(serial.take_json()[0]["command"], "sensors");
}

#[test]
fn malformed_json_reports_without_command() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send("not json");
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert!(line.get("command").is_none());
    assert_ne!(line["error"], "");
}

#[test]
fn unknown_and_missing_commands() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"reboot"}"#);
    serial.send(r#"{"duration":5}"#);
    step(&mut ctl, &mut serial, 0);

    let lines = serial.take_json();
    assert_eq!(lines[0]["command"], "unknown");
    assert_eq!(lines[0]["error"], "unknown command");
    assert_eq!(lines[1]["command"], "unknown");
    assert_eq!(lines[1]["error"], "missing command");
}

#[test]
fn command_token_matches_by_prefix() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"sensorsplease"}"#);
    step(&mut ctl, &mut serial, 0);

    assert_eq!(serial.take_json()[0]["command"], "sensors");
}

// ── Sensors ───────────────────────────────────────────────────

#[test]
fn sensors_reports_one_minute_statistics() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);
    fill_ring(&mut ctl, &mut serial);

    serial.send(r#"{"command":"sensors"}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["meanValid"], true);
    assert_eq!(line["powerState"], true);
    let mean = line["mean1mSupplyVoltage"].as_f64().unwrap();
    assert!((mean - 13.2).abs() < 1e-3);
    assert_eq!(line["min1mRpiCurrent"], line["max1mRpiCurrent"]);
}

// ── Time ──────────────────────────────────────────────────────

#[test]
fn settime_then_gettime() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"settime","unixtime":1750000000}"#);
    serial.send(r#"{"command":"gettime"}"#);
    step(&mut ctl, &mut serial, 0);

    let lines = serial.take_json();
    assert_eq!(lines[0]["unixtime"], 1_750_000_000u32);
    assert_eq!(lines[1]["unixtime"], 1_750_000_000u32);
    assert_eq!(lines[1]["rtcRunning"], true);
    assert_eq!(lines[1]["rtcBatteryLow"], false);
}

#[test]
fn settime_rejects_bad_values() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"settime","unixtime":0}"#);
    serial.send(r#"{"command":"settime","unixtime":"soon"}"#);
    serial.send(r#"{"command":"settime","unixtime":-5}"#);
    step(&mut ctl, &mut serial, 0);

    for line in serial.take_json() {
        assert_eq!(line["command"], "settime");
        assert_eq!(line["error"], "invalid unixtime");
    }
    assert_eq!(ctl.rtc_mut().now, BOOT_UNIXTIME);
}

#[test]
fn gettime_reports_rtc_fault() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);
    ctl.rtc_mut().fail = true;

    serial.send(r#"{"command":"gettime"}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["error"], "rtc hardware fault");
    assert!(line.get("unixtime").is_none());
}

// ── Snooze ────────────────────────────────────────────────────

#[test]
fn snooze_reports_alarm_and_last_snooze() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"snooze","duration":10}"#);
    serial.send(r#"{"command":"getlastsnooze"}"#);
    step(&mut ctl, &mut serial, 42);

    let lines = serial.take_json();
    // 12:34:56 + 10 min
    assert_eq!(lines[0]["duration"], 10);
    assert_eq!(lines[0]["alarmHour"], 12);
    assert_eq!(lines[0]["alarmMinute"], 44);
    assert_eq!(lines[0]["alarmUnixtime"], BOOT_UNIXTIME + 600);
    assert_eq!(lines[0]["unixtime"], BOOT_UNIXTIME);

    assert_eq!(lines[1]["alarmSet"], true);
    assert_eq!(lines[1]["snoozeUnixtime"], BOOT_UNIXTIME);
    assert_eq!(lines[1]["snoozeStartTime"], 42);
    assert_eq!(ctl.rtc_mut().alarm, Some((12, 44)));
}

#[test]
fn snooze_duration_bounds() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"snooze","duration":1}"#);
    serial.send(r#"{"command":"snooze","duration":1439}"#);
    serial.send(r#"{"command":"snooze"}"#);
    step(&mut ctl, &mut serial, 0);

    for line in serial.take_json() {
        assert_eq!(line["error"], "invalid snooze duration");
    }
    assert!(ctl.state().power.requested_power_state);
    assert!(!ctl.state().alarm.alarm_set);

    serial.send(r#"{"command":"snooze","duration":2}"#);
    serial.send(r#"{"command":"snooze","duration":1438}"#);
    step(&mut ctl, &mut serial, 0);

    for line in serial.take_json() {
        assert_eq!(line["error"], "");
    }
    assert!(ctl.state().alarm.alarm_set);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn setconfig_merges_and_persists() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","snoozeTimeout":300,"shutdownVoltage":0}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["error"], "");
    assert_eq!(line["snoozeTimeout"], 300);
    assert_eq!(line["shutdownVoltage"].as_f64(), Some(12.8));

    let expected = PowerConfig {
        snooze_timeout: 300,
        ..PowerConfig::default()
    };
    assert_eq!(*ctl.config(), expected);
    assert_eq!(stored_config(&ctl), expected);
}

#[test]
fn setconfig_rejects_inverted_thresholds() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);
    let writes = ctl.store().storage().write_count();

    serial.send(r#"{"command":"setconfig","startupVoltage":12.5}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["error"], "startupVoltage must be greater than shutdownVoltage");
    assert_eq!(*ctl.config(), PowerConfig::default());
    assert_eq!(ctl.store().storage().write_count(), writes);
}

#[test]
fn setconfig_rejects_out_of_range_fields() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","shutdownRpiCurrent":900}"#);
    serial.send(r#"{"command":"setconfig","snoozeTimeout":30}"#);
    serial.send(r#"{"command":"setconfig","shutdownVoltage":11.0}"#);
    step(&mut ctl, &mut serial, 0);

    let errors: Vec<_> = serial
        .take_json()
        .into_iter()
        .map(|l| l["error"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        errors,
        ["invalid shutdownRpiCurrent", "invalid snoozeTimeout", "invalid shutdownVoltage"]
    );
}

#[test]
fn defaultconfig_restores_and_persists_defaults() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","snoozeTimeout":500,"overrideEnabled":false}"#);
    serial.send(r#"{"command":"defaultconfig"}"#);
    step(&mut ctl, &mut serial, 0);

    let lines = serial.take_json();
    assert_eq!(lines[1]["command"], "defaultconfig");
    assert_eq!(lines[1]["snoozeTimeout"], 120);
    assert_eq!(*ctl.config(), PowerConfig::default());
    assert_eq!(stored_config(&ctl), PowerConfig::default());
}

#[test]
fn setconfig_reports_first_invalid_field() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","shutdownVoltage":15.0,"startupVoltage":9.0}"#);
    step(&mut ctl, &mut serial, 0);

    assert_eq!(serial.take_json()[0]["error"], "invalid shutdownVoltage");
}

#[test]
fn setconfig_type_error_uses_decoder_message() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","snoozeTimeout":"long"}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["command"], "setconfig");
    assert!(line["error"].as_str().unwrap().contains("invalid type"));
    assert_eq!(*ctl.config(), PowerConfig::default());
}

#[test]
fn setconfig_accepts_host_manager_defaults() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    // Host-side manager defaults, with the override flag sent as an integer.
    serial.send(
        r#"{"shutdownVoltage": 12.8, "startupVoltage": 12.9, "snoozeTimeout": 120, "overrideEnabled": 1, "command": "setconfig"}"#,
    );
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["command"], "setconfig");
    assert_eq!(line["error"], "");
    assert_eq!(line["overrideEnabled"], true);
    assert_eq!(line["snoozeTimeout"], 120);
    assert!((line["startupVoltage"].as_f64().unwrap() - 12.9).abs() < 1e-5);

    assert!((ctl.config().startup_voltage - 12.9).abs() < 1e-6);
    assert!(ctl.config().override_enabled);
    assert_eq!(stored_config(&ctl), *ctl.config());
}

#[test]
fn setconfig_accepts_whole_float_timeout() {
    let irqs = Interrupts::new();
    let (mut ctl, mut serial) = booted(&irqs);

    serial.send(r#"{"command":"setconfig","snoozeTimeout":300.0,"overrideEnabled":0}"#);
    step(&mut ctl, &mut serial, 0);

    let line = &serial.take_json()[0];
    assert_eq!(line["error"], "");
    assert_eq!(ctl.config().snooze_timeout, 300);
    assert!(!ctl.config().override_enabled);
    assert_eq!(stored_config(&ctl), *ctl.config());
}
