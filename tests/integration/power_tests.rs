//! Power state machine driven through the full controller loop: sampling,
//! snooze, wake alarm, manual override and the stuck-host watchdog.

use buoypower::adapters::eeprom::MemEeprom;
use buoypower::events::Interrupts;
use buoypower::fsm::{Decision, OffReason};
use buoypower::timing::{OVERRIDE_INTERVAL_MS, RESET_HOLD_MS, SAMPLE_INTERVAL_MS, SAMPLE_SLOTS};

use crate::mock_hw::{MockBoard, MockSerial, TestController, controller, controller_with, fill_ring, step};

/// Step one sample period at a time until the machine decides something,
/// giving up after `max_steps`.
fn run_until_decision(
    ctl: &mut TestController<'_>,
    serial: &mut MockSerial,
    max_steps: usize,
) -> Option<(usize, Decision)> {
    (1..=max_steps).find_map(|n| match step(ctl, serial, SAMPLE_INTERVAL_MS) {
        Decision::Stay => None,
        d => Some((n, d)),
    })
}

fn powered_on<'a>(irqs: &'a Interrupts, serial: &mut MockSerial) -> TestController<'a> {
    let mut ctl = controller(irqs);
    ctl.boot(serial);
    fill_ring(&mut ctl, serial);
    assert!(ctl.state().power.power_state);
    serial.take_json();
    ctl
}

// ── Sampling gate ─────────────────────────────────────────────

#[test]
fn powers_on_only_after_full_minute_of_samples() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    let decisions = fill_ring(&mut ctl, &mut serial);

    assert!(decisions[..SAMPLE_SLOTS - 1].iter().all(|d| *d == Decision::Stay));
    assert_eq!(decisions[SAMPLE_SLOTS - 1], Decision::PowerOn);
    assert!(ctl.stats().mean_valid);
    assert!(ctl.board().host_on());
    assert!(ctl.board().ext_on());
}

#[test]
fn supply_inside_hysteresis_band_keeps_rail_off() {
    let irqs = Interrupts::new();
    let mut board = MockBoard::new();
    board.supply_voltage = 12.9;
    let mut ctl = controller_with(&irqs, board, MemEeprom::new());
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    fill_ring(&mut ctl, &mut serial);
    assert_eq!(run_until_decision(&mut ctl, &mut serial, 24), None);
    assert!(!ctl.board().host_on());
}

#[test]
fn sampling_survives_clock_wrap() {
    let irqs = Interrupts::new();
    let board = MockBoard::starting_at(u32::MAX - 20_000);
    let mut ctl = controller_with(&irqs, board, MemEeprom::new());
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    let decisions = fill_ring(&mut ctl, &mut serial);

    assert_eq!(decisions.last(), Some(&Decision::PowerOn));
    assert!(ctl.board().now_ms < 60_000);
}

// ── Snooze ────────────────────────────────────────────────────

#[test]
fn snoozed_host_is_cut_once_it_goes_idle() {
    let irqs = Interrupts::new();
    let mut serial = MockSerial::new();
    let mut ctl = powered_on(&irqs, &mut serial);

    serial.send(r#"{"command":"snooze","duration":10}"#);
    assert_eq!(step(&mut ctl, &mut serial, 0), Decision::Stay);
    assert!(!ctl.state().power.requested_power_state);
    assert!(irqs.alarm.is_attached());

    ctl.board_mut().rpi_current = 50.0;
    let (steps, decision) = run_until_decision(&mut ctl, &mut serial, 20).unwrap();

    assert_eq!(decision, Decision::PowerOff(OffReason::HostShutdown));
    assert!(steps * SAMPLE_INTERVAL_MS as usize <= 120_000);
    assert!(!ctl.board().host_on());
}

#[test]
fn busy_snoozed_host_is_cut_after_timeout() {
    let irqs = Interrupts::new();
    let mut serial = MockSerial::new();
    let mut ctl = powered_on(&irqs, &mut serial);

    serial.send(r#"{"command":"snooze","duration":30}"#);
    step(&mut ctl, &mut serial, 0);

    let (steps, decision) = run_until_decision(&mut ctl, &mut serial, 40).unwrap();

    assert_eq!(decision, Decision::PowerOff(OffReason::SnoozeTimeout));
    assert_eq!(steps, 25, "first sample strictly past the 120 s grace period");
}

#[test]
fn low_voltage_wins_over_pending_snooze() {
    let irqs = Interrupts::new();
    let mut serial = MockSerial::new();
    let mut ctl = powered_on(&irqs, &mut serial);

    serial.send(r#"{"command":"snooze","duration":30}"#);
    step(&mut ctl, &mut serial, 0);
    ctl.board_mut().supply_voltage = 12.0;

    let (_, decision) = run_until_decision(&mut ctl, &mut serial, 20).unwrap();
    assert_eq!(decision, Decision::PowerOff(OffReason::LowVoltage));
}

#[test]
fn wake_alarm_restores_power_and_announces() {
    let irqs = Interrupts::new();
    let mut serial = MockSerial::new();
    let mut ctl = powered_on(&irqs, &mut serial);

    serial.send(r#"{"command":"snooze","duration":5}"#);
    step(&mut ctl, &mut serial, 0);
    ctl.board_mut().rpi_current = 50.0;
    run_until_decision(&mut ctl, &mut serial, 20).unwrap();
    assert!(!ctl.state().power.power_state);
    serial.take_json();

    // Walk the wall clock forward until the RTC would pull INT1 low.
    let mut fired = false;
    for _ in 0..120 {
        step(&mut ctl, &mut serial, SAMPLE_INTERVAL_MS);
        if ctl.rtc_mut().alarm_due() {
            irqs.alarm.on_falling_edge();
            fired = true;
            break;
        }
    }
    assert!(fired, "alarm minute never arrived");

    assert_eq!(step(&mut ctl, &mut serial, 0), Decision::PowerOn);
    let lines = serial.take_json();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["command"], "getconfig");
    assert_eq!(lines[1]["command"], "sensors");
    assert_eq!(lines[1]["requestedPowerState"], true);

    assert!(ctl.board().host_on());
    assert!(!ctl.state().alarm.alarm_set);
    assert!(!irqs.alarm.is_attached());
    assert_eq!(ctl.rtc_mut().alarm, None);
}

#[test]
fn alarm_edge_ignored_when_not_armed() {
    let irqs = Interrupts::new();
    let mut serial = MockSerial::new();
    let mut ctl = controller(&irqs);
    ctl.boot(&mut serial);
    serial.take_json();

    irqs.alarm.on_falling_edge();
    step(&mut ctl, &mut serial, 0);

    assert!(serial.take_json().is_empty());
}

// ── Stuck host ────────────────────────────────────────────────

#[test]
fn idle_requested_host_is_power_cycled_repeatedly() {
    let irqs = Interrupts::new();
    let mut board = MockBoard::new();
    board.rpi_current = 50.0;
    let mut ctl = controller_with(&irqs, board, MemEeprom::new());
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);
    fill_ring(&mut ctl, &mut serial);
    assert!(ctl.board().host_on());

    let before = ctl.board().now_ms;
    let (steps, decision) = run_until_decision(&mut ctl, &mut serial, 30).unwrap();
    assert_eq!(decision, Decision::PowerCycle);
    assert_eq!(steps, 24);
    assert_eq!(
        ctl.board().now_ms,
        before + 24 * SAMPLE_INTERVAL_MS + RESET_HOLD_MS,
        "cycle blocks for the hold period"
    );
    assert_eq!(ctl.board().host_writes(), vec![false, true, false, true]);

    let (_, again) = run_until_decision(&mut ctl, &mut serial, 30).unwrap();
    assert_eq!(again, Decision::PowerCycle);
}

// ── Manual override ───────────────────────────────────────────

#[test]
fn button_overrides_state_machine_until_window_expires() {
    let irqs = Interrupts::new();
    let mut board = MockBoard::new();
    board.supply_voltage = 12.0;
    let mut ctl = controller_with(&irqs, board, MemEeprom::new());
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    irqs.button.on_falling_edge(ctl.board().now_ms);
    step(&mut ctl, &mut serial, 0);
    assert!(ctl.board().host_on(), "press powers the host immediately");
    assert!(ctl.state().power.power_state_override);

    // Statistics become valid and call for shutdown, but the override holds.
    fill_ring(&mut ctl, &mut serial);
    assert!(ctl.board().host_on());

    let remaining = (OVERRIDE_INTERVAL_MS / SAMPLE_INTERVAL_MS) as usize;
    let (_, decision) = run_until_decision(&mut ctl, &mut serial, remaining).unwrap();
    assert_eq!(decision, Decision::PowerOff(OffReason::LowVoltage));
    assert!(!ctl.state().power.power_state_override);
}

#[test]
fn button_ignored_when_override_disabled() {
    let irqs = Interrupts::new();
    let mut ctl = controller(&irqs);
    let mut serial = MockSerial::new();
    ctl.boot(&mut serial);

    serial.send(r#"{"command":"setconfig","overrideEnabled":false}"#);
    step(&mut ctl, &mut serial, 0);

    irqs.button.on_falling_edge(ctl.board().now_ms);
    step(&mut ctl, &mut serial, 0);

    assert!(!ctl.board().host_on());
    assert!(!ctl.state().power.power_state_override);
}
