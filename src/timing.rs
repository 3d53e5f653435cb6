//! Loop cadence, buffer sizes and wraparound-safe duration helpers.
//!
//! All timestamps are milliseconds from a `u32` counter that wraps after
//! ~49.7 days. Durations are always `now.wrapping_sub(then)`; never compare
//! two raw timestamps with `<`/`>`.

/// Period between analog samples.
pub const SAMPLE_INTERVAL_MS: u32 = 5_000;

/// Ring-buffer capacity; 12 × 5 s gives the one-minute window.
pub const SAMPLE_SLOTS: usize = 12;

/// How long a manual button toggle suppresses the automatic control loop.
pub const OVERRIDE_INTERVAL_MS: u32 = 120_000;

/// Rail-off hold time during a stuck-host power cycle.
pub const RESET_HOLD_MS: u32 = 3_000;

/// Shortest snooze the day alarm can schedule (minutes).
pub const MIN_SNOOZE_MINUTES: u32 = 2;

/// Longest snooze before the hour:minute alarm becomes ambiguous (minutes).
pub const MAX_SNOOZE_MINUTES: u32 = 24 * 60 - 2;

/// Inbound command line capacity (bytes, terminator excluded).
pub const MAX_LINE_LEN: usize = 128;

/// Outbound response capacity (bytes, terminator excluded).
pub const MAX_RESPONSE_LEN: usize = 512;

/// Milliseconds elapsed from `then` to `now`, correct across counter wrap.
#[inline]
pub const fn elapsed_ms(now: u32, then: u32) -> u32 {
    now.wrapping_sub(then)
}

/// `true` once at least `period_ms` has passed since `then`.
#[inline]
pub const fn has_elapsed(now: u32, then: u32, period_ms: u32) -> bool {
    elapsed_ms(now, then) >= period_ms
}
