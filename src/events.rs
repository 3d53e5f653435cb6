//! Interrupt lines shared between ISR context and the main loop.
//!
//! Only two asynchronous entry points exist: the override button and the
//! RTC alarm output. Each handler does the minimum (record a timestamp,
//! raise a flag) and returns; the main loop consumes the event on its
//! next iteration.
//!
//! ```text
//! ┌────────────────┐   signal(ts)   ┌────────────┐
//! │ button ISR     │──────────────▶│            │
//! └────────────────┘                │ Main loop  │
//! ┌────────────────┐   signal(())   │ (consumer) │
//! │ RTC alarm ISR  │──────────────▶│            │
//! └────────────────┘                └────────────┘
//! ```
//!
//! Each line holds at most one pending event. A newer button edge replaces
//! the pending timestamp, which is how contact bounce within one loop
//! iteration collapses to a single press.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Falling-edge timestamps from the manual override button.
pub struct ButtonLine {
    pressed: Signal<CriticalSectionRawMutex, u32>,
}

impl ButtonLine {
    pub const fn new() -> Self {
        Self {
            pressed: Signal::new(),
        }
    }

    /// ISR handler: record the press time. Lock-free for the caller apart
    /// from a short critical section.
    pub fn on_falling_edge(&self, now_ms: u32) {
        self.pressed.signal(now_ms);
    }

    /// Take the most recent press, if any arrived since the last call.
    pub fn take_press(&self) -> Option<u32> {
        self.pressed.try_take()
    }
}

impl Default for ButtonLine {
    fn default() -> Self {
        Self::new()
    }
}

/// RTC alarm output. Edges are only latched while attached.
pub struct AlarmLine {
    attached: AtomicBool,
    fired: Signal<CriticalSectionRawMutex, ()>,
}

impl AlarmLine {
    pub const fn new() -> Self {
        Self {
            attached: AtomicBool::new(false),
            fired: Signal::new(),
        }
    }

    /// Start latching falling edges.
    pub fn attach(&self) {
        self.fired.reset();
        self.attached.store(true, Ordering::Release);
    }

    /// Stop latching and drop anything pending.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
        self.fired.reset();
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// ISR handler for the RTC INT line.
    pub fn on_falling_edge(&self) {
        if self.attached.load(Ordering::Acquire) {
            self.fired.signal(());
        }
    }

    /// Consume a pending alarm.
    pub fn take(&self) -> bool {
        self.fired.try_take().is_some()
    }
}

impl Default for AlarmLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Both interrupt lines. `const`-constructible so firmware can keep one in
/// a `static` that the ISR vectors reach.
pub struct Interrupts {
    pub button: ButtonLine,
    pub alarm: AlarmLine,
}

impl Interrupts {
    pub const fn new() -> Self {
        Self {
            button: ButtonLine::new(),
            alarm: AlarmLine::new(),
        }
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}
