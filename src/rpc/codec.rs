//! Line framing for the serial command link.
//!
//! Wire format: one JSON object per line.
//! ```text
//! ┌──────────────────────────────┬──────────────┐
//! │ ASCII JSON (≤ MAX_LINE_LEN)  │ \n | \r | \0 │
//! └──────────────────────────────┴──────────────┘
//! ```
//!
//! The framer is fed one byte at a time, as the UART delivers them. A line
//! completes on a terminator or when the buffer fills; an overlong line is
//! therefore cut and handled as whatever JSON it happens to contain. Empty
//! lines (such as the `\n` of a `\r\n` pair) are dropped.

use heapless::Vec;

use crate::timing::MAX_LINE_LEN;

/// Appended to every outbound line.
pub const LINE_TERMINATOR: &str = "\r\n";

pub struct LineFramer {
    buf: Vec<u8, MAX_LINE_LEN>,
    complete: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            complete: false,
        }
    }

    /// Feed one byte. Returns `true` once a complete line is buffered; it
    /// stays available through [`line`](Self::line) until [`clear`](Self::clear).
    pub fn push(&mut self, byte: u8) -> bool {
        if self.complete {
            // Caller did not clear; start over rather than glue lines together.
            self.clear();
        }

        match byte {
            b'\n' | b'\r' | 0 => {
                self.complete = !self.buf.is_empty();
            }
            _ => {
                // Cannot fail: a full buffer is always marked complete below.
                let _ = self.buf.push(byte);
                self.complete = self.buf.is_full();
            }
        }
        self.complete
    }

    pub fn line(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.complete = false;
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
