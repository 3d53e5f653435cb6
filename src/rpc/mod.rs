//! Line-oriented JSON command protocol over the serial link.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Protocol Stack                       │
//! │                                                          │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐  │
//! │  │ SerialPort │──▶│   Codec    │──▶│ Engine (dispatch)│  │
//! │  │  (bytes)   │   │  (lines)   │   │ → ControllerState│  │
//! │  └────────────┘   └────────────┘   └──────────────────┘  │
//! │        ▲                                    │            │
//! │        │            ┌───────────────────────┘            │
//! │        │            ▼                                    │
//! │  ┌────────────┐   ┌────────────┐                         │
//! │  │ SerialPort │◀──│  Messages  │   (JSON envelopes)      │
//! │  │  (lines)   │   │            │                         │
//! │  └────────────┘   └────────────┘                         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod engine;
pub mod messages;
