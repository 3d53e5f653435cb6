//! Buoy power-management controller library.
//!
//! Exposes the controller core and its adapters for integration testing and
//! the host simulator. Hardware access goes through the port traits in
//! [`app::ports`]; nothing here depends on a particular MCU HAL.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod rpc;
pub mod rtc;
pub mod sensors;
pub mod timing;

pub use error::{Error, Result};
