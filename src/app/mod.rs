//! Application core: domain orchestration, no direct I/O.
//!
//! The controller's main loop lives in [`service`]. All interaction with
//! hardware happens through the **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod ports;
pub mod service;
