//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the full controller loop
//! against the mock adapters in [`mock_hw`]. All tests run on the host with
//! no real hardware required.

mod boot_tests;
mod power_tests;
mod protocol_tests;
