//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated board.  No real hardware is required.

mod api_tests;
mod control_loop_tests;
mod mock_hw;
