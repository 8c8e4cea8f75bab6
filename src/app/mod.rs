//! Application core: operator commands, events and the port traits.
//!
//! Everything the controller needs from the outside world (sensors, servo,
//! alarm, LCD, clock, telemetry transport) is reached through the **port
//! traits** in [`ports`], so the domain runs unchanged against the GPIO
//! adapters on a Pi or the simulated board on a host.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
