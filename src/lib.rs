//! VentGuard smart-vent controller library.
//!
//! Exposes the domain core (sensing, policy, arbitrated actuation, the
//! control loop, overrides) and its adapters for integration testing and
//! for the `ventguard` binary.

#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod app;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod sensors;
pub mod signals;
pub mod telemetry;

mod util;
