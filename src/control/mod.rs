//! Vent control: the decision rules, the arbitrated actuator, and the
//! loop that ties sensing to actuation.

pub mod actuator;
pub mod cycle;
pub mod policy;
