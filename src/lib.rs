//! Warden - validate, resolve, and launch process descriptors with environment profiles

pub mod commands;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod subprocess;
pub mod telemetry;
