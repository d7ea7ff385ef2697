//! mediactl - command-line front end for the media store
//!
//! This library provides:
//! - `commands`: save, list, config and purge implementations
//! - `telemetry`: tracing subscriber setup

pub mod commands;
pub mod telemetry;
