//! Shared test utilities for the power max tracker.
//!
//! Config builders, in-memory collaborators (state lookup, state store,
//! publisher), mock Home Assistant / InfluxDB servers and time fixtures.

#![cfg(test)]

pub mod config;
pub mod fixtures;
pub mod mocks;
