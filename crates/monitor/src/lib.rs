//! `plantwatch-monitor` library crate.
//!
//! Loads a plant definition into an in-memory repository and replays
//! recorded sensor readings through it. The binary entrypoint lives in
//! `main.rs`; modules are public for integration testing.

pub mod config;
pub mod definition;
pub mod error;
pub mod replay;
pub mod repository;
