//! Configuration module
//!
//! Handles loading hub configuration from the TOML config file.

mod hub;

pub use hub::*;
