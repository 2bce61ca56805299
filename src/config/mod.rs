//! Configuration management for portgate.
//!
//! Scan defaults live in [`ScanSettings`], optionally read from a JSON file
//! and then overridden by command-line flags.

mod settings;

pub use settings::{ConfigError, ScanSettings};
