//! Configuration for the Quarry chunk persistence engine.
//!
//! Settings persist to disk as a RON file. Every section is
//! `#[serde(default)]`, so files written by older or newer builds still load.

mod config;
mod error;

pub use config::{CacheConfig, Config, LoggingConfig, PaletteConfig, WorldConfig};
pub use error::ConfigError;
