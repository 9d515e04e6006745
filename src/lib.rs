pub mod analysis;
pub mod config;
pub mod decoder;
pub mod formation;
pub mod projection;
pub mod telemetry;

#[cfg(test)]
mod testutil;

pub use config::{Config, ConfigError};
pub use decoder::{validate, LogError, Validation};
pub use telemetry::{parse, ParsedLogData};
