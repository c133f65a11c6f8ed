//! Configuration for the Cosmos Journeyer terrain driver.
//!
//! Settings persist to disk as `config.ron`. Every section falls back to its
//! defaults when missing, so old files keep loading after new fields appear.
//! CLI arguments override whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, FlightConfig, ForgeConfig, PlanetConfig, default_config_dir};
pub use error::ConfigError;
