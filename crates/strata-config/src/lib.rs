//! Configuration system for the Strata terrain sampler.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports hot-reload detection and forward/backward compatible
//! serialization.

mod config;
mod error;

pub use config::{Config, DebugConfig, SamplerConfig, config_path, default_config_dir};
pub use error::ConfigError;
