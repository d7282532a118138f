//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level sampler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Biome/height sampling settings.
    pub sampler: SamplerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Settings consumed by the biome sampler at build and reload time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Memoize biome lookups per coordinate. Disabling only costs speed.
    pub cache_enabled: bool,
    /// Minimum time between two rate-limited warnings from the sampling path.
    pub warn_interval_ms: u64,
    /// How many levels of child biomes are followed during selection.
    pub max_child_depth: u32,
    /// Log cache hit/miss counters whenever a generation is retired.
    pub log_cache_stats: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            warn_interval_ms: 1_000,
            max_child_depth: 4,
            log_cache_stats: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for Strata (e.g. `~/.config/strata`).
///
/// Falls back to the working directory when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the config file inside `config_dir`.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Read `config.ron` from `config_dir`. A missing file is created with
    /// the defaults.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_path(config_dir);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("wrote default sampler config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("sampler config loaded from {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir`, creating the directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_path(config_dir);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, serialized).map_err(write_error)
    }

    /// Re-read the file. Returns the new config only when it differs from
    /// `self`, so callers rebuild the sampler only on real changes.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = config_path(config_dir);
        let fresh = read_config(&path)?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("sampler config at {} changed", path.display());
        Ok(Some(fresh))
    }
}
