//! Configuration for the resumer session cache and connection dispatcher.
//!
//! Provides TOML-based configuration with:
//! - `[cache]` session store settings (capacity bound, TTL, on/off)
//! - `[connect]` dispatcher settings (timeouts, default family pin, reuse)
//! - `[hosts]` static host table consulted before system resolution
//! - Config file layering (user config + project-local overrides) with per-layer provenance

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, Layer, LayerStatus, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{CacheSection, ConnectSection, ResumerConfig};
