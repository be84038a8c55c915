//! Layered configuration loading utilities.
//!
//! Precedence: coded defaults, then an optional `tenor.toml` (or an
//! explicit file), then `TENOR_*` environment variables
//! (`TENOR_GUI__THROTTLE_MS=250` style for nested fields).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tenor_core::AggressPricing;

/// Root application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Directory the four input files are read from.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Directory the output logs are appended under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Default tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional TOML bond catalog extending the built-in issues.
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    #[serde(default)]
    pub gui: GuiConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Throttling applied to the GUI price tap.
#[derive(Clone, Debug, Deserialize)]
pub struct GuiConfig {
    /// Minimum spacing between persisted GUI records, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Hard cap on GUI records per run; later ticks are dropped.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

/// Tuning for the execution algo.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExecutionConfig {
    /// Which touch a market-aggressing order is priced against.
    #[serde(default)]
    pub aggress_pricing: AggressPricing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            catalog_file: None,
            gui: GuiConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            max_records: default_max_records(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("../input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("../output")
}

fn default_log_level() -> String {
    "info".into()
}

fn default_throttle_ms() -> u64 {
    300
}

fn default_max_records() -> usize {
    100
}

/// Load configuration, optionally from an explicit file path.
pub fn load_config(file: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();
    builder = match file {
        Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
        None => builder.add_source(File::with_name("tenor").required(false)),
    };
    let settings = builder
        .add_source(Environment::with_prefix("TENOR").separator("__"))
        .build()
        .context("failed to assemble configuration sources")?;
    settings
        .try_deserialize()
        .context("failed to deserialize configuration")
}
