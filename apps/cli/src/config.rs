//! CLI configuration
//!
//! Layered, later sources win:
//! 1. built-in defaults
//! 2. `leadscope.toml` in the working directory, or the file given with `--config`
//! 3. `LEADSCOPE__*` environment variables (`.env` is loaded first), e.g.
//!    `LEADSCOPE__FILTERS__RANGE_POLICY=drop`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use leadscope_filters::FilterSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAME: &str = "leadscope";
const ENV_PREFIX: &str = "LEADSCOPE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Filter registry JSON file, used when `--registry` is not given.
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is fine; a malformed one is not.
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env"),
        }

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}
