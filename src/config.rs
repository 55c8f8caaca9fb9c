//! TOML configuration shared by the query server and the ingest tool.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:5000"
//! cors_origins = ["*"]
//!
//! [data]
//! sources = ["data/countries.geojson.gz", "data/overrides/"]
//! include_samples = false
//! on_duplicate = "replace"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::loader::DuplicatePolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Allowed CORS origins; "*" allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// Feed files or directories, loaded in order
    pub sources: Vec<PathBuf>,
    /// Load the built-in sample countries before the sources
    pub include_samples: bool,
    pub on_duplicate: DuplicatePolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            include_samples: true,
            on_duplicate: DuplicatePolicy::Replace,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
