// src/config.rs
//! Profile-based configuration.
//!
//! The `ENV` variable names the active profile (`dev` when unset). A
//! profile may ship overrides in `config/config-{env}.json`; a missing file
//! just means compiled-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Env {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Env {
    /// Reads the `ENV` variable, defaulting to `Dev` when unset or
    /// unrecognized.
    pub fn from_env() -> Self {
        std::env::var("ENV")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Env::Dev => write!(f, "dev"),
            Env::Test => write!(f, "test"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("unrecognized environment {0:?}")]
pub struct ParseEnvError(String);

impl FromStr for Env {
    type Err = ParseEnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Env::Dev),
            "test" => Ok(Env::Test),
            "prod" | "production" => Ok(Env::Prod),
            _ => Err(ParseEnvError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub stream: StreamConfig,
    pub book: BookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Wire header length in bytes; the seq and size fields always occupy
    /// the first eight.
    pub header_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Price levels printed per side; the `--depth` flag overrides this.
    pub depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            stream: StreamConfig::default(),
            book: BookConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            id: "depthfeed".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { header_length: 8 }
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

impl Config {
    /// Loads the profile for `env`, falling back to defaults when the
    /// profile file does not exist. A present but malformed file is an
    /// error.
    pub fn load(env: Env) -> Result<Config> {
        let path = PathBuf::from("config").join(format!("config-{env}.json"));
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }
}
