//! Configuration resolution for voxcheck
//!
//! Two-tier resolution with ENV → TOML priority: every setting can come from
//! a `VOXCHECK_*` environment variable, falling back to `voxcheck.toml` in
//! the working directory, then to built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default bind address for the HTTP listener
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Default classifier artifact path
const DEFAULT_MODEL_PATH: &str = "model.json";

/// Demo API key accepted when none is configured
const DEFAULT_API_KEY: &str = "sk_test_123456789";

/// Raw TOML configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub model_path: Option<String>,
    pub whisper_model_path: Option<String>,
    pub api_keys: Option<Vec<String>>,
}

impl TomlConfig {
    /// Load the TOML file if present; a missing file is not an error
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Trained classifier artifact (JSON decision forest)
    pub model_path: PathBuf,
    /// Whisper GGML model for language identification (whisper builds only)
    pub whisper_model_path: Option<PathBuf>,
    /// Accepted `x-api-key` values
    pub api_keys: HashSet<String>,
}

impl Config {
    /// Resolve configuration from environment and `voxcheck.toml`
    pub fn resolve() -> Result<Config> {
        Self::resolve_from(Path::new("voxcheck.toml"))
    }

    /// Resolve against an explicit TOML path (test entry point)
    pub fn resolve_from(toml_path: &Path) -> Result<Config> {
        let toml = TomlConfig::load(toml_path)?;

        let bind_address = std::env::var("VOXCHECK_BIND_ADDRESS")
            .ok()
            .or(toml.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let model_path = std::env::var("VOXCHECK_MODEL_PATH")
            .ok()
            .or(toml.model_path)
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());

        let whisper_model_path = std::env::var("VOXCHECK_WHISPER_MODEL_PATH")
            .ok()
            .or(toml.whisper_model_path)
            .map(PathBuf::from);

        // ENV holds a comma-separated list; TOML holds an array
        let api_keys: HashSet<String> = match std::env::var("VOXCHECK_API_KEYS") {
            Ok(raw) => raw
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Err(_) => toml
                .api_keys
                .unwrap_or_default()
                .into_iter()
                .filter(|k| !k.is_empty())
                .collect(),
        };

        let api_keys = if api_keys.is_empty() {
            warn!("No API keys configured; accepting the built-in demo key only");
            HashSet::from([DEFAULT_API_KEY.to_string()])
        } else {
            api_keys
        };

        info!(
            bind_address = %bind_address,
            model_path = %model_path,
            api_keys = api_keys.len(),
            "Configuration resolved"
        );

        Ok(Config {
            bind_address,
            model_path: PathBuf::from(model_path),
            whisper_model_path,
            api_keys,
        })
    }
}
