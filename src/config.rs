use crate::error::{BridgeError, Result};
use crate::providers::ProviderPreset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "messages-bridge";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub params: ParamsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsConfig {
    /// Request fields that are never forwarded to the provider.
    #[serde(default = "default_drop_params")]
    pub drop: Vec<String>,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            drop: default_drop_params(),
        }
    }
}

fn default_port() -> u16 {
    4222
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_drop_params() -> Vec<String> {
    vec![
        "betas".to_string(),
        "anthropic_beta".to_string(),
        "anthropic-beta".to_string(),
        "context_management".to_string(),
        "thinking".to_string(),
    ]
}

impl BridgeConfig {
    /// A config for `provider` with every other setting at its default.
    pub fn for_provider(provider: ProviderConfig) -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            provider,
            params: ParamsConfig::default(),
        }
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        let candidates = config_search_paths();
        for candidate in &candidates {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        Err(BridgeError::config(format!(
            "No config file found. Searched: {}",
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Resolve the effective base URL (config override or provider preset default)
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.provider.base_url {
            return Ok(url.clone());
        }

        Ok(ProviderPreset::lookup(&self.provider.name)?.base_url.to_string())
    }

    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.provider.api_key_env).map_err(|_| {
            BridgeError::config(format!(
                "Environment variable '{}' not set. Set it with your provider API key.",
                self.provider.api_key_env
            ))
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Candidate config locations, highest priority first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(format!("{APP_NAME}.toml"))];

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join(APP_NAME)
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join(APP_NAME).join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join(APP_NAME).join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(format!(".{APP_NAME}.toml")));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
