//! Endpoints for Chat Completions providers that can be named in config
//! instead of spelling out a `base_url`.

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    pub name: &'static str,
    /// Root of the provider's Chat Completions API, without a trailing slash.
    pub base_url: &'static str,
    pub default_api_key_env: &'static str,
}

const fn preset(
    name: &'static str,
    base_url: &'static str,
    default_api_key_env: &'static str,
) -> ProviderPreset {
    ProviderPreset {
        name,
        base_url,
        default_api_key_env,
    }
}

const PRESETS: &[ProviderPreset] = &[
    preset("openai", "https://api.openai.com/v1", "OPENAI_API_KEY"),
    preset("openrouter", "https://openrouter.ai/api/v1", "OPENROUTER_API_KEY"),
    preset("fireworks", "https://api.fireworks.ai/inference/v1", "FIREWORKS_API_KEY"),
    preset("grok", "https://api.x.ai/v1", "XAI_API_KEY"),
    preset("together", "https://api.together.xyz/v1", "TOGETHER_API_KEY"),
    preset("groq", "https://api.groq.com/openai/v1", "GROQ_API_KEY"),
    preset("deepseek", "https://api.deepseek.com/v1", "DEEPSEEK_API_KEY"),
];

impl ProviderPreset {
    /// Case-insensitive lookup.
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static ProviderPreset> {
        PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Like [`from_name`](Self::from_name), but an unknown name is a `Config`
    /// error listing the names that would have worked.
    pub fn lookup(name: &str) -> Result<&'static ProviderPreset> {
        Self::from_name(name).ok_or_else(|| {
            BridgeError::config(format!(
                "Unknown provider '{name}' and no base_url configured. Known providers: {}",
                Self::names().join(", ")
            ))
        })
    }

    #[must_use]
    pub fn all() -> &'static [ProviderPreset] {
        PRESETS
    }

    #[must_use]
    pub fn names() -> Vec<&'static str> {
        PRESETS.iter().map(|p| p.name).collect()
    }
}
