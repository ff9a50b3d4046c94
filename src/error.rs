//! Error types for the bridge.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    /// The source request is missing a required field or carries an
    /// unrecognised enumerated value. Raised before any target request exists.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The target response holds something that has no source-schema mapping.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// The target service answered with an error. `body` is its raw payload.
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BridgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider {
            message: msg.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
