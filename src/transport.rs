//! The "send a Chat Completions request, get a response" collaborator.
//!
//! The translation layer never performs I/O itself; the [`Bridge`](crate::bridge::Bridge)
//! calls a [`ChatTransport`] between the two translation steps. Failures from the
//! transport are handed back to the caller as-is.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse, ChatErrorResponse};
use crate::translate::response::truncate;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        (**self).send(request).await
    }
}

/// Posts to `{base_url}/chat/completions` with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    /// Build a transport from config: endpoint, API key and request timeout.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let base_url = config.effective_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(client, &base_url, api_key))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        tracing::debug!(url = %self.url, model = %request.model, "POST chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::provider(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::provider(format!("Failed to read response body: {e}")))?;

        if status >= 400 {
            return Err(BridgeError::upstream(status, body));
        }

        // Some providers report failures inside a 200
        if serde_json::from_str::<ChatErrorResponse>(&body).is_ok() {
            return Err(BridgeError::upstream(status, body));
        }

        serde_json::from_str(&body).map_err(|e| {
            BridgeError::conversion(format!(
                "Failed to parse provider response: {e}. Body: {}",
                truncate(&body, 300)
            ))
        })
    }
}
