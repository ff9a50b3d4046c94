use serde_json::json;

use crate::error::{BridgeError, Result};
use crate::logging::{LogLevel, LogStage, SharedLogger};
use crate::transport::ChatTransport;
use crate::translate::anthropic_types::{MessagesRequest, MessagesResponse};
use crate::translate::{translate_request_with, translate_response};

/// Accepts Messages API requests and answers them through a Chat Completions transport.
pub struct Bridge<T> {
    transport: T,
    dropped_params: Vec<String>,
    logger: Option<SharedLogger>,
}

impl<T: ChatTransport> Bridge<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            dropped_params: Vec::new(),
            logger: None,
        }
    }

    /// Request fields that must never reach the provider.
    #[must_use]
    pub fn with_dropped_params(mut self, params: Vec<String>) -> Self {
        self.dropped_params = params;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Translate, send, translate back. Errors from any step are returned unchanged.
    pub async fn send_message(&self, req: &MessagesRequest) -> Result<MessagesResponse> {
        let chat_req = translate_request_with(req, &self.dropped_params).map_err(|e| {
            self.record(LogLevel::Warn, LogStage::Request, format!("Rejected request: {e}"));
            e
        })?;

        self.record(
            LogLevel::Info,
            LogStage::Request,
            format!(
                "model={} turns={} messages={}",
                req.model,
                req.messages.len(),
                chat_req.messages.len()
            ),
        );

        let chat_resp = self.transport.send(&chat_req).await.map_err(|e| {
            self.record_failure(&e);
            e
        })?;

        let resp = translate_response(&chat_resp, &req.model).map_err(|e| {
            self.record(LogLevel::Error, LogStage::Response, format!("Untranslatable response: {e}"));
            e
        })?;

        self.record(
            LogLevel::Info,
            LogStage::Response,
            format!(
                "Completed: blocks={} stop={} in={} out={} tokens",
                resp.content.len(),
                resp.stop_reason.map_or("none", |r| r.as_str()),
                resp.usage.input_tokens,
                resp.usage.output_tokens
            ),
        );

        Ok(resp)
    }

    /// Parse a raw Messages API body, then [`send_message`](Self::send_message).
    pub async fn send_json(&self, body: &[u8]) -> Result<MessagesResponse> {
        let req = MessagesRequest::from_json_slice(body)?;
        self.send_message(&req).await
    }

    fn record_failure(&self, err: &BridgeError) {
        let context = match err {
            BridgeError::Upstream { status, .. } => json!({"status": status}),
            BridgeError::Provider { .. } => json!({"kind": "provider"}),
            _ => json!({"kind": "other"}),
        };
        tracing::warn!(stage = ?LogStage::Transport, %context, "Transport failed: {err}");
        if let Some(ref logger) = self.logger {
            logger.log_with_context(
                LogLevel::Warn,
                LogStage::Transport,
                format!("Transport failed: {err}"),
                context,
            );
        }
    }

    fn record(&self, level: LogLevel, stage: LogStage, message: String) {
        match level {
            LogLevel::Error => tracing::error!(stage = ?stage, "{message}"),
            LogLevel::Warn => tracing::warn!(stage = ?stage, "{message}"),
            LogLevel::Info => tracing::info!(stage = ?stage, "{message}"),
            LogLevel::Debug => tracing::debug!(stage = ?stage, "{message}"),
        }
        if let Some(ref logger) = self.logger {
            logger.log(crate::logging::LogEntry::new(level, stage, message));
        }
    }
}
