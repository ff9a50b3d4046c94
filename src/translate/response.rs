//! Translate Chat Completions responses back into Messages API responses.

use serde_json::Value;
use tracing::debug;

use super::anthropic_types::{
    ErrorResponse, MessagesResponse, ResponseContentBlock, Role, StopReason, Usage,
};
use super::openai_types::{ChatCompletionResponse, ChatErrorResponse, ChatUsage, Choice, FinishReason};
use super::tools::tool_call_from_openai;
use crate::error::{BridgeError, Result};

/// Translate a Chat Completion response into a Messages response.
/// `original_model` is what the caller asked for; the provider's echo is discarded.
///
/// # Errors
/// Returns `Conversion` when the response has no choices, an unmapped finish
/// reason, or a tool call that cannot be decoded.
pub fn translate_response(
    resp: &ChatCompletionResponse,
    original_model: &str,
) -> Result<MessagesResponse> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| BridgeError::conversion("response contains no choices"))?;

    let (stop_reason, stop_sequence) = match choice.finish_reason {
        Some(ref reason) => {
            let (mapped, matched) = map_finish_reason(reason, choice)?;
            (Some(mapped), matched)
        }
        None => (None, None),
    };

    let mut content: Vec<ResponseContentBlock> = Vec::new();

    if let Some(ref text) = choice.message.content {
        if !text.is_empty() {
            content.push(ResponseContentBlock::Text { text: text.clone() });
        }
    }

    // Emission order: text first, then calls in the order the provider listed them
    if let Some(ref tool_calls) = choice.message.tool_calls {
        for tc in tool_calls {
            content.push(tool_call_from_openai(tc)?);
        }
    }

    let usage = resp.usage.as_ref().map_or_else(Usage::default, translate_usage);

    let id = resp
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map_or_else(generate_message_id, str::to_string);

    if let Some(ref echoed) = resp.model {
        if echoed != original_model {
            debug!(requested = %original_model, echoed = %echoed, "provider echoed a different model id");
        }
    }

    Ok(MessagesResponse {
        id,
        response_type: "message".to_string(),
        role: Role::Assistant,
        content,
        model: original_model.to_string(),
        stop_reason,
        stop_sequence,
        usage,
    })
}

/// Map a finish reason to a stop reason, plus the matched stop sequence if any.
///
/// # Errors
/// Returns `Conversion` for reasons with no Messages API equivalent.
pub fn map_finish_reason(
    reason: &FinishReason,
    choice: &Choice,
) -> Result<(StopReason, Option<String>)> {
    let matched = match choice.stop_reason {
        Some(Value::String(ref s)) => Some(s.clone()),
        _ => None,
    };

    match reason {
        FinishReason::Stop => match matched {
            Some(seq) => Ok((StopReason::StopSequence, Some(seq))),
            None => Ok((StopReason::EndTurn, None)),
        },
        FinishReason::StopSequence => Ok((StopReason::StopSequence, matched)),
        FinishReason::Length => Ok((StopReason::MaxTokens, None)),
        FinishReason::ToolCalls | FinishReason::FunctionCall => Ok((StopReason::ToolUse, None)),
        FinishReason::Other(other) => Err(BridgeError::conversion(format!(
            "unrecognised finish_reason `{other}`"
        ))),
    }
}

fn translate_usage(u: &ChatUsage) -> Usage {
    Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        cache_read_input_tokens: u.prompt_tokens_details.as_ref().and_then(|d| d.cached_tokens),
    }
}

fn generate_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

/// Translate an upstream error into a Messages API error envelope.
/// Falls back to the HTTP status when the body is not a recognisable error.
pub fn upstream_error_to_anthropic(status: u16, body: &str) -> ErrorResponse {
    match serde_json::from_str::<ChatErrorResponse>(body) {
        Ok(err) => openai_error_to_anthropic(&err, status),
        Err(_) => ErrorResponse::new(
            error_type_for_status(status),
            format!("Provider returned status {status}: {}", truncate(body, 500)),
        ),
    }
}

pub fn openai_error_to_anthropic(err: &ChatErrorResponse, status: u16) -> ErrorResponse {
    let error_type = match err.error.error_type.as_deref() {
        Some("invalid_request_error") => "invalid_request_error",
        Some("authentication_error" | "invalid_api_key") => "authentication_error",
        Some("permission_error" | "insufficient_quota") => "permission_error",
        Some("rate_limit_error" | "rate_limit_exceeded") => "rate_limit_error",
        _ => error_type_for_status(status),
    };

    ErrorResponse::new(error_type, &err.error.message)
}

fn error_type_for_status(status: u16) -> &'static str {
    match status {
        400 | 404 | 422 => "invalid_request_error",
        401 => "authentication_error",
        403 => "permission_error",
        429 => "rate_limit_error",
        _ => "api_error",
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
