//! Translate Messages API requests into Chat Completions requests.
//!
//! The model id, sampling knobs and tool schemas are copied untouched. `system`
//! becomes a leading `system` message; that is the only message the translator
//! synthesizes. A user turn that carries `tool_result` blocks expands into one
//! `tool`-role message per result, in block order.

use tracing::debug;

use super::anthropic_types::{ContentBlock, Message, MessageContent, MessagesRequest, Role};
use super::openai_types::{
    ChatCompletionRequest, ChatContent, ChatMessage, ChatRole, ChatToolCall, ContentPart,
};
use super::tools::{tool_call_to_openai, tool_choice_to_openai, tool_defs_to_openai, tool_result_to_openai};
use crate::error::{BridgeError, Result};

/// Target fields a forwarded extra must never shadow.
const RESERVED_FIELDS: &[&str] = &[
    "model",
    "messages",
    "max_tokens",
    "max_completion_tokens",
    "temperature",
    "top_p",
    "tools",
    "tool_choice",
    "stop",
    "user",
    "stream",
    "stream_options",
];

/// Translate a Messages API request into a Chat Completions request.
///
/// # Errors
/// Returns `Validation` when `max_tokens` is missing or zero, or when a turn
/// carries a block its role cannot hold.
pub fn translate_request(req: &MessagesRequest) -> Result<ChatCompletionRequest> {
    translate_request_with(req, &[])
}

/// Like [`translate_request`], but never forwards the extra fields named in `dropped`.
pub fn translate_request_with(
    req: &MessagesRequest,
    dropped: &[String],
) -> Result<ChatCompletionRequest> {
    let max_completion_tokens = match req.max_tokens {
        Some(0) => return Err(BridgeError::validation("max_tokens must be positive")),
        Some(n) => n,
        None => return Err(BridgeError::validation("missing required field `max_tokens`")),
    };

    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(ref system) = req.system {
        messages.push(ChatMessage::text(ChatRole::System, system.as_text()));
    }

    for (index, msg) in req.messages.iter().enumerate() {
        translate_message(msg, &mut messages)
            .map_err(|e| BridgeError::validation(format!("messages[{index}]: {}", describe(&e))))?;
    }

    let tools = req.tools.as_deref().map(tool_defs_to_openai);
    let tool_choice = req.tool_choice.as_ref().map(tool_choice_to_openai);
    let user = req.metadata.as_ref().and_then(|m| m.user_id.clone());

    if req.top_k.is_some() {
        debug!("top_k has no Chat Completions counterpart, not forwarded");
    }

    let mut extra = serde_json::Map::new();
    for (key, value) in &req.extra {
        if dropped.iter().any(|d| d == key) || RESERVED_FIELDS.contains(&key.as_str()) {
            debug!(field = %key, "dropping request field");
            continue;
        }
        extra.insert(key.clone(), value.clone());
    }

    debug!(
        model = %req.model,
        source_turns = req.messages.len(),
        target_messages = messages.len(),
        "translated request"
    );

    Ok(ChatCompletionRequest {
        model: req.model.clone(),
        messages,
        max_completion_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        tools,
        tool_choice,
        stop: req.stop_sequences.clone(),
        user,
        extra,
    })
}

fn translate_message(msg: &Message, out: &mut Vec<ChatMessage>) -> Result<()> {
    if let MessageContent::Text(ref text) = msg.content {
        out.push(ChatMessage::text(chat_role(msg.role), text.clone()));
        return Ok(());
    }

    let blocks = msg.content.blocks();
    match msg.role {
        Role::User => translate_user_blocks(&blocks, out),
        Role::Assistant => {
            out.push(translate_assistant_blocks(&blocks)?);
            Ok(())
        }
    }
}

fn translate_user_blocks(blocks: &[ContentBlock], out: &mut Vec<ChatMessage>) -> Result<()> {
    let start = out.len();
    let mut text: Vec<String> = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push(t.clone()),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                // Text seen before the result keeps its position
                if !text.is_empty() {
                    out.push(ChatMessage::new(ChatRole::User, Some(collapse_text(&mut text))));
                }
                out.push(tool_result_to_openai(tool_use_id, content.as_ref(), *is_error)?);
            }
            ContentBlock::ToolUse { name, .. } => {
                return Err(BridgeError::validation(format!(
                    "tool_use block `{name}` is only valid in an assistant turn"
                )));
            }
        }
    }

    if !text.is_empty() || out.len() == start {
        out.push(ChatMessage::new(ChatRole::User, Some(collapse_text(&mut text))));
    }

    Ok(())
}

fn translate_assistant_blocks(blocks: &[ContentBlock]) -> Result<ChatMessage> {
    let mut text: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ChatToolCall> = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push(t.clone()),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(tool_call_to_openai(id, name, input)?);
            }
            ContentBlock::ToolResult { tool_use_id, .. } => {
                return Err(BridgeError::validation(format!(
                    "tool_result block for `{tool_use_id}` is only valid in a user turn"
                )));
            }
        }
    }

    let content = if text.is_empty() && !tool_calls.is_empty() {
        None
    } else {
        Some(collapse_text(&mut text))
    };

    let mut msg = ChatMessage::new(ChatRole::Assistant, content);
    if !tool_calls.is_empty() {
        msg.tool_calls = Some(tool_calls);
    }
    Ok(msg)
}

/// One block stays a plain string; several become ordered text parts.
fn collapse_text(text: &mut Vec<String>) -> ChatContent {
    let mut drained: Vec<String> = std::mem::take(text);
    if drained.len() <= 1 {
        return ChatContent::Text(drained.pop().unwrap_or_default());
    }
    ChatContent::Parts(
        drained
            .into_iter()
            .map(|text| ContentPart::Text { text })
            .collect(),
    )
}

fn chat_role(role: Role) -> ChatRole {
    match role {
        Role::User => ChatRole::User,
        Role::Assistant => ChatRole::Assistant,
    }
}

fn describe(err: &BridgeError) -> String {
    match err {
        BridgeError::Validation { message } => message.clone(),
        other => other.to_string(),
    }
}
