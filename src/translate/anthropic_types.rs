//! Type definitions for the Messages API convention (the source schema).
//!
//! Callers write requests and read responses in this shape. Opaque payloads
//! (tool schemas, tool inputs, unknown top-level fields) stay `serde_json::Value`
//! so nothing downstream validates or rewrites them.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Request types (what the caller sends TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    /// Required, checked by the request translator so the error names the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    // Catch-all for fields this schema does not name
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemContent {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<ToolResultContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Payload of a `tool_result` block: a string, a list of blocks, or any other JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Tool-choice policy. Accepts both `{"type": "any"}` and the bare `"any"` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "Value")]
pub enum ToolChoice {
    Auto,
    Any,
    Tool { name: String },
    None,
}

impl TryFrom<Value> for ToolChoice {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self> {
        let (kind, fields) = match &value {
            Value::String(s) => (s.as_str(), None),
            Value::Object(map) => {
                let kind = map.get("type").and_then(Value::as_str).ok_or_else(|| {
                    BridgeError::validation("tool_choice: missing string field `type`")
                })?;
                (kind, Some(map))
            }
            other => {
                return Err(BridgeError::validation(format!(
                    "tool_choice: expected a string or an object, got {other}"
                )))
            }
        };

        match kind {
            "auto" => Ok(Self::Auto),
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            "tool" => {
                let name = fields
                    .and_then(|m| m.get("name"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        BridgeError::validation("tool_choice: `tool` policy requires `name`")
                    })?;
                Ok(Self::Tool {
                    name: name.to_string(),
                })
            }
            other => Err(BridgeError::validation(format!(
                "tool_choice: unrecognised policy `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Response types (what we send BACK to the caller)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub response_type: String, // "message"
    pub role: Role,
    pub content: Vec<ResponseContentBlock>,
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
}

impl StopReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::ToolUse => "tool_use",
            StopReason::StopSequence => "stop_sequence",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: "error".to_string(),
            error: ErrorBody {
                error_type: error_type.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new("invalid_request_error", msg)
    }

    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::new("api_error", msg)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl MessagesRequest {
    /// A request with the required fields set and everything else empty.
    pub fn new(model: impl Into<String>, max_tokens: u64, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            max_tokens: Some(max_tokens),
            messages,
            system: None,
            stream: None,
            temperature: None,
            top_p: None,
            top_k: None,
            tools: None,
            tool_choice: None,
            metadata: None,
            stop_sequences: None,
            extra: HashMap::new(),
        }
    }

    /// Parse a raw request body. Schema violations become `Validation` errors.
    pub fn from_json_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BridgeError::validation(format!("invalid request body: {e}")))?;
        Self::from_value(value)
    }

    /// The error names the offending field (`max_tokens`, `messages[2].content[0]`)
    /// whenever one field can be blamed on its own.
    pub fn from_value(value: Value) -> Result<Self> {
        Self::deserialize(&value).map_err(|e| {
            let detail = locate_invalid_field(&value)
                .map_or_else(|| e.to_string(), |(path, cause)| format!("{path}: {cause}"));
            BridgeError::validation(format!("invalid request body: {detail}"))
        })
    }
}

fn field_error<T: DeserializeOwned>(value: &Value) -> Option<String> {
    T::deserialize(value).err().map(|e| e.to_string())
}

type FieldCheck = fn(&Value) -> Option<String>;

const TOP_LEVEL_CHECKS: &[(&str, FieldCheck)] = &[
    ("model", field_error::<String>),
    ("max_tokens", field_error::<Option<u64>>),
    ("messages", field_error::<Vec<Message>>),
    ("system", field_error::<Option<SystemContent>>),
    ("stream", field_error::<Option<bool>>),
    ("temperature", field_error::<Option<f64>>),
    ("top_p", field_error::<Option<f64>>),
    ("top_k", field_error::<Option<u64>>),
    ("tools", field_error::<Option<Vec<Tool>>>),
    ("tool_choice", field_error::<Option<ToolChoice>>),
    ("metadata", field_error::<Option<Metadata>>),
    ("stop_sequences", field_error::<Option<Vec<String>>>),
];

/// Path and cause of the first request field that does not parse by itself.
fn locate_invalid_field(body: &Value) -> Option<(String, String)> {
    let fields = body.as_object()?;

    if let Some(Value::Array(turns)) = fields.get("messages") {
        if let Some(found) = locate_invalid_turn(turns) {
            return Some(found);
        }
    }
    if let Some(Value::Array(tools)) = fields.get("tools") {
        for (i, tool) in tools.iter().enumerate() {
            if let Some(cause) = field_error::<Tool>(tool) {
                return Some((format!("tools[{i}]"), cause));
            }
        }
    }

    TOP_LEVEL_CHECKS.iter().find_map(|(name, check)| {
        fields
            .get(*name)
            .and_then(|v| check(v))
            .map(|cause| ((*name).to_string(), cause))
    })
}

fn locate_invalid_turn(turns: &[Value]) -> Option<(String, String)> {
    for (i, turn) in turns.iter().enumerate() {
        let Some(turn_error) = field_error::<Message>(turn) else {
            continue;
        };
        let path = format!("messages[{i}]");

        if let Some(cause) = turn.get("role").and_then(field_error::<Role>) {
            return Some((format!("{path}.role"), cause));
        }
        match turn.get("content") {
            Some(Value::Array(blocks)) => {
                for (j, block) in blocks.iter().enumerate() {
                    if let Some(cause) = field_error::<ContentBlock>(block) {
                        return Some((format!("{path}.content[{j}]"), cause));
                    }
                }
            }
            Some(content) => {
                if let Some(cause) = field_error::<MessageContent>(content) {
                    return Some((format!("{path}.content"), cause));
                }
            }
            None => {}
        }
        return Some((path, turn_error));
    }
    None
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: MessageContent::Blocks(blocks),
        }
    }
}

impl SystemContent {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            SystemContent::Text(t) => Cow::Borrowed(t),
            SystemContent::Blocks(blocks) => Cow::Owned(
                blocks
                    .iter()
                    .map(|b| match b {
                        SystemBlock::Text { text } => text.as_str(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
}

impl MessageContent {
    pub fn blocks(&self) -> Cow<'_, [ContentBlock]> {
        match self {
            MessageContent::Text(t) => Cow::Owned(vec![ContentBlock::Text { text: t.clone() }]),
            MessageContent::Blocks(b) => Cow::Borrowed(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_choice_object_and_string_forms() {
        let forced: ToolChoice =
            serde_json::from_value(json!({"type": "tool", "name": "lookup"})).unwrap();
        assert_eq!(
            forced,
            ToolChoice::Tool {
                name: "lookup".to_string()
            }
        );

        let any: ToolChoice = serde_json::from_value(json!("any")).unwrap();
        assert_eq!(any, ToolChoice::Any);

        let none: ToolChoice = serde_json::from_value(json!({"type": "none"})).unwrap();
        assert_eq!(none, ToolChoice::None);
    }

    #[test]
    fn test_tool_choice_rejects_unknown_policy() {
        let err = ToolChoice::try_from(json!({"type": "sometimes"})).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("sometimes"));

        let err = ToolChoice::try_from(json!({"type": "tool"})).unwrap_err();
        assert!(err.to_string().contains("name"));

        assert!(ToolChoice::try_from(json!(7)).is_err());
    }

    #[test]
    fn test_tool_choice_serializes_tagged() {
        let value = serde_json::to_value(ToolChoice::Tool {
            name: "lookup".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "tool", "name": "lookup"}));
    }

    #[test]
    fn test_request_parse_errors_are_validation() {
        let err = MessagesRequest::from_value(json!({"max_tokens": 10, "messages": []}))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("model"));

        let err = MessagesRequest::from_value(json!({
            "model": "m1",
            "max_tokens": 10,
            "messages": [],
            "tool_choice": {"type": "maybe"}
        }))
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_messages_is_validation() {
        let err = MessagesRequest::from_value(json!({"model": "m1", "max_tokens": 5})).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("missing field `messages`"));

        let req = MessagesRequest::from_value(json!({"model": "m1", "max_tokens": 5, "messages": []}))
            .unwrap();
        assert!(req.messages.is_empty());
    }

    #[test]
    fn test_parse_errors_name_the_field() {
        let err = MessagesRequest::from_value(json!({
            "model": "m1",
            "max_tokens": 10,
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "user", "content": [
                    {"type": "text", "text": "see attached"},
                    {"type": "image", "source": {"type": "base64", "data": ""}}
                ]}
            ]
        }))
        .unwrap_err();
        assert!(err.is_validation());
        let msg = err.to_string();
        assert!(msg.contains("messages[1].content[1]"), "{msg}");
        assert!(msg.contains("image"), "{msg}");

        let err = MessagesRequest::from_value(json!({"model": "m1", "max_tokens": -5, "messages": []}))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("max_tokens: "), "{msg}");
        assert!(msg.contains("-5"), "{msg}");

        let err = MessagesRequest::from_json_slice(
            br#"{"model":"m1","max_tokens":5,"messages":[{"role":"system","content":"x"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("messages[0].role"));

        let err = MessagesRequest::from_value(json!({
            "model": "m1",
            "max_tokens": 5,
            "messages": [],
            "tools": [{"name": "lookup"}]
        }))
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("tools[0]"), "{msg}");
        assert!(msg.contains("input_schema"), "{msg}");
    }

    #[test]
    fn test_unknown_fields_land_in_extra() {
        let req = MessagesRequest::from_value(json!({
            "model": "m1",
            "max_tokens": 10,
            "messages": [{"role": "user", "content": "Hi"}],
            "frequency_penalty": 0.5
        }))
        .unwrap();
        assert_eq!(req.extra.get("frequency_penalty"), Some(&json!(0.5)));
    }

    #[test]
    fn test_tool_result_content_shapes() {
        let block: ContentBlock = serde_json::from_value(json!({
            "type": "tool_result",
            "tool_use_id": "toolu_1",
            "content": [{"type": "text", "text": "42"}]
        }))
        .unwrap();
        match block {
            ContentBlock::ToolResult { content, .. } => {
                assert!(matches!(content, Some(ToolResultContent::Blocks(_))));
            }
            other => panic!("Expected tool_result, got {other:?}"),
        }

        let block: ContentBlock = serde_json::from_value(json!({
            "type": "tool_result",
            "tool_use_id": "toolu_1",
            "content": {"temperature": 21}
        }))
        .unwrap();
        match block {
            ContentBlock::ToolResult { content, .. } => {
                assert_eq!(
                    content,
                    Some(ToolResultContent::Json(json!({"temperature": 21})))
                );
            }
            other => panic!("Expected tool_result, got {other:?}"),
        }
    }

    #[test]
    fn test_system_blocks_join() {
        let system = SystemContent::Blocks(vec![
            SystemBlock::Text {
                text: "Be terse.".to_string(),
            },
            SystemBlock::Text {
                text: "Use metric units.".to_string(),
            },
        ]);
        assert_eq!(system.as_text(), "Be terse.\nUse metric units.");
    }
}
