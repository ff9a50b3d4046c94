//! Type definitions for the [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat).
//!
//! These types represent both the request format (what we send to the provider)
//! and the response format (what the provider sends back).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Request types (what we send TO the provider)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ChatToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Caller fields forwarded by name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set on `tool` messages that carry a failed tool execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub tool_type: String, // always "function"
    pub function: ChatFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFunction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatToolChoice {
    Mode(ChatToolChoiceMode),
    Named(ChatToolChoiceNamed),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatToolChoiceMode {
    Auto,
    Required,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatToolChoiceNamed {
    #[serde(rename = "type")]
    pub choice_type: String, // "function"
    pub function: ChatToolChoiceFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatToolChoiceFunction {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: ChatToolCallFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCallFunction {
    pub name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

// ---------------------------------------------------------------------------
// Response types (what we receive FROM the provider)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default)]
    pub created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u64,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    /// Matched stop string (or stop token id) reported by vLLM-style servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

/// Why the provider stopped generating. Unknown values are kept verbatim so the
/// response translator can report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    FunctionCall,
    StopSequence,
    Other(String),
}

impl From<String> for FinishReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "function_call" => Self::FunctionCall,
            "stop_sequence" => Self::StopSequence,
            _ => Self::Other(s),
        }
    }
}

impl From<FinishReason> for String {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Stop => "stop".to_string(),
            FinishReason::Length => "length".to_string(),
            FinishReason::ToolCalls => "tool_calls".to_string(),
            FinishReason::FunctionCall => "function_call".to_string(),
            FinishReason::StopSequence => "stop_sequence".to_string(),
            FinishReason::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatErrorResponse {
    pub error: ChatError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatError {
    pub message: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub error_type: Option<String>,
    /// Some providers send a number here, others a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ChatMessage {
    pub fn new(role: ChatRole, content: Option<ChatContent>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
            is_error: None,
        }
    }

    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self::new(role, Some(ChatContent::Text(text.into())))
    }
}

impl ChatContent {
    /// Plain-text view, joining parts with `\n`.
    pub fn to_text(&self) -> String {
        match self {
            ChatContent::Text(t) => t.clone(),
            ChatContent::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => text.as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finish_reason_keeps_unknown_values() {
        let reason: FinishReason = serde_json::from_value(json!("content_filter")).unwrap();
        assert_eq!(reason, FinishReason::Other("content_filter".to_string()));
        assert_eq!(serde_json::to_value(reason).unwrap(), json!("content_filter"));

        let reason: FinishReason = serde_json::from_value(json!("tool_calls")).unwrap();
        assert_eq!(reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_tool_choice_encodings() {
        assert_eq!(
            serde_json::to_value(ChatToolChoice::Mode(ChatToolChoiceMode::Required)).unwrap(),
            json!("required")
        );
        let named = ChatToolChoice::Named(ChatToolChoiceNamed {
            choice_type: "function".to_string(),
            function: ChatToolChoiceFunction {
                name: "lookup".to_string(),
            },
        });
        assert_eq!(
            serde_json::to_value(named).unwrap(),
            json!({"type": "function", "function": {"name": "lookup"}})
        );
    }

    #[test]
    fn test_sparse_response_parses() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Hi"}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert!(resp.id.is_none());
        assert!(resp.usage.is_none());
        assert_eq!(resp.choices[0].finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_request_extra_fields_flatten() {
        let mut extra = Map::new();
        extra.insert("frequency_penalty".to_string(), json!(0.2));
        let req = ChatCompletionRequest {
            model: "m1".to_string(),
            messages: vec![ChatMessage::text(ChatRole::User, "Hi")],
            max_completion_tokens: 50,
            temperature: None,
            top_p: None,
            tools: None,
            tool_choice: None,
            stop: None,
            user: None,
            extra,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["frequency_penalty"], json!(0.2));
        assert_eq!(value["max_completion_tokens"], json!(50));
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "Hi"}));
    }
}
