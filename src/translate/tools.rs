//! Tool and function-calling conversion shared by the request and response translators.
//!
//! Tool schemas and tool inputs are copied as opaque JSON. The only structural
//! difference between the two conventions is that invocation arguments are an
//! object on the Messages side and a JSON-encoded string on the ChatCompletions side.

use serde_json::Value;

use super::anthropic_types::{ContentBlock, ResponseContentBlock, Tool, ToolChoice, ToolResultContent};
use super::openai_types::{
    ChatContent, ChatFunction, ChatMessage, ChatRole, ChatTool, ChatToolCall, ChatToolCallFunction,
    ChatToolChoice, ChatToolChoiceFunction, ChatToolChoiceMode, ChatToolChoiceNamed, ContentPart,
};
use crate::error::{BridgeError, Result};

const FUNCTION_TYPE: &str = "function";

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

pub fn tool_defs_to_openai(tools: &[Tool]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|t| ChatTool {
            tool_type: FUNCTION_TYPE.to_string(),
            function: ChatFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// # Errors
/// Returns `Conversion` for a tool whose type is not `function`.
pub fn tool_defs_from_openai(tools: &[ChatTool]) -> Result<Vec<Tool>> {
    tools
        .iter()
        .map(|t| {
            if t.tool_type != FUNCTION_TYPE {
                return Err(BridgeError::conversion(format!(
                    "unsupported tool type `{}` for `{}`",
                    t.tool_type, t.function.name
                )));
            }
            Ok(Tool {
                name: t.function.name.clone(),
                description: t.function.description.clone(),
                input_schema: t.function.parameters.clone(),
            })
        })
        .collect()
}

pub fn tool_choice_to_openai(choice: &ToolChoice) -> ChatToolChoice {
    match choice {
        ToolChoice::Auto => ChatToolChoice::Mode(ChatToolChoiceMode::Auto),
        ToolChoice::Any => ChatToolChoice::Mode(ChatToolChoiceMode::Required),
        ToolChoice::None => ChatToolChoice::Mode(ChatToolChoiceMode::None),
        ToolChoice::Tool { name } => ChatToolChoice::Named(ChatToolChoiceNamed {
            choice_type: FUNCTION_TYPE.to_string(),
            function: ChatToolChoiceFunction { name: name.clone() },
        }),
    }
}

// ---------------------------------------------------------------------------
// Invocation arguments
// ---------------------------------------------------------------------------

/// Serialize a structured argument payload into the string form.
pub fn encode_arguments(input: &Value) -> Result<String> {
    Ok(serde_json::to_string(input)?)
}

/// Parse the string form back into structured data.
///
/// An empty or all-whitespace string decodes to `{}`; some providers send
/// that for zero-argument calls.
///
/// # Errors
/// Returns `Conversion` when the text is not valid JSON.
pub fn decode_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| {
        BridgeError::conversion(format!("tool arguments are not valid JSON ({e}): {raw}"))
    })
}

// ---------------------------------------------------------------------------
// Invocations
// ---------------------------------------------------------------------------

pub fn tool_call_to_openai(id: &str, name: &str, input: &Value) -> Result<ChatToolCall> {
    Ok(ChatToolCall {
        id: id.to_string(),
        call_type: FUNCTION_TYPE.to_string(),
        function: ChatToolCallFunction {
            name: name.to_string(),
            arguments: encode_arguments(input)?,
        },
    })
}

/// # Errors
/// Returns `Conversion` for a non-function call, unparseable arguments, or
/// arguments that are not a JSON object.
pub fn tool_call_from_openai(call: &ChatToolCall) -> Result<ResponseContentBlock> {
    if call.call_type != FUNCTION_TYPE {
        return Err(BridgeError::conversion(format!(
            "unsupported tool call type `{}`",
            call.call_type
        )));
    }

    let input = decode_arguments(&call.function.arguments)?;
    if !input.is_object() {
        return Err(BridgeError::conversion(format!(
            "arguments for `{}` must be a JSON object, got {input}",
            call.function.name
        )));
    }

    let id = if call.id.is_empty() {
        generate_tool_use_id()
    } else {
        call.id.clone()
    };

    Ok(ResponseContentBlock::ToolUse {
        id,
        name: call.function.name.clone(),
        input,
    })
}

pub fn generate_tool_use_id() -> String {
    format!("toolu_{}", uuid::Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Build the `tool`-role message answering `tool_use_id`. The id is carried as-is.
pub fn tool_result_to_openai(
    tool_use_id: &str,
    content: Option<&ToolResultContent>,
    is_error: Option<bool>,
) -> Result<ChatMessage> {
    let content = match content {
        None => ChatContent::Text(String::new()),
        Some(ToolResultContent::Text(t)) => ChatContent::Text(t.clone()),
        Some(ToolResultContent::Blocks(blocks)) => match text_parts(blocks) {
            Some(parts) => ChatContent::Parts(parts),
            None => ChatContent::Text(serde_json::to_string(blocks)?),
        },
        Some(ToolResultContent::Json(value)) => ChatContent::Text(serde_json::to_string(value)?),
    };

    let mut msg = ChatMessage::new(ChatRole::Tool, Some(content));
    msg.tool_call_id = Some(tool_use_id.to_string());
    msg.is_error = is_error.filter(|e| *e);
    Ok(msg)
}

/// # Errors
/// Returns `Conversion` if the message is not a `tool` message with a call id.
pub fn tool_result_from_openai(msg: &ChatMessage) -> Result<ContentBlock> {
    if msg.role != ChatRole::Tool {
        return Err(BridgeError::conversion(format!(
            "expected a tool message, got role {:?}",
            msg.role
        )));
    }
    let tool_use_id = msg
        .tool_call_id
        .clone()
        .ok_or_else(|| BridgeError::conversion("tool message is missing `tool_call_id`"))?;

    let content = msg.content.as_ref().map(|c| match c {
        ChatContent::Text(t) => ToolResultContent::Text(t.clone()),
        ChatContent::Parts(parts) => ToolResultContent::Blocks(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
                })
                .collect(),
        ),
    });

    Ok(ContentBlock::ToolResult {
        tool_use_id,
        content,
        is_error: msg.is_error,
    })
}

/// `Some` only when every block is text.
fn text_parts(blocks: &[ContentBlock]) -> Option<Vec<ContentPart>> {
    blocks
        .iter()
        .map(|b| match b {
            ContentBlock::Text { text } => Some(ContentPart::Text { text: text.clone() }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_tool() -> Tool {
        Tool {
            name: "get_weather".to_string(),
            description: Some("Get current weather for a city".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        }
    }

    #[test]
    fn test_tool_defs_copy_schema_opaquely() {
        let tool = weather_tool();
        let converted = tool_defs_to_openai(std::slice::from_ref(&tool));

        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].tool_type, "function");
        assert_eq!(converted[0].function.name, "get_weather");
        assert_eq!(converted[0].function.parameters, tool.input_schema);

        let back = tool_defs_from_openai(&converted).unwrap();
        assert_eq!(back, vec![tool]);
    }

    #[test]
    fn test_tool_defs_from_openai_rejects_other_types() {
        let mut converted = tool_defs_to_openai(&[weather_tool()]);
        converted[0].tool_type = "code_interpreter".to_string();
        assert!(tool_defs_from_openai(&converted).unwrap_err().is_conversion());
    }

    #[test]
    fn test_tool_choice_table() {
        assert_eq!(
            tool_choice_to_openai(&ToolChoice::Auto),
            ChatToolChoice::Mode(ChatToolChoiceMode::Auto)
        );
        assert_eq!(
            tool_choice_to_openai(&ToolChoice::Any),
            ChatToolChoice::Mode(ChatToolChoiceMode::Required)
        );
        assert_eq!(
            tool_choice_to_openai(&ToolChoice::None),
            ChatToolChoice::Mode(ChatToolChoiceMode::None)
        );
        match tool_choice_to_openai(&ToolChoice::Tool {
            name: "lookup".to_string(),
        }) {
            ChatToolChoice::Named(named) => {
                assert_eq!(named.choice_type, "function");
                assert_eq!(named.function.name, "lookup");
            }
            other => panic!("Expected a forced function call, got {other:?}"),
        }
    }

    #[test]
    fn test_arguments_survive_encoding() {
        let payloads = [
            json!({"id": 42}),
            json!({"nested": {"list": [1, 2.5, "three", null, true]}, "empty": {}}),
            json!([1, 2, 3]),
            json!("plain"),
            json!(3.25),
            json!(false),
            json!(null),
        ];
        for payload in payloads {
            let encoded = encode_arguments(&payload).unwrap();
            assert_eq!(decode_arguments(&encoded).unwrap(), payload);
        }
    }

    #[test]
    fn test_malformed_arguments_are_conversion_errors() {
        for raw in ["{\"id\": 42", "not json", "{'id': 42}", "{\"a\":}"] {
            let err = decode_arguments(raw).unwrap_err();
            assert!(err.is_conversion(), "{raw} gave {err}");
        }
    }

    #[test]
    fn test_empty_arguments_decode_to_empty_object() {
        assert_eq!(decode_arguments("").unwrap(), json!({}));
        assert_eq!(decode_arguments("  ").unwrap(), json!({}));
    }

    #[test]
    fn test_tool_call_from_openai() {
        let call = ChatToolCall {
            id: "call_abc".to_string(),
            call_type: "function".to_string(),
            function: ChatToolCallFunction {
                name: "lookup".to_string(),
                arguments: "{\"id\":42}".to_string(),
            },
        };
        assert_eq!(
            tool_call_from_openai(&call).unwrap(),
            ResponseContentBlock::ToolUse {
                id: "call_abc".to_string(),
                name: "lookup".to_string(),
                input: json!({"id": 42}),
            }
        );
    }

    #[test]
    fn test_tool_call_from_openai_failures() {
        let mut call = tool_call_to_openai("call_1", "lookup", &json!({"id": 1})).unwrap();
        call.function.arguments = "{\"id\":".to_string();
        assert!(tool_call_from_openai(&call).unwrap_err().is_conversion());

        call.function.arguments = "[1, 2]".to_string();
        assert!(tool_call_from_openai(&call).unwrap_err().is_conversion());

        call.function.arguments = "{}".to_string();
        call.call_type = "custom".to_string();
        assert!(tool_call_from_openai(&call).unwrap_err().is_conversion());
    }

    #[test]
    fn test_missing_call_id_is_generated() {
        let call = tool_call_to_openai("", "lookup", &json!({})).unwrap();
        match tool_call_from_openai(&call).unwrap() {
            ResponseContentBlock::ToolUse { id, .. } => assert!(id.starts_with("toolu_")),
            other => panic!("Expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_result_keeps_id_and_error_flag() {
        let msg = tool_result_to_openai(
            "toolu_01XYZ",
            Some(&ToolResultContent::Text("city not found".to_string())),
            Some(true),
        )
        .unwrap();

        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("toolu_01XYZ"));
        assert_eq!(msg.is_error, Some(true));
        assert_eq!(msg.content, Some(ChatContent::Text("city not found".to_string())));

        let ok = tool_result_to_openai("toolu_2", None, Some(false)).unwrap();
        assert_eq!(ok.is_error, None);
    }

    #[test]
    fn test_tool_result_structured_payloads() {
        let blocks = ToolResultContent::Blocks(vec![
            ContentBlock::Text {
                text: "line 1".to_string(),
            },
            ContentBlock::Text {
                text: "line 2".to_string(),
            },
        ]);
        let msg = tool_result_to_openai("toolu_1", Some(&blocks), None).unwrap();
        assert_eq!(
            msg.content,
            Some(ChatContent::Parts(vec![
                ContentPart::Text {
                    text: "line 1".to_string()
                },
                ContentPart::Text {
                    text: "line 2".to_string()
                },
            ]))
        );

        let json_payload = ToolResultContent::Json(json!({"temp": 21}));
        let msg = tool_result_to_openai("toolu_1", Some(&json_payload), None).unwrap();
        let text = msg.content.unwrap().to_text();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"temp": 21}));
    }

    #[test]
    fn test_tool_result_round_trip() {
        let msg = tool_result_to_openai(
            "call_mismatched",
            Some(&ToolResultContent::Text("done".to_string())),
            Some(true),
        )
        .unwrap();
        assert_eq!(
            tool_result_from_openai(&msg).unwrap(),
            ContentBlock::ToolResult {
                tool_use_id: "call_mismatched".to_string(),
                content: Some(ToolResultContent::Text("done".to_string())),
                is_error: Some(true),
            }
        );

        let user = ChatMessage::text(ChatRole::User, "hi");
        assert!(tool_result_from_openai(&user).unwrap_err().is_conversion());
    }
}
