//! Demonstrate using the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example translate_only`

use messages_bridge::translate::anthropic_types::{
    ContentBlock, Message, MessagesRequest, Role, SystemContent, Tool, ToolChoice,
};
use messages_bridge::translate::openai_types::{
    ChatCompletionResponse, ChatToolCall, ChatToolCallFunction, ChatUsage, Choice, ChoiceMessage,
    FinishReason,
};
use messages_bridge::translate::{translate_request, translate_response};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let mut req = MessagesRequest::new(
        "my-model",
        1024,
        vec![
            Message::user("What is the weather in Paris?"),
            Message::blocks(
                Role::Assistant,
                vec![
                    ContentBlock::Text {
                        text: "Let me check.".to_string(),
                    },
                    ContentBlock::ToolUse {
                        id: "toolu_demo".to_string(),
                        name: "get_weather".to_string(),
                        input: json!({"city": "Paris"}),
                    },
                ],
            ),
            Message::blocks(
                Role::User,
                vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_demo".to_string(),
                    content: None,
                    is_error: Some(true),
                }],
            ),
        ],
    );
    req.system = Some(SystemContent::Text("You are a weather assistant.".to_string()));
    req.tools = Some(vec![Tool {
        name: "get_weather".to_string(),
        description: Some("Current weather for a city".to_string()),
        input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    }]);
    req.tool_choice = Some(ToolChoice::Auto);

    let chat_req = translate_request(&req)?;
    println!("=== Translated request (Chat Completions) ===");
    println!("{}", serde_json::to_string_pretty(&chat_req)?);

    // A provider reply asking for the tool again
    let chat_resp = ChatCompletionResponse {
        id: Some("chatcmpl-demo".to_string()),
        object: Some("chat.completion".to_string()),
        created: 0,
        model: Some("provider-model-2024".to_string()),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: Some("assistant".to_string()),
                content: Some("Retrying.".to_string()),
                tool_calls: Some(vec![ChatToolCall {
                    id: "call_demo".to_string(),
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: "get_weather".to_string(),
                        arguments: r#"{"city":"Paris"}"#.to_string(),
                    },
                }]),
            },
            finish_reason: Some(FinishReason::ToolCalls),
            stop_reason: None,
        }],
        usage: Some(ChatUsage {
            prompt_tokens: 42,
            completion_tokens: 9,
            total_tokens: 51,
            prompt_tokens_details: None,
        }),
    };

    let resp = translate_response(&chat_resp, &req.model)?;
    println!("\n=== Translated response (Messages) ===");
    println!("{}", serde_json::to_string_pretty(&resp)?);

    Ok(())
}
