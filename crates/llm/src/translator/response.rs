//! OpenAI response -> Anthropic response translation (§4.4).

use uuid::Uuid;

use crate::messages::{
    anthropic::{AnthropicChatResponse, AnthropicContent, AnthropicRole, AnthropicStopReason, AnthropicUsage},
    openai::OpenAiChatResponse,
};

/// Maps an OpenAI `finish_reason` to the Anthropic `stop_reason` it implies.
/// `content_filter` has no Anthropic equivalent in this proxy's scope, so it
/// is folded into `end_turn` rather than invented as a new variant (§9 open
/// question, resolved: keep as specified).
pub fn translate_finish_reason(reason: Option<&str>) -> AnthropicStopReason {
    match reason {
        Some("length") => AnthropicStopReason::MaxTokens,
        Some("tool_calls") => AnthropicStopReason::ToolUse,
        Some("stop") => AnthropicStopReason::EndTurn,
        Some("content_filter") => AnthropicStopReason::EndTurn,
        _ => AnthropicStopReason::EndTurn,
    }
}

/// Translates a non-streaming OpenAI chat completion into an Anthropic
/// message response for the model name the caller originally requested.
pub fn translate_response(response: &OpenAiChatResponse, requested_model: &str) -> AnthropicChatResponse {
    let choice = response.choices.first();

    let mut content = Vec::new();

    if let Some(text) = choice.and_then(|c| c.message.content.clone()).filter(|t| !t.is_empty()) {
        content.push(AnthropicContent::Text { text });
    }

    for call in choice.and_then(|c| c.message.tool_calls.clone()).into_iter().flatten() {
        let input = serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::Null);

        content.push(AnthropicContent::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    AnthropicChatResponse {
        id: format!("msg_{}", Uuid::new_v4().simple()),
        r#type: "message".to_string(),
        role: AnthropicRole::Assistant,
        content,
        model: requested_model.to_string(),
        stop_reason: Some(translate_finish_reason(choice.and_then(|c| c.finish_reason.as_deref()))),
        stop_sequence: None,
        usage: AnthropicUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::openai::{OpenAiChoice, OpenAiResponseMessage, OpenAiUsage};

    #[test]
    fn translates_plain_text_response() {
        let response = OpenAiChatResponse {
            id: "chatcmpl-1".to_string(),
            model: "gpt-4o-mini".to_string(),
            choices: vec![OpenAiChoice {
                index: 0,
                message: OpenAiResponseMessage {
                    content: Some("Hi there".to_string()),
                    tool_calls: None,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: OpenAiUsage {
                prompt_tokens: 10,
                completion_tokens: 3,
            },
        };

        let translated = translate_response(&response, "claude-3-5-sonnet-20241022");
        assert_eq!(translated.model, "claude-3-5-sonnet-20241022");
        assert_eq!(translated.stop_reason, Some(AnthropicStopReason::EndTurn));
        assert!(matches!(&translated.content[0], AnthropicContent::Text { text } if text == "Hi there"));
    }

    #[test]
    fn content_filter_maps_to_end_turn() {
        assert_eq!(translate_finish_reason(Some("content_filter")), AnthropicStopReason::EndTurn);
    }

    #[test]
    fn tool_calls_finish_reason_maps_to_tool_use() {
        assert_eq!(translate_finish_reason(Some("tool_calls")), AnthropicStopReason::ToolUse);
    }
}
