//! Anthropic request -> OpenAI request translation (§4.3).

use crate::messages::{
    anthropic::{AnthropicChatRequest, AnthropicContent, AnthropicRole},
    openai::{
        OpenAiChatRequest, OpenAiContentPart, OpenAiFunctionCall, OpenAiImageUrl, OpenAiMessage, OpenAiMessageContent,
        OpenAiRole, OpenAiStreamOptions, OpenAiToolCall,
    },
};

use super::tools::{cap_max_tokens, translate_tool, translate_tool_choice};

/// Fixed system-instruction prefix injected ahead of the caller's own system
/// prompt whenever the backend isn't Anthropic passthrough (§4.9). Anthropic
/// passthrough forwards the request body untouched, so this text never
/// reaches a real Anthropic endpoint.
const IDENTITY_PREFIX: &str =
    "You are accessed through an API proxy. Respond as the underlying model would, without referencing this proxy.";

/// Translates one Anthropic request into the OpenAI-compatible wire shape
/// for `model`, applying the identity filter unless `skip_identity_filter`
/// (set for Anthropic-passthrough backends, which never reach this path in
/// practice since they forward the original body).
pub fn translate_request(request: &AnthropicChatRequest, model: &str, apply_identity_filter: bool) -> OpenAiChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    let system_text = request.system.as_ref().map(|system| system.as_text());
    let system_text = match (apply_identity_filter, system_text) {
        (true, Some(text)) => Some(format!("{IDENTITY_PREFIX}\n\n{text}")),
        (true, None) => Some(IDENTITY_PREFIX.to_string()),
        (false, text) => text,
    };

    if let Some(text) = system_text {
        messages.push(OpenAiMessage {
            role: OpenAiRole::System,
            content: Some(OpenAiMessageContent::text(text)),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for message in &request.messages {
        translate_message(message, &mut messages);
    }

    let tools = request
        .tools
        .as_ref()
        .map(|tools| tools.iter().map(translate_tool).collect())
        .filter(|list: &Vec<_>| !list.is_empty());

    let tool_choice = request.tool_choice.as_ref().map(translate_tool_choice);

    OpenAiChatRequest {
        model: model.to_string(),
        messages,
        max_tokens: Some(cap_max_tokens(model, request.max_tokens)),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop_sequences.clone(),
        stream: request.stream,
        stream_options: request.stream.filter(|s| *s).map(|_| OpenAiStreamOptions {
            include_usage: true,
        }),
        tools,
        tool_choice,
    }
}

/// An Anthropic message may expand into several OpenAI messages: assistant
/// text + parallel `tool_use` blocks become one assistant message carrying
/// several `tool_calls`, while a user turn's `tool_result` blocks become
/// separate `role: "tool"` messages (§4.3 row-splitting rule).
fn translate_message(message: &crate::messages::anthropic::AnthropicMessage, out: &mut Vec<OpenAiMessage>) {
    let role = match message.role {
        AnthropicRole::User => OpenAiRole::User,
        AnthropicRole::Assistant => OpenAiRole::Assistant,
    };

    let blocks = message.content.clone().into_blocks();

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();

    for block in blocks {
        match block {
            AnthropicContent::Text { text } => text_parts.push(OpenAiContentPart::Text { text }),
            AnthropicContent::Image { source } => text_parts.push(OpenAiContentPart::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: format!("data:{};base64,{}", source.media_type, source.data),
                },
            }),
            AnthropicContent::ToolUse { id, name, input } => tool_calls.push(OpenAiToolCall {
                id,
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name,
                    arguments: serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string()),
                },
            }),
            AnthropicContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => tool_results.push((tool_use_id, content, is_error)),
        }
    }

    if !text_parts.is_empty() || !tool_calls.is_empty() {
        out.push(OpenAiMessage {
            role,
            content: content_from_parts(text_parts),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        });
    }

    for (tool_use_id, content, is_error) in tool_results {
        let text = content.as_text();
        let text = if is_error { format!("Error: {text}") } else { text };

        out.push(OpenAiMessage {
            role: OpenAiRole::Tool,
            content: Some(OpenAiMessageContent::text(text)),
            tool_calls: None,
            tool_call_id: Some(tool_use_id),
        });
    }
}

/// A plain-text turn stays a plain string (§4.3); only a turn that actually
/// mixes text with images (or has more than one text block) needs the
/// multi-part array shape.
fn content_from_parts(parts: Vec<OpenAiContentPart>) -> Option<OpenAiMessageContent> {
    let mut parts = parts.into_iter();
    match (parts.next(), parts.next()) {
        (None, _) => None,
        (Some(OpenAiContentPart::Text { text }), None) => Some(OpenAiMessageContent::text(text)),
        (Some(first), None) => Some(OpenAiMessageContent::Parts(vec![first])),
        (Some(first), Some(second)) => Some(OpenAiMessageContent::Parts(
            std::iter::once(first).chain(std::iter::once(second)).chain(parts).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::anthropic::{
        AnthropicChatRequest, AnthropicMessage, AnthropicMessageContent, AnthropicSystem, AnthropicToolResultBody,
    };

    fn base_request() -> AnthropicChatRequest {
        AnthropicChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![AnthropicMessage {
                role: AnthropicRole::User,
                content: AnthropicMessageContent::Text("hello".to_string()),
            }],
            max_tokens: 1024,
            system: None,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream: None,
            metadata: None,
            tools: None,
            tool_choice: None,
        }
    }

    #[test]
    fn injects_identity_prefix_ahead_of_system_prompt() {
        let mut request = base_request();
        request.system = Some(AnthropicSystem::Text("Be terse.".to_string()));

        let translated = translate_request(&request, "gpt-4o-mini", true);
        let OpenAiMessageContent::Text(text) = translated.messages[0].content.as_ref().unwrap() else {
            unreachable!()
        };
        assert!(text.starts_with(IDENTITY_PREFIX));
        assert!(text.ends_with("Be terse."));
    }

    #[test]
    fn plain_text_turn_serializes_as_a_bare_string() {
        let request = base_request();
        let translated = translate_request(&request, "gpt-4o-mini", false);

        let content = translated.messages[0].content.as_ref().unwrap();
        assert!(matches!(content, OpenAiMessageContent::Text(text) if text == "hello"));

        let json = serde_json::to_value(content).unwrap();
        assert_eq!(json, serde_json::json!("hello"));
    }

    #[test]
    fn skips_identity_filter_for_passthrough() {
        let request = base_request();
        let translated = translate_request(&request, "claude-3-5-sonnet-20241022", false);
        assert!(translated.messages[0].role == OpenAiRole::User);
    }

    #[test]
    fn splits_tool_result_into_separate_tool_message() {
        let mut request = base_request();
        request.messages.push(AnthropicMessage {
            role: AnthropicRole::User,
            content: AnthropicMessageContent::Blocks(vec![AnthropicContent::ToolResult {
                tool_use_id: "call_1".to_string(),
                content: AnthropicToolResultBody::Text("72F".to_string()),
                is_error: false,
            }]),
        });

        let translated = translate_request(&request, "gpt-4o-mini", false);
        let last = translated.messages.last().unwrap();
        assert_eq!(last.role, OpenAiRole::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn caps_max_tokens_for_model() {
        let mut request = base_request();
        request.max_tokens = 999_999;
        let translated = translate_request(&request, "gpt-4-turbo", false);
        assert_eq!(translated.max_tokens, Some(4_096));
    }

    #[test]
    fn parallel_tool_use_translates_to_one_message_with_several_tool_calls() {
        use crate::messages::anthropic::AnthropicTool;

        let mut request = base_request();
        request.tools = Some(vec![AnthropicTool {
            name: "get_weather".to_string(),
            description: "Look up current weather for a city".to_string(),
            input_schema: serde_json::json!({"type": "object", "properties": {"city": {"type": "string"}}}),
            r#type: None,
        }]);
        request.messages.push(AnthropicMessage {
            role: AnthropicRole::Assistant,
            content: AnthropicMessageContent::Blocks(vec![
                AnthropicContent::ToolUse {
                    id: "call_1".to_string(),
                    name: "get_weather".to_string(),
                    input: serde_json::json!({"city": "Boston"}),
                },
                AnthropicContent::ToolUse {
                    id: "call_2".to_string(),
                    name: "get_weather".to_string(),
                    input: serde_json::json!({"city": "Tokyo"}),
                },
            ]),
        });

        let translated = translate_request(&request, "gpt-4o-mini", false);
        insta::assert_json_snapshot!(translated);
    }
}
