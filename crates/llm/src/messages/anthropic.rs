use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the Anthropic Messages API.
///
/// This struct represents the request format for creating messages with Claude
/// models as documented in the [Anthropic API Reference](https://docs.anthropic.com/en/api/messages).
/// The format differs from OpenAI's format in several key ways:
/// - Messages have a different structure with content arrays
/// - System messages are separate from the messages array
/// - Tool use has a different format (tool_use/tool_result vs function calls)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicChatRequest {
    /// The model to use for the completion.
    pub model: String,

    /// The messages to send to the model.
    ///
    /// Messages alternate between "user" and "assistant" roles.
    pub messages: Vec<AnthropicMessage>,

    /// Maximum number of tokens to generate. Required for the Anthropic API.
    pub max_tokens: u32,

    /// System prompt to set context for the assistant, as a plain string or a
    /// list of content blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<AnthropicSystem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Sequences that will cause the model to stop generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Whether to stream the response as Server-Sent Events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnthropicMetadata>,

    /// Tools available for the model to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,

    /// Controls how the model uses tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<AnthropicToolChoice>,
}

/// System prompt, accepted either as a plain string or as a list of content
/// blocks (only text blocks are meaningful for translation purposes; other
/// kinds are flattened away).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnthropicSystem {
    Text(String),
    Blocks(Vec<AnthropicContent>),
}

impl AnthropicSystem {
    /// Flattens to a single string, concatenating text blocks in order.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    AnthropicContent::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// An Anthropic message with role and content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicMessage {
    pub role: AnthropicRole,

    /// A plain string, or a list of typed content blocks.
    pub content: AnthropicMessageContent,
}

/// Message content, accepted as a bare string or a list of blocks (§3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnthropicMessageContent {
    Text(String),
    Blocks(Vec<AnthropicContent>),
}

impl AnthropicMessageContent {
    /// Normalizes to a block list, wrapping a bare string as a single text block.
    pub fn into_blocks(self) -> Vec<AnthropicContent> {
        match self {
            Self::Text(text) => vec![AnthropicContent::Text { text }],
            Self::Blocks(blocks) => blocks,
        }
    }
}

/// Role of a message sender in Anthropic's API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnthropicRole {
    User,
    Assistant,
}

/// Content block in an Anthropic message.
///
/// Anthropic uses content arrays to support multi-modal messages. Each block
/// is discriminated by `type`; unknown discriminators are a translation error
/// rather than a silently-dropped block (§4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image { source: AnthropicImageSource },

    /// Tool use request from the assistant.
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },

    /// Result from a tool execution, referencing the `tool_use` block that
    /// requested it by id (§3 invariant).
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: AnthropicToolResultBody,
        #[serde(default)]
        is_error: bool,
    },
}

/// `tool_result.content` may be a plain string or a list of typed blocks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnthropicToolResultBody {
    #[default]
    Empty,
    Text(String),
    Blocks(Vec<AnthropicToolResultContent>),
}

impl AnthropicToolResultBody {
    /// Flattens to the text OpenAI's `tool` message content expects.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    AnthropicToolResultContent::Text { text } => text.as_str(),
                    AnthropicToolResultContent::Error { error } => error.as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum AnthropicToolResultContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "error")]
    Error { error: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Tool definition in Anthropic format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
    /// Present on the Claude Code / computer-use built-in tool families (§4.3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Tool choice configuration (§4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicToolChoice {
    /// Forbid tool use entirely.
    None,
    /// Let the model decide whether to use tools.
    Auto,
    /// Force the model to use any available tool.
    Any,
    /// Force the model to use a specific named tool.
    Tool { name: String },
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicChatResponse {
    pub id: String,
    pub r#type: String,
    pub role: AnthropicRole,
    pub content: Vec<AnthropicContent>,
    pub model: String,
    pub stop_reason: Option<AnthropicStopReason>,
    pub stop_sequence: Option<String>,
    pub usage: AnthropicUsage,
}

/// The reason the model stopped generating tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AnthropicStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

impl fmt::Display for AnthropicStopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnthropicStopReason::EndTurn => write!(f, "end_turn"),
            AnthropicStopReason::MaxTokens => write!(f, "max_tokens"),
            AnthropicStopReason::StopSequence => write!(f, "stop_sequence"),
            AnthropicStopReason::ToolUse => write!(f, "tool_use"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    pub input_tokens: i32,
    pub output_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicModel {
    pub id: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub display_name: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicModelsResponse {
    pub data: Vec<AnthropicModel>,
    pub has_more: bool,
}

/// Streaming event types for Anthropic SSE responses (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicStreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: AnthropicStreamMessageStart },

    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: u32,
        content_block: AnthropicContent,
    },

    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: AnthropicContentDelta },

    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: u32 },

    #[serde(rename = "message_delta")]
    MessageDelta {
        delta: AnthropicMessageDelta,
        usage: AnthropicUsage,
    },

    #[serde(rename = "message_stop")]
    MessageStop,

    #[serde(rename = "ping")]
    Ping,

    #[serde(rename = "error")]
    Error { error: AnthropicErrorDetails },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicErrorDetails {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicStreamMessageStart {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub role: AnthropicRole,
    pub content: Vec<AnthropicContent>,
    pub model: String,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContentDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },

    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessageDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<AnthropicStopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_string_system_and_content() {
        let json = json!({
            "model": "claude-3-haiku-20240307",
            "max_tokens": 50,
            "system": "Be terse.",
            "messages": [{"role": "user", "content": "Say hi"}],
        });

        let request: AnthropicChatRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.system.unwrap().as_text(), "Be terse.");
        assert_eq!(request.messages[0].content.clone().into_blocks().len(), 1);
    }

    #[test]
    fn deserializes_block_content() {
        let json = json!({
            "model": "claude-3-opus-20240229",
            "max_tokens": 10,
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": "hello"}],
            }],
        });

        let request: AnthropicChatRequest = serde_json::from_value(json).unwrap();
        let blocks = request.messages[0].content.clone().into_blocks();
        assert!(matches!(&blocks[0], AnthropicContent::Text { text } if text == "hello"));
    }

    #[test]
    fn tool_choice_none_round_trips() {
        let json = serde_json::to_value(AnthropicToolChoice::None).unwrap();
        assert_eq!(json["type"], "none");
    }

    #[test]
    fn tool_result_accepts_plain_string_content() {
        let json = json!({"type": "tool_result", "tool_use_id": "t1", "content": "72F"});
        let block: AnthropicContent = serde_json::from_value(json).unwrap();
        let AnthropicContent::ToolResult { content, .. } = block else {
            unreachable!("expected tool_result");
        };
        assert_eq!(content.as_text(), "72F");
    }

    #[test]
    fn serialize_streaming_events() {
        let event = AnthropicStreamEvent::ContentBlockDelta {
            index: 0,
            delta: AnthropicContentDelta::TextDelta {
                text: "Hello".to_string(),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "content_block_delta");
        assert_eq!(json["delta"]["type"], "text_delta");
    }
}
