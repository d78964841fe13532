//! Stateful SSE translation from OpenAI stream chunks to Anthropic stream
//! events (§4.5). One [`StreamState`] is confined to a single outbound
//! request/response task and never shared across tasks.

use uuid::Uuid;

use crate::messages::{
    anthropic::{
        AnthropicContentDelta, AnthropicMessageDelta, AnthropicRole, AnthropicStopReason, AnthropicStreamEvent,
        AnthropicStreamMessageStart, AnthropicUsage,
    },
    openai::OpenAiStreamChunk,
};

use crate::translator::translate_finish_reason;

/// Tracks a single open Anthropic content block by its assigned index.
struct BlockSlot {
    anthropic_index: u32,
}

/// Drives the translation of one streamed completion. Assigns Anthropic
/// block indices in order of first appearance, keeps at most one text block
/// open at a time (closing it before any tool block may open), and tracks
/// each parallel `tool_calls[i]` as its own block keyed by OpenAI's index.
pub struct StreamState {
    requested_model: String,
    message_id: String,
    text_block: Option<BlockSlot>,
    /// OpenAI `tool_calls[i].index` -> assigned Anthropic block slot.
    tool_blocks: Vec<(u32, BlockSlot)>,
    next_index: u32,
    started: bool,
    usage: AnthropicUsage,
    stop_reason: Option<AnthropicStopReason>,
}

impl StreamState {
    pub fn new(requested_model: String) -> Self {
        Self {
            requested_model,
            message_id: format!("msg_{}", Uuid::new_v4().simple()),
            text_block: None,
            tool_blocks: Vec::new(),
            next_index: 0,
            started: false,
            usage: AnthropicUsage::default(),
            stop_reason: None,
        }
    }

    fn alloc_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Consumes one OpenAI stream chunk, returning the Anthropic events it
    /// produces in emission order (a single chunk may close a block, open
    /// another, and carry a delta, hence the `Vec`).
    pub fn handle_chunk(&mut self, chunk: OpenAiStreamChunk) -> Vec<AnthropicStreamEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            events.push(AnthropicStreamEvent::MessageStart {
                message: AnthropicStreamMessageStart {
                    id: self.message_id.clone(),
                    message_type: "message".to_string(),
                    role: AnthropicRole::Assistant,
                    content: Vec::new(),
                    model: self.requested_model.clone(),
                    usage: AnthropicUsage::default(),
                },
            });
        }

        if let Some(usage) = chunk.usage {
            self.usage = AnthropicUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            };
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            self.close_tool_blocks(&mut events);
            let index = self.open_text_block(&mut events);
            events.push(AnthropicStreamEvent::ContentBlockDelta {
                index,
                delta: AnthropicContentDelta::TextDelta { text },
            });
        }

        for call in choice.delta.tool_calls.into_iter().flatten() {
            self.close_text_block(&mut events);

            let already_open = self.tool_blocks.iter().any(|(i, _)| *i == call.index);

            if !already_open {
                let index = self.alloc_index();
                let name = call.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_default();
                let id = call.id.clone().unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

                self.tool_blocks.push((
                    call.index,
                    BlockSlot {
                        anthropic_index: index,
                    },
                ));

                events.push(AnthropicStreamEvent::ContentBlockStart {
                    index,
                    content_block: crate::messages::anthropic::AnthropicContent::ToolUse {
                        id,
                        name,
                        input: serde_json::Value::Object(Default::default()),
                    },
                });
            }

            if let Some(arguments) = call.function.and_then(|f| f.arguments).filter(|a| !a.is_empty()) {
                let index = self
                    .tool_blocks
                    .iter()
                    .find(|(i, _)| *i == call.index)
                    .map(|(_, slot)| slot.anthropic_index)
                    .expect("tool block registered above");

                events.push(AnthropicStreamEvent::ContentBlockDelta {
                    index,
                    delta: AnthropicContentDelta::InputJsonDelta {
                        partial_json: arguments,
                    },
                });
            }
        }

        if let Some(reason) = choice.finish_reason.as_deref() {
            self.stop_reason = Some(translate_finish_reason(Some(reason)));
        }

        events
    }

    fn open_text_block(&mut self, events: &mut Vec<AnthropicStreamEvent>) -> u32 {
        if let Some(slot) = &self.text_block {
            return slot.anthropic_index;
        }

        let index = self.alloc_index();
        self.text_block = Some(BlockSlot {
            anthropic_index: index,
        });

        events.push(AnthropicStreamEvent::ContentBlockStart {
            index,
            content_block: crate::messages::anthropic::AnthropicContent::Text { text: String::new() },
        });

        index
    }

    fn close_text_block(&mut self, events: &mut Vec<AnthropicStreamEvent>) {
        if let Some(slot) = self.text_block.take() {
            events.push(AnthropicStreamEvent::ContentBlockStop {
                index: slot.anthropic_index,
            });
        }
    }

    fn close_tool_blocks(&mut self, events: &mut Vec<AnthropicStreamEvent>) {
        for (_, slot) in self.tool_blocks.drain(..) {
            events.push(AnthropicStreamEvent::ContentBlockStop {
                index: slot.anthropic_index,
            });
        }
    }

    /// Finalizes the stream: closes whatever block is still open, then
    /// emits `message_delta` and `message_stop`. The caller appends the
    /// `data: [DONE]` sentinel itself once this returns (§4.5, §6).
    pub fn finish(mut self) -> Vec<AnthropicStreamEvent> {
        let mut events = Vec::new();
        self.close_text_block(&mut events);
        self.close_tool_blocks(&mut events);

        let stop_reason = self.stop_reason.unwrap_or(AnthropicStopReason::EndTurn);

        events.push(AnthropicStreamEvent::MessageDelta {
            delta: AnthropicMessageDelta {
                stop_reason: Some(stop_reason),
                stop_sequence: None,
            },
            usage: self.usage,
        });
        events.push(AnthropicStreamEvent::MessageStop);

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::openai::{OpenAiFunctionCallDelta, OpenAiStreamChoice, OpenAiStreamDelta, OpenAiToolCallDelta};

    fn chunk(delta: OpenAiStreamDelta, finish_reason: Option<&str>) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            model: "gpt-4o-mini".to_string(),
            choices: vec![OpenAiStreamChoice {
                index: 0,
                delta,
                finish_reason: finish_reason.map(str::to_string),
            }],
            usage: None,
        }
    }

    #[test]
    fn text_only_stream_opens_one_block_and_closes_on_finish() {
        let mut state = StreamState::new("claude-3-5-sonnet-20241022".to_string());

        let events = state.handle_chunk(chunk(
            OpenAiStreamDelta {
                content: Some("Hello".to_string()),
                tool_calls: None,
            },
            None,
        ));
        assert!(matches!(events[0], AnthropicStreamEvent::MessageStart { .. }));
        assert!(matches!(events[1], AnthropicStreamEvent::ContentBlockStart { index: 0, .. }));
        assert!(matches!(events[2], AnthropicStreamEvent::ContentBlockDelta { index: 0, .. }));

        let events = state.handle_chunk(chunk(OpenAiStreamDelta::default(), Some("stop")));
        assert!(events.is_empty());

        let events = state.finish();
        assert!(matches!(events[0], AnthropicStreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], AnthropicStreamEvent::MessageDelta { .. }));
        assert!(matches!(events[2], AnthropicStreamEvent::MessageStop));
    }

    #[test]
    fn parallel_tool_calls_open_distinct_blocks_keyed_by_openai_index() {
        let mut state = StreamState::new("claude-3-5-sonnet-20241022".to_string());

        let events = state.handle_chunk(chunk(
            OpenAiStreamDelta {
                content: None,
                tool_calls: Some(vec![
                    OpenAiToolCallDelta {
                        index: 0,
                        id: Some("call_a".to_string()),
                        function: Some(OpenAiFunctionCallDelta {
                            name: Some("get_weather".to_string()),
                            arguments: Some(String::new()),
                        }),
                    },
                    OpenAiToolCallDelta {
                        index: 1,
                        id: Some("call_b".to_string()),
                        function: Some(OpenAiFunctionCallDelta {
                            name: Some("get_time".to_string()),
                            arguments: Some(String::new()),
                        }),
                    },
                ]),
            },
            None,
        ));

        let starts: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AnthropicStreamEvent::ContentBlockStart { .. }))
            .collect();
        assert_eq!(starts.len(), 2);

        let events = state.handle_chunk(chunk(
            OpenAiStreamDelta {
                content: None,
                tool_calls: Some(vec![OpenAiToolCallDelta {
                    index: 1,
                    id: None,
                    function: Some(OpenAiFunctionCallDelta {
                        name: None,
                        arguments: Some(r#"{"tz":"UTC"}"#.to_string()),
                    }),
                }]),
            },
            Some("tool_calls"),
        ));
        assert!(matches!(events[0], AnthropicStreamEvent::ContentBlockDelta { index: 1, .. }));

        let events = state.finish();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, AnthropicStreamEvent::ContentBlockStop { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn text_block_closes_before_tool_block_opens() {
        let mut state = StreamState::new("claude-3-5-sonnet-20241022".to_string());

        state.handle_chunk(chunk(
            OpenAiStreamDelta {
                content: Some("thinking...".to_string()),
                tool_calls: None,
            },
            None,
        ));

        let events = state.handle_chunk(chunk(
            OpenAiStreamDelta {
                content: None,
                tool_calls: Some(vec![OpenAiToolCallDelta {
                    index: 0,
                    id: Some("call_a".to_string()),
                    function: Some(OpenAiFunctionCallDelta {
                        name: Some("get_weather".to_string()),
                        arguments: Some(String::new()),
                    }),
                }]),
            },
            None,
        ));

        assert!(matches!(events[0], AnthropicStreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], AnthropicStreamEvent::ContentBlockStart { index: 1, .. }));
    }
}
