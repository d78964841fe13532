//! Tool-shape rules shared by the request translator (§4.3).

use serde_json::{Map, Value, json};

use crate::messages::{
    anthropic::{AnthropicTool, AnthropicToolChoice},
    openai::{OpenAiFunctionDef, OpenAiTool},
};

/// Computer-use tool type rewrites: Anthropic's `type` field names a
/// different tool family name than the one the backend function expects.
fn rewrite_computer_use_type(tool_type: &str) -> &str {
    match tool_type {
        "computer" => "computer",
        "text_editor" => "str_replace_editor",
        "bash" => "bash",
        other => other,
    }
}

/// Canonical parameter schema for one of the three computer-use tool
/// families (§4.3). The client's own `input_schema` is ignored here: these
/// tools are specified by `type`, not by the schema sent alongside it.
fn computer_use_parameters(tool_type: &str) -> Value {
    match tool_type {
        "computer" => json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "key", "type", "mouse_move", "left_click", "left_click_drag",
                        "right_click", "middle_click", "double_click", "screenshot",
                        "cursor_position"
                    ]
                },
                "coordinate": { "type": "array", "items": { "type": "integer" } },
                "text": { "type": "string" }
            },
            "required": ["action"]
        }),
        "text_editor" => json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["view", "create", "str_replace", "insert", "undo_edit"]
                },
                "path": { "type": "string" },
                "file_text": { "type": "string" },
                "old_str": { "type": "string" },
                "new_str": { "type": "string" },
                "insert_line": { "type": "integer" },
                "view_range": { "type": "array", "items": { "type": "integer" } }
            },
            "required": ["command", "path"]
        }),
        "bash" => json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "restart": { "type": "boolean" }
            },
            "required": []
        }),
        _ => json!({ "type": "object", "properties": {} }),
    }
}

/// Canonical parameter/required schema for one of Claude Code's built-in
/// tools, or `None` when `name` isn't one (§4.3). These arrive with a bare
/// name and an empty `input_schema`, so the real shape has to be supplied
/// here rather than trusted from the request.
fn canonical_builtin_parameters(name: &str) -> Option<Value> {
    let schema = match name {
        "Read" => json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "offset": { "type": "integer" },
                "limit": { "type": "integer" }
            },
            "required": ["file_path"]
        }),
        "Write" => json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["file_path", "content"]
        }),
        "Edit" => json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "old_string": { "type": "string" },
                "new_string": { "type": "string" },
                "replace_all": { "type": "boolean" }
            },
            "required": ["file_path", "old_string", "new_string"]
        }),
        "Glob" => json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "path": { "type": "string" }
            },
            "required": ["pattern"]
        }),
        "Grep" => json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "path": { "type": "string" },
                "glob": { "type": "string" },
                "output_mode": { "type": "string", "enum": ["content", "files_with_matches", "count"] },
                "-i": { "type": "boolean" },
                "-n": { "type": "boolean" },
                "-A": { "type": "integer" },
                "-B": { "type": "integer" },
                "-C": { "type": "integer" },
                "multiline": { "type": "boolean" },
                "head_limit": { "type": "integer" }
            },
            "required": ["pattern"]
        }),
        "Bash" => json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "description": { "type": "string" },
                "timeout": { "type": "integer" },
                "run_in_background": { "type": "boolean" }
            },
            "required": ["command"]
        }),
        "WebFetch" => json!({
            "type": "object",
            "properties": {
                "url": { "type": "string" },
                "prompt": { "type": "string" }
            },
            "required": ["url", "prompt"]
        }),
        "WebSearch" => json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        }),
        "LSP" => json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "args": { "type": "object" }
            },
            "required": ["command"]
        }),
        "NotebookEdit" => json!({
            "type": "object",
            "properties": {
                "notebook_path": { "type": "string" },
                "cell_id": { "type": "string" },
                "new_source": { "type": "string" },
                "cell_type": { "type": "string", "enum": ["code", "markdown"] },
                "edit_mode": { "type": "string", "enum": ["replace", "insert", "delete"] }
            },
            "required": ["notebook_path", "new_source"]
        }),
        "Task" => json!({
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "prompt": { "type": "string" },
                "subagent_type": { "type": "string" }
            },
            "required": ["description", "prompt"]
        }),
        "Skill" => json!({
            "type": "object",
            "properties": {
                "skill": { "type": "string" },
                "args": { "type": "string" }
            },
            "required": ["skill"]
        }),
        "AskUserQuestion" => json!({
            "type": "object",
            "properties": { "questions": { "type": "array", "items": { "type": "object" } } },
            "required": ["questions"]
        }),
        "EnterPlanMode" => json!({ "type": "object", "properties": {} }),
        "ExitPlanMode" => json!({
            "type": "object",
            "properties": { "plan": { "type": "string" } },
            "required": ["plan"]
        }),
        "TaskOutput" => json!({
            "type": "object",
            "properties": { "task_id": { "type": "string" } },
            "required": ["task_id"]
        }),
        "TaskStop" => json!({
            "type": "object",
            "properties": { "task_id": { "type": "string" } },
            "required": ["task_id"]
        }),
        "TaskCreate" => json!({
            "type": "object",
            "properties": {
                "subject": { "type": "string" },
                "description": { "type": "string" }
            },
            "required": ["subject", "description"]
        }),
        "TaskGet" => json!({
            "type": "object",
            "properties": { "taskId": { "type": "string" } },
            "required": ["taskId"]
        }),
        "TaskUpdate" => json!({
            "type": "object",
            "properties": { "taskId": { "type": "string" } },
            "required": ["taskId"]
        }),
        "TaskList" => json!({ "type": "object", "properties": {} }),
        _ => return None,
    };

    Some(schema)
}

/// Strips wire-level noise a backend's JSON-Schema validator rejects or
/// doesn't understand: `cache_control` wrappers (an Anthropic-only hint) and
/// `format` values OpenAI doesn't accept (`uri`, `uri-reference`,
/// `date-time`), recursively through nested objects and arrays (§4.3).
fn sanitize(schema: &Value) -> Value {
    match schema {
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());

            for (key, value) in fields {
                if key == "cache_control" {
                    continue;
                }

                if key == "format" && matches!(value.as_str(), Some("uri" | "uri-reference" | "date-time")) {
                    continue;
                }

                out.insert(key.clone(), sanitize(value));
            }

            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

/// Converts one Anthropic tool definition to an OpenAI function tool,
/// canonicalizing Claude Code's built-ins and computer-use families.
pub fn translate_tool(tool: &AnthropicTool) -> OpenAiTool {
    if let Some(tool_type @ ("computer" | "text_editor" | "bash")) = tool.r#type.as_deref() {
        return OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunctionDef {
                name: rewrite_computer_use_type(tool_type).to_string(),
                description: (!tool.description.is_empty()).then(|| tool.description.clone()),
                parameters: computer_use_parameters(tool_type),
                strict: false,
            },
        };
    }

    if let Some(parameters) = canonical_builtin_parameters(&tool.name) {
        let description = if tool.description.is_empty() {
            format!("Claude Code built-in tool: {}", tool.name)
        } else {
            tool.description.clone()
        };

        return OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunctionDef {
                name: tool.name.clone(),
                description: Some(description),
                parameters,
                strict: false,
            },
        };
    }

    let parameters = if tool.input_schema.is_null() || !tool.input_schema.is_object() {
        json!({ "type": "object", "properties": {} })
    } else {
        sanitize(&tool.input_schema)
    };

    OpenAiTool {
        tool_type: "function".to_string(),
        function: OpenAiFunctionDef {
            name: tool.name.clone(),
            description: (!tool.description.is_empty()).then(|| tool.description.clone()),
            parameters,
            strict: false,
        },
    }
}

/// Maps an Anthropic `tool_choice` to the OpenAI `tool_choice` wire shape.
pub fn translate_tool_choice(choice: &AnthropicToolChoice) -> Value {
    match choice {
        AnthropicToolChoice::None => Value::String("none".to_string()),
        AnthropicToolChoice::Auto => Value::String("auto".to_string()),
        AnthropicToolChoice::Any => Value::String("required".to_string()),
        AnthropicToolChoice::Tool { name } => json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

/// Per-model `max_tokens` ceilings backends silently reject requests above
/// (§4.3). Unrecognized models fall back to the most conservative cap; `0`
/// is treated as "unset" and passed through untouched.
pub fn cap_max_tokens(model: &str, requested: u32) -> u32 {
    if requested == 0 {
        return requested;
    }

    let cap = match model {
        "o1" | "o1-preview" => 100_000,
        "gpt-4o" | "gpt-4o-mini" => 16_384,
        "gpt-4-turbo" => 4_096,
        _ => 4_096,
    };

    requested.min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalizes_claude_code_builtin() {
        let tool = AnthropicTool {
            name: "Bash".to_string(),
            description: String::new(),
            input_schema: json!({"type": "object", "properties": {}}),
            r#type: None,
        };

        let translated = translate_tool(&tool);
        assert_eq!(translated.function.name, "Bash");
        assert!(translated.function.description.is_some());
        assert_eq!(translated.function.parameters["required"], json!(["command"]));
        assert!(!translated.function.strict);
    }

    #[test]
    fn builtin_schema_ignores_client_supplied_empty_schema() {
        let tool = AnthropicTool {
            name: "Edit".to_string(),
            description: String::new(),
            input_schema: json!({"type": "object", "properties": {}}),
            r#type: None,
        };

        let parameters = translate_tool(&tool).function.parameters;
        assert!(parameters["properties"]["old_string"].is_object());
        assert_eq!(
            parameters["required"],
            json!(["file_path", "old_string", "new_string"])
        );
    }

    #[test]
    fn rewrites_computer_use_text_editor() {
        let tool = AnthropicTool {
            name: "str_replace_based_edit_tool".to_string(),
            description: String::new(),
            input_schema: Value::Null,
            r#type: Some("text_editor".to_string()),
        };

        let translated = translate_tool(&tool);
        assert_eq!(translated.function.name, "str_replace_editor");
        assert_eq!(translated.function.parameters["required"], json!(["command", "path"]));
    }

    #[test]
    fn sanitize_strips_cache_control_and_disallowed_formats() {
        let tool = AnthropicTool {
            name: "get_weather".to_string(),
            description: "Look up weather".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "city": { "type": "string", "cache_control": { "type": "ephemeral" } },
                    "requested_at": { "type": "string", "format": "date-time" },
                    "docs": { "type": "string", "format": "uri" },
                    "severity": { "type": "string", "format": "enum" }
                }
            }),
            r#type: None,
        };

        let parameters = translate_tool(&tool).function.parameters;
        assert!(parameters["properties"]["city"].get("cache_control").is_none());
        assert!(parameters["properties"]["requested_at"].get("format").is_none());
        assert!(parameters["properties"]["docs"].get("format").is_none());
        assert_eq!(parameters["properties"]["severity"]["format"], json!("enum"));
    }

    #[test]
    fn tool_choice_any_maps_to_required() {
        assert_eq!(translate_tool_choice(&AnthropicToolChoice::Any), json!("required"));
    }

    #[test]
    fn max_tokens_cap_table() {
        assert_eq!(cap_max_tokens("o1", 500_000), 100_000);
        assert_eq!(cap_max_tokens("gpt-4o-mini", 100_000), 16_384);
        assert_eq!(cap_max_tokens("gpt-3.5-turbo", 8_000), 4_096);
        assert_eq!(cap_max_tokens("gpt-4o", 0), 0);
    }
}
