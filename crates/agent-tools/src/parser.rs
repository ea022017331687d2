//! Extracts `<action>`/`<invoke>`/`<param>` tool-call blocks from free-form
//! model output. Malformed blocks are skipped with a warning; they never
//! abort parsing of the rest of the document.

use agent_core::ToolCall;
use serde_json::Value;
use std::collections::HashMap;

const ACTION_OPEN: &str = "<action>";
const ACTION_CLOSE: &str = "</action>";
const INVOKE_OPEN: &str = "<invoke tool=\"";
const INVOKE_CLOSE: &str = "</invoke>";
const PARAM_OPEN: &str = "<param name=\"";
const PARAM_CLOSE: &str = "</param>";

/// Result of scanning a model response: the ordered tool calls found, the
/// residual text with tool-call blocks removed, and any non-fatal warnings.
#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub calls: Vec<ToolCall>,
    pub text: String,
    pub warnings: Vec<String>,
}

/// Parse `input` for `<action>` blocks and return the calls plus the text
/// that remains once those blocks are removed.
pub fn parse_tool_calls(input: &str) -> ParsedOutput {
    let mut calls = Vec::new();
    let mut warnings = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    loop {
        match rest.find(ACTION_OPEN) {
            None => {
                text.push_str(rest);
                break;
            }
            Some(start) => {
                text.push_str(&rest[..start]);
                let after_open = &rest[start + ACTION_OPEN.len()..];
                match after_open.find(ACTION_CLOSE) {
                    None => {
                        warnings.push("unclosed <action> block; treating remainder as text".to_string());
                        text.push_str(after_open);
                        break;
                    }
                    Some(end) => {
                        let block = &after_open[..end];
                        parse_invokes(block, &mut calls, &mut warnings);
                        rest = &after_open[end + ACTION_CLOSE.len()..];
                    }
                }
            }
        }
    }

    ParsedOutput {
        calls,
        text: text.trim().to_string(),
        warnings,
    }
}

fn parse_invokes(block: &str, calls: &mut Vec<ToolCall>, warnings: &mut Vec<String>) {
    let mut rest = block;
    loop {
        let Some(start) = rest.find(INVOKE_OPEN) else {
            break;
        };
        let after_tag = &rest[start + INVOKE_OPEN.len()..];
        let Some(name_end) = after_tag.find('"') else {
            warnings.push("malformed <invoke> tag: missing closing quote on tool name".to_string());
            break;
        };
        let name = &after_tag[..name_end];
        let after_name = &after_tag[name_end + 1..];
        let Some(gt) = after_name.find('>') else {
            warnings.push(format!("malformed <invoke> tag for tool '{name}'"));
            break;
        };
        let body_start = &after_name[gt + 1..];
        match body_start.find(INVOKE_CLOSE) {
            None => {
                warnings.push(format!("unclosed <invoke> for tool '{name}'; skipping"));
                rest = body_start;
            }
            Some(end) => {
                let body = &body_start[..end];
                let params = parse_params(body, warnings, name);
                calls.push(ToolCall {
                    tool: name.to_string(),
                    params,
                });
                rest = &body_start[end + INVOKE_CLOSE.len()..];
            }
        }
    }
}

fn parse_params(
    body: &str,
    warnings: &mut Vec<String>,
    tool_name: &str,
) -> HashMap<String, Value> {
    let mut params = HashMap::new();
    let mut rest = body;
    loop {
        let Some(start) = rest.find(PARAM_OPEN) else {
            break;
        };
        let after_tag = &rest[start + PARAM_OPEN.len()..];
        let Some(name_end) = after_tag.find('"') else {
            warnings.push(format!("malformed <param> tag in invoke '{tool_name}'"));
            break;
        };
        let name = &after_tag[..name_end];
        let after_name = &after_tag[name_end + 1..];
        let Some(gt) = after_name.find('>') else {
            warnings.push(format!("malformed <param> tag '{name}' in invoke '{tool_name}'"));
            break;
        };
        let value_start = &after_name[gt + 1..];
        match value_start.find(PARAM_CLOSE) {
            None => {
                warnings.push(format!(
                    "unclosed <param> '{name}' in invoke '{tool_name}'; skipping"
                ));
                rest = value_start;
            }
            Some(end) => {
                let raw = &value_start[..end];
                params.insert(name.to_string(), decode_value(raw));
                rest = &value_start[end + PARAM_CLOSE.len()..];
            }
        }
    }
    params
}

fn decode_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

/// Render a single tool call back into tag form, for round-trip tests and
/// for prompts that echo a proposed call.
pub fn render_tool_call(call: &ToolCall) -> String {
    let mut out = String::new();
    out.push_str(ACTION_OPEN);
    out.push('\n');
    out.push_str(&format!("<invoke tool=\"{}\">\n", call.tool));
    for (name, value) in &call.params {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        };
        out.push_str(&format!("  <param name=\"{name}\">{rendered}</param>\n"));
    }
    out.push_str(INVOKE_CLOSE);
    out.push('\n');
    out.push_str(ACTION_CLOSE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_call() {
        let input = r#"<action><invoke tool="read_file"><param name="path">hello.txt</param></invoke></action>"#;
        let parsed = parse_tool_calls(input);
        assert_eq!(parsed.calls.len(), 1);
        assert_eq!(parsed.calls[0].tool, "read_file");
        assert_eq!(parsed.calls[0].get_str("path"), Some("hello.txt"));
        assert!(parsed.text.is_empty());
    }

    #[test]
    fn test_parse_preserves_surrounding_text() {
        let input = "Here's my plan.\n<action><invoke tool=\"list_directory\"><param name=\"path\">.</param></invoke></action>\nDone.";
        let parsed = parse_tool_calls(input);
        assert_eq!(parsed.calls.len(), 1);
        assert!(parsed.text.contains("Here's my plan."));
        assert!(parsed.text.contains("Done."));
    }

    #[test]
    fn test_parse_multiple_invokes_in_order() {
        let input = r#"<action>
<invoke tool="a"><param name="x">1</param></invoke>
<invoke tool="b"><param name="x">2</param></invoke>
</action>"#;
        let parsed = parse_tool_calls(input);
        assert_eq!(parsed.calls.len(), 2);
        assert_eq!(parsed.calls[0].tool, "a");
        assert_eq!(parsed.calls[1].tool, "b");
    }

    #[test]
    fn test_param_value_may_contain_angle_brackets() {
        let input = r#"<action><invoke tool="write_file"><param name="content"><html><body>hi</body></html></param></invoke></action>"#;
        let parsed = parse_tool_calls(input);
        assert_eq!(
            parsed.calls[0].get_str("content"),
            Some("<html><body>hi</body></html>")
        );
    }

    #[test]
    fn test_boolean_literal_decoding() {
        let input = r#"<action><invoke tool="list_directory"><param name="recursive">true</param></invoke></action>"#;
        let parsed = parse_tool_calls(input);
        assert_eq!(parsed.calls[0].params.get("recursive"), Some(&json!(true)));
    }

    #[test]
    fn test_unclosed_action_is_skipped_not_fatal() {
        let input = "<action><invoke tool=\"a\"><param name=\"x\">1</param></invoke>";
        let parsed = parse_tool_calls(input);
        assert!(parsed.calls.is_empty());
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_unclosed_invoke_skipped_but_siblings_parse() {
        let input = r#"<action>
<invoke tool="broken"><param name="x">1</param>
<invoke tool="ok"><param name="y">2</param></invoke>
</action>"#;
        let parsed = parse_tool_calls(input);
        assert_eq!(parsed.calls.len(), 1);
        assert_eq!(parsed.calls[0].tool, "ok");
        assert!(!parsed.warnings.is_empty());
    }

    #[test]
    fn test_no_tool_calls_returns_all_text() {
        let input = "Just a plain sentence.";
        let parsed = parse_tool_calls(input);
        assert!(parsed.calls.is_empty());
        assert_eq!(parsed.text, "Just a plain sentence.");
    }

    #[test]
    fn test_round_trip_single_string_param() {
        let call = ToolCall::new("read_file").with_param("path", json!("src/main.rs"));
        let rendered = render_tool_call(&call);
        let parsed = parse_tool_calls(&rendered);
        assert_eq!(parsed.calls.len(), 1);
        assert_eq!(parsed.calls[0], call);
    }

    #[test]
    fn test_round_trip_preserves_call_order() {
        let calls = vec![
            ToolCall::new("a").with_param("x", json!("1")),
            ToolCall::new("b").with_param("y", json!("2")),
        ];
        let rendered: String = calls
            .iter()
            .map(render_tool_call)
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse_tool_calls(&rendered);
        assert_eq!(parsed.calls, calls);
    }
}
