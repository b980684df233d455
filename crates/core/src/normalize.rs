// crates/core/src/normalize.rs
//! Content normalization: raw record content → structured [`Content`].
//!
//! The upstream format stores message content as a plain string, an ordered
//! list of typed blocks, or nothing at all. Everything funnels through
//! [`normalize_content`], which never fails: unknown or malformed blocks are
//! dropped, and any other JSON shape degrades to its text form. A
//! `tool_result` block recurses into the same normalizer, so nested content
//! comes out structured rather than raw.

use serde_json::Value;

use crate::resolve::ResolutionTables;
use crate::types::{Content, ContentKind, Part};

/// Normalize a raw content value.
///
/// `detailed` controls whether `tool_use` blocks are kept; everything else is
/// included unconditionally.
pub fn normalize_content(raw: Option<&Value>, detailed: bool) -> Content {
    match raw {
        None | Some(Value::Null) => Content::empty(),
        Some(Value::String(s)) => Content::from_text(s.clone()),
        Some(Value::Array(blocks)) => assemble(blocks_to_parts(blocks, detailed)),
        // Scalars and stray objects degrade to their text form.
        Some(other) => Content::from_text(other.to_string()),
    }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn blocks_to_parts(blocks: &[Value], detailed: bool) -> Vec<Part> {
    let mut parts = Vec::new();

    for block in blocks {
        let Some(obj) = block.as_object() else {
            // Not a structured mapping: treated as absent content.
            continue;
        };
        match obj.get("type").and_then(Value::as_str) {
            Some("text") => {
                parts.push(Part::Text {
                    text: str_field(obj, "text"),
                });
            }
            Some("thinking") => {
                parts.push(Part::Thinking {
                    text: str_field(obj, "thinking"),
                });
            }
            Some("tool_use") => {
                if detailed {
                    parts.push(Part::ToolUse {
                        id: str_field(obj, "id"),
                        name: obj
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                        input: obj.get("input").cloned().unwrap_or(Value::Null),
                    });
                }
            }
            Some("image") => {
                let source = obj.get("source");
                parts.push(Part::Image {
                    source_kind: source
                        .and_then(|s| s.get("type"))
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    // Payload kept byte-for-byte; never decoded or recompressed.
                    payload: source
                        .and_then(|s| s.get("data"))
                        .and_then(Value::as_str)
                        .map(String::from),
                    data_url: source
                        .and_then(|s| s.get("dataUrl"))
                        .and_then(Value::as_str)
                        .map(String::from),
                });
            }
            Some("tool_reference") => {
                parts.push(Part::ToolReference {
                    name: obj
                        .get("tool_name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
            Some("tool_result") => {
                let tool_use_id = str_field(obj, "tool_use_id");
                let inner = normalize_content(obj.get("content"), detailed);
                // Each inner part becomes its own wrapped tool_result part,
                // so a multi-part result stays ordered and addressable.
                for inner_part in inner.parts {
                    parts.push(Part::ToolResult {
                        tool_use_id: tool_use_id.clone(),
                        tool_name: None,
                        inner: Box::new(assemble(vec![inner_part])),
                    });
                }
            }
            // Unknown or missing block type: dropped without error.
            _ => {}
        }
    }

    parts
}

/// Apply the collapse rule: one text part stays the simplified text form,
/// zero parts is empty, anything else is rich with a flattened projection.
fn assemble(parts: Vec<Part>) -> Content {
    if parts.is_empty() {
        return Content::empty();
    }
    if let [Part::Text { text }] = parts.as_slice() {
        let text = text.clone();
        return Content {
            kind: ContentKind::Text,
            text,
            parts,
        };
    }
    let text = flatten_parts(&parts);
    Content {
        kind: ContentKind::Rich,
        text,
        parts,
    }
}

/// Build the text projection of a part sequence. One fixed formatting rule
/// per part type; total over every variant.
pub(crate) fn flatten_parts(parts: &[Part]) -> String {
    let mut pieces: Vec<String> = Vec::new();

    for part in parts {
        match part {
            Part::Text { text } => pieces.push(text.clone()),
            Part::Thinking { text } => pieces.push(format!("\n[Thinking] {text}\n")),
            Part::ToolUse { name, input, .. } => {
                pieces.push(format!("\n🔧 Using tool: {name}\n"));
                pieces.push(format!("Input: {}\n", pretty_json(input)));
            }
            Part::Image { .. } => pieces.push("\n[Image]\n".to_string()),
            Part::ToolReference { name } => {
                pieces.push(format!("\n[Tool Reference] {name}\n"));
            }
            Part::ToolResult {
                tool_use_id,
                tool_name,
                inner,
            } => {
                let label = tool_result_label(tool_name.as_deref(), tool_use_id);
                match inner.parts.first() {
                    Some(Part::Text { text }) => {
                        pieces.push(format!("\n[Tool Result: {label}]\n{text}\n"));
                    }
                    Some(Part::Image { .. }) => {
                        pieces.push(format!("\n[Tool Result: {label}]\n[Image]\n"));
                    }
                    _ => pieces.push(format!("\n[Tool Result: {label}]\n")),
                }
            }
            Part::Unknown => pieces.push("\n[Unknown]\n".to_string()),
        }
    }

    pieces.join("\n")
}

/// Display label for a tool result: the resolved name, or the truncated id.
pub(crate) fn tool_result_label(tool_name: Option<&str>, tool_use_id: &str) -> String {
    match tool_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}...", tool_use_id.chars().take(8).collect::<String>()),
    }
}

pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Fill pass: resolve tool names on every still-unnamed `ToolResult` part,
/// recursing into wrapped inner content. The text projection is rebuilt when
/// any name changed so it stays a deterministic flattening of the parts.
pub fn fill_tool_names(content: &mut Content, tables: &ResolutionTables) {
    if fill_parts(&mut content.parts, tables) && content.kind == ContentKind::Rich {
        content.text = flatten_parts(&content.parts);
    }
}

fn fill_parts(parts: &mut [Part], tables: &ResolutionTables) -> bool {
    let mut changed = false;
    for part in parts {
        if let Part::ToolResult {
            tool_use_id,
            tool_name,
            inner,
        } = part
        {
            if tool_name.as_deref().unwrap_or("").is_empty() {
                let resolved = tables.resolve_name(tool_use_id);
                if !resolved.is_empty() {
                    *tool_name = Some(resolved.to_string());
                    changed = true;
                }
            }
            if fill_parts(&mut inner.parts, tables) && inner.kind == ContentKind::Rich {
                inner.text = flatten_parts(&inner.parts);
                changed = true;
            }
        }
    }
    changed
}
