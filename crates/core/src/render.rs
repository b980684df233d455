// crates/core/src/render.rs
//! Projections from canonical messages to output encodings.
//!
//! Three encodings: a sectioned markdown document, a lossless interchange
//! object (the serde form of [`Message`] itself), and self-contained HTML
//! fragments safe to append to a growing page. Rendering is total: every
//! part variant has a rule, including the `Unknown` fallback, so none of
//! these functions can fail.

use crate::normalize::{pretty_json, tool_result_label};
use crate::types::{Content, Message, Part, Role};

/// Output encoding selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// Human-readable markdown section.
    Document,
    /// Lossless JSON mirror of the message structure.
    Interchange,
    /// Self-contained HTML fragment.
    Html,
}

/// Render one message in the requested encoding.
pub fn render_message(message: &Message, format: RenderFormat) -> String {
    match format {
        RenderFormat::Document => render_message_markdown(message),
        RenderFormat::Interchange => render_interchange(message).to_string(),
        RenderFormat::Html => render_message_html(message),
    }
}

/// Lossless interchange form: structurally mirrors `Message`/`Content`/`Part`.
pub fn render_interchange(message: &Message) -> serde_json::Value {
    serde_json::to_value(message).unwrap_or(serde_json::Value::Null)
}

/// Escape text for embedding in HTML.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// CSS class for a message role; doubles as the stable role identifier in
/// rendered pages.
pub fn role_class(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::SubagentUser => "subagent_user",
        Role::SubagentAssistant => "subagent_assistant",
        Role::ToolUse => "tool_use",
        Role::ToolResult => "tool_result",
        Role::System => "system",
    }
}

/// Human-facing role heading, including the subagent display name.
pub fn role_display(message: &Message) -> String {
    match message.role {
        Role::User => "👤 User".to_string(),
        Role::Assistant => "🤖 Claude".to_string(),
        Role::ToolUse => "🔧 Tool Use".to_string(),
        Role::ToolResult => "📤 Tool Result".to_string(),
        Role::System => "ℹ️ System".to_string(),
        Role::SubagentUser => format!("🤖 Subagent ({}) - User", subagent_label(message)),
        Role::SubagentAssistant => {
            format!("🤖 Subagent ({}) - Assistant", subagent_label(message))
        }
    }
}

/// Resolved subagent kind in caps, or the truncated agent id.
fn subagent_label(message: &Message) -> String {
    match &message.metadata {
        Some(meta) if !meta.subagent_kind.is_empty() => meta.subagent_kind.to_uppercase(),
        Some(meta) => format!("{}...", meta.agent_id.chars().take(8).collect::<String>()),
        None => "unknown".to_string(),
    }
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// One appendable fragment per message: `<div class="message {role}">`.
pub fn render_message_html(message: &Message) -> String {
    format!(
        "    <div class=\"message {}\">\n        <div class=\"role\">{}</div>\n        <div class=\"content\">{}</div>\n    </div>\n",
        role_class(message.role),
        role_display(message),
        render_content_html(&message.content),
    )
}

/// Render normalized content to HTML, one block element per part.
pub fn render_content_html(content: &Content) -> String {
    if content.parts.is_empty() {
        return escape_html(&content.text);
    }

    let mut html = Vec::new();
    for part in &content.parts {
        match part {
            Part::Text { text } => {
                html.push(format!("<div class=\"content-text\">{}</div>", escape_html(text)));
            }
            Part::Thinking { text } => {
                html.push(format!(
                    "<div class=\"content-thinking\"><div class=\"thinking-header\">Thinking Process</div><div class=\"thinking-content\">{}</div></div>",
                    escape_html(text)
                ));
            }
            Part::ToolUse { name, input, .. } => {
                html.push(format!(
                    "<div class=\"content-tool-use\"><div class=\"tool-name\">🔧 {}</div><pre class=\"tool-input\">{}</pre></div>",
                    escape_html(name),
                    escape_html(&pretty_json(input))
                ));
            }
            Part::Image { payload, data_url, .. } => {
                html.push(render_image_html(payload.as_deref(), data_url.as_deref()));
            }
            Part::ToolReference { name } => {
                html.push(format!(
                    "<div class=\"content-tool-reference\"><span class=\"tool-ref-label\">Tool Reference:</span> <code>{}</code></div>",
                    escape_html(name)
                ));
            }
            Part::ToolResult {
                tool_use_id,
                tool_name,
                inner,
            } => {
                let label = tool_result_label(tool_name.as_deref(), tool_use_id);
                let mut block = format!(
                    "<div class=\"content-tool-result\"><div class=\"tool-result-header\">📤 Tool Result: {}</div>",
                    escape_html(&label)
                );
                for inner_part in &inner.parts {
                    match inner_part {
                        Part::Text { text } => {
                            block.push_str(&format!(
                                "<div class=\"tool-result-content\">{}</div>",
                                escape_html(text)
                            ));
                        }
                        Part::Image { payload, data_url, .. } => {
                            block.push_str(&render_image_html(
                                payload.as_deref(),
                                data_url.as_deref(),
                            ));
                        }
                        other => {
                            block.push_str(&format!(
                                "<div class=\"tool-result-content\">{}</div>",
                                escape_html(&crate::normalize::flatten_parts(std::slice::from_ref(other)))
                            ));
                        }
                    }
                }
                block.push_str("</div>");
                html.push(block);
            }
            Part::Unknown => {
                html.push("<div class=\"content-unknown\">[Unrecognized content]</div>".to_string());
            }
        }
    }
    html.join("\n")
}

/// Image embedding: the base64 payload passes through byte-for-byte.
fn render_image_html(payload: Option<&str>, data_url: Option<&str>) -> String {
    if let Some(data) = payload {
        format!(
            "<div class=\"content-image\"><img src=\"data:image/jpeg;base64,{data}\" alt=\"Screenshot\" style=\"max-width: 100%; height: auto;\" /></div>"
        )
    } else if let Some(url) = data_url {
        format!(
            "<div class=\"content-image\"><img src=\"{}\" alt=\"Screenshot\" style=\"max-width: 100%; height: auto;\" /></div>",
            escape_html(url)
        )
    } else {
        "<div class=\"content-image-placeholder\">[Image Data]</div>".to_string()
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// One markdown section per message, heading by role.
pub fn render_message_markdown(message: &Message) -> String {
    let heading = match message.role {
        Role::ToolUse | Role::ToolResult | Role::System => {
            format!("### {}", role_display(message))
        }
        _ => format!("## {}", role_display(message)),
    };
    format!("{heading}\n\n{}\n\n", render_content_markdown(&message.content))
}

/// Render normalized content to markdown.
pub fn render_content_markdown(content: &Content) -> String {
    if content.parts.is_empty() {
        return content.text.clone();
    }

    let mut pieces = Vec::new();
    for part in &content.parts {
        match part {
            Part::Text { text } => pieces.push(text.clone()),
            Part::Thinking { text } => {
                pieces.push(format!("\n**Thinking Process:**\n\n```\n{text}\n```\n"));
            }
            Part::ToolUse { name, input, .. } => {
                pieces.push(format!(
                    "\n**🔧 Using Tool:** `{name}`\n\n```json\n{}\n```\n",
                    pretty_json(input)
                ));
            }
            Part::Image { .. } => {
                pieces.push("\n**📷 Image**\n\n*[Image data included in conversation]*\n".to_string());
            }
            Part::ToolReference { name } => {
                pieces.push(format!("\n**Tool Reference:** `{name}`\n"));
            }
            Part::ToolResult {
                tool_use_id,
                tool_name,
                inner,
            } => {
                let label = tool_result_label(tool_name.as_deref(), tool_use_id);
                let mut block = format!("\n**📤 Tool Result: {label}**\n\n");
                for inner_part in &inner.parts {
                    match inner_part {
                        Part::Text { text } => block.push_str(&format!("{text}\n")),
                        Part::Image { .. } => {
                            block.push_str("*[Image data included in conversation]*\n");
                        }
                        other => block.push_str(&format!(
                            "{}\n",
                            crate::normalize::flatten_parts(std::slice::from_ref(other))
                        )),
                    }
                }
                pieces.push(block);
            }
            Part::Unknown => pieces.push("\n*[Unrecognized content]*\n".to_string()),
        }
    }
    pieces.join("\n")
}
