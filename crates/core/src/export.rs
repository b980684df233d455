// crates/core/src/export.rs
//! Batch export: one artifact per session, named deterministically from the
//! session id and the date of the first message.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::ExportError;
use crate::render::{render_interchange, render_message_html, render_message_markdown};
use crate::types::Message;

/// Batch artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }
}

/// Date (YYYY-MM-DD) and time (HH:MM:SS) taken from the first message's
/// timestamp; today's date and an empty time when absent or unparseable.
fn session_datestamp(messages: &[Message]) -> (String, String) {
    let first = messages.first().map(|m| m.timestamp.as_str()).unwrap_or("");
    match DateTime::parse_from_rfc3339(first) {
        Ok(dt) => (dt.format("%Y-%m-%d").to_string(), dt.format("%H:%M:%S").to_string()),
        Err(_) => (Local::now().format("%Y-%m-%d").to_string(), String::new()),
    }
}

/// Deterministic artifact name: `claude-conversation-{date}-{id8}.{ext}`.
pub fn export_filename(session_id: &str, messages: &[Message], format: ExportFormat) -> String {
    let (date, _) = session_datestamp(messages);
    let short_id: String = session_id.chars().take(8).collect();
    format!("claude-conversation-{date}-{short_id}.{}", format.extension())
}

/// Render the full markdown document: header plus one section per message.
pub fn markdown_document(messages: &[Message], session_id: &str) -> String {
    let (date, time) = session_datestamp(messages);

    let mut doc = String::from("# Claude Conversation Log\n\n");
    doc.push_str(&format!("Session ID: {session_id}\n"));
    doc.push_str(&format!("Date: {date}"));
    if !time.is_empty() {
        doc.push_str(&format!(" {time}"));
    }
    doc.push_str("\n\n---\n\n");

    for message in messages {
        doc.push_str(&render_message_markdown(message));
        doc.push_str("---\n\n");
    }
    doc
}

/// Render the interchange document: session envelope plus the lossless
/// per-message structures.
pub fn json_document(messages: &[Message], session_id: &str) -> serde_json::Value {
    let (date, _) = session_datestamp(messages);
    serde_json::json!({
        "session_id": session_id,
        "date": date,
        "message_count": messages.len(),
        "messages": messages.iter().map(render_interchange).collect::<Vec<_>>(),
    })
}

/// Render the standalone HTML document.
pub fn html_document(messages: &[Message], session_id: &str) -> String {
    let (date, time) = session_datestamp(messages);
    let short_id: String = session_id.chars().take(8).collect();

    let mut doc = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Claude Conversation - {short_id}</title>
    <style>{PAGE_CSS}
    </style>
</head>
<body>
    <div class="header">
        <h1>Claude Conversation Log</h1>
        <div class="metadata">
            <p>Session ID: {session_id}</p>
            <p>Date: {date} {time}</p>
            <p>Messages: {count}</p>
        </div>
    </div>
"#,
        count = messages.len(),
    );

    for message in messages {
        doc.push_str(&render_message_html(message));
    }
    doc.push_str("\n</body>\n</html>");
    doc
}

/// Write the conversation to `output_dir` in the chosen format. Returns the
/// artifact path.
pub fn save_conversation(
    messages: &[Message],
    session_id: &str,
    output_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    if messages.is_empty() {
        return Err(ExportError::EmptyConversation);
    }

    let path = output_dir.join(export_filename(session_id, messages, format));
    let body = match format {
        ExportFormat::Markdown => markdown_document(messages, session_id),
        ExportFormat::Html => html_document(messages, session_id),
        ExportFormat::Json => {
            let doc = json_document(messages, session_id);
            serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
        }
    };
    std::fs::write(&path, body).map_err(|e| ExportError::io(&path, e))?;
    Ok(path)
}

/// Styling shared by the batch HTML document and the live watch page.
pub const PAGE_CSS: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 900px;
            margin: 0 auto;
            padding: 20px;
            background: #f5f5f5;
        }
        .header {
            background: white;
            padding: 20px;
            border-radius: 8px;
            margin-bottom: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        h1 {
            color: #2c3e50;
            margin: 0 0 10px 0;
        }
        .metadata {
            color: #666;
            font-size: 0.9em;
        }
        .message {
            background: white;
            padding: 15px 20px;
            margin-bottom: 15px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .user { border-left: 4px solid #3498db; }
        .assistant { border-left: 4px solid #2ecc71; }
        .tool_use { border-left: 4px solid #f39c12; background: #fffbf0; }
        .tool_result { border-left: 4px solid #e74c3c; background: #fff5f5; }
        .system { border-left: 4px solid #95a5a6; background: #f8f9fa; }
        .subagent_user, .subagent_assistant {
            border-left: 4px solid #9b59b6;
            background: #f8f4ff;
        }
        .role {
            font-weight: bold;
            margin-bottom: 10px;
            display: flex;
            align-items: center;
        }
        .content {
            white-space: pre-wrap;
            word-wrap: break-word;
        }
        .content-text { margin: 5px 0; }
        .content-thinking {
            background: #f0f7ff;
            border-left: 3px solid #4a90e2;
            padding: 10px;
            margin: 10px 0;
            border-radius: 4px;
        }
        .thinking-header {
            font-weight: bold;
            color: #2c5aa0;
            margin-bottom: 5px;
            font-size: 0.9em;
        }
        .thinking-content {
            white-space: pre-wrap;
            font-family: 'Courier New', monospace;
            font-size: 0.9em;
            color: #333;
        }
        .content-tool-use {
            background: #fffbf0;
            padding: 10px;
            margin: 10px 0;
            border-radius: 4px;
        }
        .tool-name { font-weight: bold; color: #856404; margin-bottom: 5px; }
        .tool-input {
            background: #f4f4f4;
            padding: 10px;
            border-radius: 4px;
            overflow-x: auto;
            margin: 0;
        }
        .content-image { margin: 10px 0; text-align: center; }
        .content-image img {
            max-width: 100%;
            height: auto;
            border-radius: 4px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }
        .content-image-placeholder {
            background: #f4f4f4;
            padding: 20px;
            border-radius: 4px;
            text-align: center;
            color: #666;
            font-style: italic;
        }
        .content-tool-reference {
            background: #fff9e6;
            padding: 8px;
            border-radius: 4px;
            margin: 5px 0;
        }
        .tool-ref-label { font-weight: bold; color: #856404; }
        .content-tool-result {
            background: #fff5f5;
            padding: 10px;
            margin: 10px 0;
            border-radius: 4px;
            border-left: 3px solid #e74c3c;
        }
        .tool-result-header {
            font-weight: bold;
            color: #c0392b;
            margin-bottom: 5px;
            font-size: 0.9em;
        }
        .tool-result-content {
            white-space: pre-wrap;
            font-family: 'Courier New', monospace;
            font-size: 0.9em;
            color: #333;
        }
        pre {
            background: #f4f4f4;
            padding: 10px;
            border-radius: 4px;
            overflow-x: auto;
        }
        code {
            background: #f4f4f4;
            padding: 2px 4px;
            border-radius: 3px;
            font-family: 'Courier New', monospace;
        }
        #status-bar {
            position: fixed;
            bottom: 12px;
            right: 16px;
            background: rgba(255,255,255,0.92);
            border: 1px solid #ddd;
            border-radius: 20px;
            padding: 4px 14px;
            font-size: 0.82em;
            color: #555;
            box-shadow: 0 1px 4px rgba(0,0,0,0.12);
            z-index: 1000;
        }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use tempfile::tempdir;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::user(Content::from_text("hello")).with_timestamp("2026-08-01T09:30:00Z"),
            Message::assistant(Content::from_text("hi there"))
                .with_timestamp("2026-08-01T09:30:05Z"),
        ]
    }

    #[test]
    fn test_filename_is_deterministic() {
        let messages = sample_messages();
        let name = export_filename("abcdef1234567890", &messages, ExportFormat::Markdown);
        assert_eq!(name, "claude-conversation-2026-08-01-abcdef12.md");
        // Same inputs, same name.
        assert_eq!(
            name,
            export_filename("abcdef1234567890", &messages, ExportFormat::Markdown)
        );
        assert_eq!(
            export_filename("abcdef1234567890", &messages, ExportFormat::Html),
            "claude-conversation-2026-08-01-abcdef12.html"
        );
    }

    #[test]
    fn test_markdown_document_sections() {
        let doc = markdown_document(&sample_messages(), "abcdef1234567890");
        assert!(doc.starts_with("# Claude Conversation Log"));
        assert!(doc.contains("Session ID: abcdef1234567890"));
        assert!(doc.contains("Date: 2026-08-01 09:30:00"));
        assert!(doc.contains("## 👤 User"));
        assert!(doc.contains("## 🤖 Claude"));
        assert_eq!(doc.matches("---").count(), 3); // header + one per message
    }

    #[test]
    fn test_json_document_envelope() {
        let doc = json_document(&sample_messages(), "abcdef1234567890");
        assert_eq!(doc["session_id"], "abcdef1234567890");
        assert_eq!(doc["date"], "2026-08-01");
        assert_eq!(doc["message_count"], 2);
        assert_eq!(doc["messages"][0]["role"], "user");
        assert_eq!(doc["messages"][0]["content"]["text"], "hello");
    }

    #[test]
    fn test_html_document_contains_styles_and_messages() {
        let doc = html_document(&sample_messages(), "abcdef1234567890");
        assert!(doc.contains("<style>"));
        assert!(doc.contains(".content-tool-result"));
        assert!(doc.contains("class=\"message user\""));
        assert!(doc.contains("class=\"message assistant\""));
        assert!(doc.ends_with("</html>"));
    }

    #[test]
    fn test_save_conversation_writes_artifact() {
        let dir = tempdir().unwrap();
        let path = save_conversation(
            &sample_messages(),
            "abcdef1234567890",
            dir.path(),
            ExportFormat::Json,
        )
        .unwrap();
        assert!(path.exists());
        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["message_count"], 2);
    }

    #[test]
    fn test_save_conversation_rejects_empty() {
        let dir = tempdir().unwrap();
        let err = save_conversation(&[], "abc", dir.path(), ExportFormat::Markdown).unwrap_err();
        assert!(matches!(err, ExportError::EmptyConversation));
    }
}
