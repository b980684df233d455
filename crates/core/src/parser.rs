// crates/core/src/parser.rs
//! Per-record parser for the Claude Code JSONL session format.
//!
//! One [`RecordParser`] per parse session: it owns the cross-reference
//! tables, classifies each raw record, and emits zero or one canonical
//! [`Message`]. Malformed lines are skipped (logged at debug level) — a
//! corrupt line never aborts the session.

use crate::error::ParseError;
use crate::normalize::{fill_tool_names, normalize_content, pretty_json};
use crate::resolve::{ResolutionTables, SPAWN_KIND_KEY, SPAWN_TOOL};
use crate::types::{Content, Message, Role, SubagentMeta};
use regex_lite::Regex;
use serde_json::Value;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Strips slash-command envelope tags from user-typed text.
struct CommandTagCleaner {
    command_name: Regex,
    command_args: Regex,
    command_message: Regex,
}

impl CommandTagCleaner {
    fn new() -> Self {
        // Dotall: tag bodies span lines.
        Self {
            command_name: Regex::new(r"(?s)<command-name>.*?</command-name>\s*").unwrap(),
            command_args: Regex::new(r"(?s)<command-args>(.*?)</command-args>").unwrap(),
            command_message: Regex::new(r"(?s)<command-message>.*?</command-message>\s*").unwrap(),
        }
    }

    fn clean(&self, text: &str) -> String {
        let cleaned = self.command_name.replace_all(text, "");
        let cleaned = self.command_message.replace_all(&cleaned, "");
        let cleaned = self.command_args.replace_all(&cleaned, "$1");
        cleaned.replace("\\\n", "\n")
    }
}

/// Stateful per-record parser. Create one per session (whole-file parse or
/// live watch); the resolution tables live and die with it.
pub struct RecordParser {
    tables: ResolutionTables,
    detailed: bool,
    cleaner: CommandTagCleaner,
    lines_seen: usize,
}

impl RecordParser {
    pub fn new(detailed: bool) -> Self {
        Self {
            tables: ResolutionTables::new(),
            detailed,
            cleaner: CommandTagCleaner::new(),
            lines_seen: 0,
        }
    }

    pub fn tables(&self) -> &ResolutionTables {
        &self.tables
    }

    /// Parse one raw line: tolerant of blank lines and malformed JSON.
    pub fn parse_line(&mut self, line: &str) -> Option<Message> {
        self.lines_seen += 1;
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping malformed JSON at line {}: {}", self.lines_seen, e);
                return None;
            }
        };
        self.parse_record(&value)
    }

    /// Classify one raw record and emit its canonical message, if any.
    pub fn parse_record(&mut self, value: &Value) -> Option<Message> {
        let record_type = value.get("type").and_then(Value::as_str)?;
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        match record_type {
            "user" => self.parse_user(value, timestamp),
            "assistant" => self.parse_assistant(value, timestamp),
            "progress" => self.parse_progress(value, timestamp),
            "tool_use" if self.detailed => self.parse_tool_use_event(value, timestamp),
            "tool_result" if self.detailed => self.parse_tool_result_event(value, timestamp),
            "system" if self.detailed => self.parse_system_event(value, timestamp),
            _ => {
                debug!("Ignoring record type '{}' at line {}", record_type, self.lines_seen);
                None
            }
        }
    }

    fn parse_user(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let msg = value.get("message")?;
        if msg.get("role").and_then(Value::as_str) != Some("user") {
            return None;
        }

        let raw = msg.get("content");
        let mut content = match raw {
            Some(Value::String(s)) => Content::from_text(self.cleaner.clean(s)),
            other => normalize_content(other, self.detailed),
        };
        fill_tool_names(&mut content, &self.tables);
        if content.is_blank() {
            return None;
        }
        Some(Message::user(content).with_timestamp(timestamp))
    }

    fn parse_assistant(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let msg = value.get("message")?;
        if msg.get("role").and_then(Value::as_str) != Some("assistant") {
            return None;
        }

        let raw = msg.get("content");
        // Register tool uses before normalizing so this record's own tool
        // results — and every later record — resolve against current state.
        if let Some(blocks) = raw.and_then(Value::as_array) {
            self.register_tool_uses(blocks);
        }
        let mut content = normalize_content(raw, self.detailed);
        fill_tool_names(&mut content, &self.tables);
        if content.is_blank() {
            return None;
        }
        Some(Message::assistant(content).with_timestamp(timestamp))
    }

    fn parse_progress(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let data = value.get("data")?;
        if data.get("type").and_then(Value::as_str) != Some("agent_progress") {
            return None;
        }
        let message_data = data.get("message")?;
        let msg_type = message_data.get("type").and_then(Value::as_str)?;
        let role = match msg_type {
            "user" => Role::SubagentUser,
            "assistant" => Role::SubagentAssistant,
            _ => return None,
        };
        let msg = message_data.get("message")?;
        if msg.get("role").and_then(Value::as_str) != Some(msg_type) {
            return None;
        }

        let raw = msg.get("content");
        if let Some(blocks) = raw.and_then(Value::as_array) {
            self.register_tool_uses(blocks);
        }
        let mut content = normalize_content(raw, self.detailed);
        fill_tool_names(&mut content, &self.tables);
        if content.is_blank() {
            return None;
        }

        let parent_tool_use_id = value
            .get("parentToolUseID")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let metadata = SubagentMeta {
            agent_id: data
                .get("agentId")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            subagent_kind: self.tables.resolve_spawn_kind(&parent_tool_use_id).to_string(),
            parent_tool_use_id,
        };
        // The nested message's own timestamp wins over the record's.
        let timestamp = message_data
            .get("timestamp")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or(timestamp);

        Some(Message::new(role, content).with_timestamp(timestamp).with_metadata(metadata))
    }

    fn parse_tool_use_event(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let tool = value.get("tool");
        let name = tool
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let input = tool
            .and_then(|t| t.get("input"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let content = Content::from_text(format!("🔧 Tool: {name}\nInput: {}", pretty_json(&input)));
        Some(Message::new(Role::ToolUse, content).with_timestamp(timestamp))
    }

    fn parse_tool_result_event(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let result = value.get("result");
        let output = result
            .and_then(|r| r.get("output"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| result.and_then(|r| r.get("error")).and_then(Value::as_str))
            .unwrap_or("");
        let content = Content::from_text(format!("📤 Result:\n{output}"));
        Some(Message::new(Role::ToolResult, content).with_timestamp(timestamp))
    }

    fn parse_system_event(&mut self, value: &Value, timestamp: String) -> Option<Message> {
        let text = value.get("message").and_then(Value::as_str)?;
        if text.is_empty() {
            return None;
        }
        let content = Content::from_text(format!("ℹ️ System: {text}"));
        Some(Message::system(content).with_timestamp(timestamp))
    }

    fn register_tool_uses(&mut self, blocks: &[Value]) {
        for block in blocks {
            if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                continue;
            }
            let id = block.get("id").and_then(Value::as_str).unwrap_or("");
            let name = block.get("name").and_then(Value::as_str).unwrap_or("");
            self.tables.record_tool_use(id, name);
            if name == SPAWN_TOOL {
                let kind = block
                    .get("input")
                    .and_then(|i| i.get(SPAWN_KIND_KEY))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                self.tables.record_spawn(id, kind);
            }
        }
    }
}

/// Parse a whole session file into its canonical message sequence.
///
/// Streams line by line; malformed lines are skipped, unknown record kinds
/// ignored. Errors only on file-level I/O problems.
pub async fn parse_session(path: &Path) -> Result<Vec<Message>, ParseError> {
    parse_session_with_options(path, false).await
}

/// Like [`parse_session`] with the detailed flag exposed: detailed mode keeps
/// tool-use blocks and tool-use/tool-result/system event records.
pub async fn parse_session_with_options(
    path: &Path,
    detailed: bool,
) -> Result<Vec<Message>, ParseError> {
    let file = File::open(path).await.map_err(|e| ParseError::io(path, e))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut parser = RecordParser::new(detailed);
    let mut messages = Vec::new();

    while let Some(line) = lines.next_line().await.map_err(|e| ParseError::io(path, e))? {
        if let Some(message) = parser.parse_line(&line) {
            messages.push(message);
        }
    }

    Ok(messages)
}
