// crates/core/src/types.rs
use serde::{Deserialize, Serialize};

/// Speaker of a canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    SubagentUser,
    SubagentAssistant,
    ToolUse,
    ToolResult,
    System,
}

impl Role {
    /// Whether this role carries subagent metadata.
    pub fn is_subagent(self) -> bool {
        matches!(self, Role::SubagentUser | Role::SubagentAssistant)
    }
}

/// Metadata attached to subagent messages only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentMeta {
    pub agent_id: String,
    /// Resolved from the spawning tool use; empty when the spawn was not seen
    /// earlier in the file.
    pub subagent_kind: String,
    pub parent_tool_use_id: String,
}

/// Shape of a normalized content value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Rich,
}

/// One block of a normalized content value.
///
/// Closed union: every variant the upstream format produces, plus `Unknown`
/// so deserializing a future interchange document cannot fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
    },
    Thinking {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    Image {
        source_kind: String,
        /// Base64 payload exactly as it appeared in the record; never decoded.
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data_url: Option<String>,
    },
    ToolReference {
        name: String,
    },
    ToolResult {
        tool_use_id: String,
        /// Resolved lazily from the tool-use registry; `None` until filled.
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        /// Recursively normalized inner content, not raw blocks.
        inner: Box<Content>,
    },
    #[serde(other)]
    Unknown,
}

/// Normalized content: ordered parts plus a flattened text projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub kind: ContentKind,
    /// Deterministic flattening of `parts` (pass-through for the
    /// single-text-part case).
    pub text: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn empty() -> Self {
        Self {
            kind: ContentKind::Text,
            text: String::new(),
            parts: Vec::new(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: ContentKind::Text,
            parts: vec![Part::Text { text: text.clone() }],
            text,
        }
    }

    /// True when the trimmed text projection is empty — such content never
    /// becomes a `Message`.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A canonical message in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SubagentMeta>,
}

impl Message {
    pub fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            timestamp: String::new(),
            metadata: None,
        }
    }

    pub fn user(content: Content) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: Content) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: Content) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_metadata(mut self, metadata: SubagentMeta) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::SubagentAssistant).unwrap(),
            "\"subagent_assistant\""
        );
        assert_eq!(serde_json::to_string(&Role::ToolResult).unwrap(), "\"tool_result\"");
    }

    #[test]
    fn test_content_from_text() {
        let c = Content::from_text("hello");
        assert_eq!(c.kind, ContentKind::Text);
        assert_eq!(c.text, "hello");
        assert_eq!(c.parts, vec![Part::Text { text: "hello".into() }]);
    }

    #[test]
    fn test_blank_content() {
        assert!(Content::empty().is_blank());
        assert!(Content::from_text("  \n ").is_blank());
        assert!(!Content::from_text("x").is_blank());
    }

    #[test]
    fn test_message_builders() {
        let msg = Message::user(Content::from_text("hi")).with_timestamp("2026-08-01T10:00:00Z");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.timestamp, "2026-08-01T10:00:00Z");
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_message_serialization_omits_none_metadata() {
        let msg = Message::user(Content::from_text("hi"));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn test_unknown_part_deserialization() {
        let json = r#"{"type":"future_block_type","data":"something"}"#;
        let part: Part = serde_json::from_str(json).unwrap();
        assert!(matches!(part, Part::Unknown));
    }

    #[test]
    fn test_subagent_roles() {
        assert!(Role::SubagentUser.is_subagent());
        assert!(Role::SubagentAssistant.is_subagent());
        assert!(!Role::Assistant.is_subagent());
    }
}
