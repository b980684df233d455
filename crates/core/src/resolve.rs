// crates/core/src/resolve.rs
//! Session-scoped cross-reference tables.
//!
//! Tool results and subagent progress records reference tool-use ids declared
//! on earlier assistant lines. These tables are created when a parse session
//! starts, written only by the record parser, and discarded with the session.
//! Entries are never removed; lookups for unseen ids return `""`.

use std::collections::HashMap;

/// The tool whose invocation spawns a nested sub-conversation.
pub const SPAWN_TOOL: &str = "Task";

/// Input key carrying the subagent kind on a spawn tool use.
pub const SPAWN_KIND_KEY: &str = "subagent_type";

#[derive(Debug, Default)]
pub struct ResolutionTables {
    tool_name_by_id: HashMap<String, String>,
    subagent_kind_by_id: HashMap<String, String>,
}

impl ResolutionTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tool name for a tool-use id. Idempotent; a duplicate id
    /// overwrites the previous name.
    pub fn record_tool_use(&mut self, id: &str, name: &str) {
        if !id.is_empty() && !name.is_empty() {
            self.tool_name_by_id.insert(id.to_string(), name.to_string());
        }
    }

    /// Register the subagent kind spawned by a tool-use id.
    pub fn record_spawn(&mut self, id: &str, kind: &str) {
        if !id.is_empty() && !kind.is_empty() {
            self.subagent_kind_by_id.insert(id.to_string(), kind.to_string());
        }
    }

    pub fn resolve_name(&self, id: &str) -> &str {
        self.tool_name_by_id.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn resolve_spawn_kind(&self, id: &str) -> &str {
        self.subagent_kind_by_id.get(id).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_ids_resolve_empty() {
        let tables = ResolutionTables::new();
        assert_eq!(tables.resolve_name("toolu_missing"), "");
        assert_eq!(tables.resolve_spawn_kind("toolu_missing"), "");
    }

    #[test]
    fn test_record_and_resolve() {
        let mut tables = ResolutionTables::new();
        tables.record_tool_use("t1", "Read");
        tables.record_spawn("t1", "researcher");
        assert_eq!(tables.resolve_name("t1"), "Read");
        assert_eq!(tables.resolve_spawn_kind("t1"), "researcher");
    }

    #[test]
    fn test_duplicate_id_overwrites() {
        let mut tables = ResolutionTables::new();
        tables.record_tool_use("t1", "Read");
        tables.record_tool_use("t1", "Write");
        assert_eq!(tables.resolve_name("t1"), "Write");
    }

    #[test]
    fn test_empty_id_or_name_ignored() {
        let mut tables = ResolutionTables::new();
        tables.record_tool_use("", "Read");
        tables.record_tool_use("t1", "");
        assert_eq!(tables.resolve_name(""), "");
        assert_eq!(tables.resolve_name("t1"), "");
    }
}
