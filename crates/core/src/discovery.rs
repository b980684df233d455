// crates/core/src/discovery.rs
//! Session discovery and previews.
//!
//! Thin collaborators around the core: scan `~/.claude/projects/` for session
//! files, look one up by id, and pull a one-line preview of the first real
//! user message. Nothing here feeds back into parsing — the core only ever
//! receives a resolved file path.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex_lite::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use walkdir::WalkDir;

use crate::error::DiscoveryError;

/// Returns the path to the Claude projects directory (~/.claude/projects).
pub fn claude_projects_dir() -> Result<PathBuf, DiscoveryError> {
    let home = dirs::home_dir().ok_or(DiscoveryError::HomeDirNotFound)?;
    Ok(home.join(".claude").join("projects"))
}

/// A discovered session file with listing metadata.
#[derive(Debug, Clone)]
pub struct SessionListing {
    pub path: PathBuf,
    /// Parent directory name (the encoded project).
    pub project: String,
    /// File stem, which is the session id.
    pub session_id: String,
    pub modified_at: SystemTime,
    pub size_bytes: u64,
}

/// Find all `.jsonl` session files under `search_dir`, newest first.
pub fn find_sessions(search_dir: &Path) -> Vec<SessionListing> {
    let mut sessions: Vec<SessionListing> = WalkDir::new(search_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jsonl"))
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            let path = e.path().to_path_buf();
            Some(SessionListing {
                project: path
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                session_id: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                modified_at: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size_bytes: meta.len(),
                path,
            })
        })
        .collect();

    sessions.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    sessions
}

/// Find a session file by its id (filename stem).
pub fn find_session_by_id(search_dir: &Path, session_id: &str) -> Option<PathBuf> {
    let target = format!("{session_id}.jsonl");
    WalkDir::new(search_dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| {
            e.file_type().is_file()
                && e.path().file_name().and_then(|n| n.to_str()) == Some(target.as_str())
        })
        .map(|e| e.path().to_path_buf())
}

/// First real user message (up to 100 chars) and the record count.
///
/// Skips tool results, interruption notices, session-continuation
/// boilerplate, running-command echoes, and XML-ish envelope tags, so the
/// preview shows what the human actually typed.
pub async fn conversation_preview(path: &Path) -> (String, usize) {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();

    let Ok(file) = File::open(path).await else {
        return ("No preview available".to_string(), 0);
    };
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut preview = String::new();
    let mut record_count = 0usize;

    while let Ok(Some(line)) = lines.next_line().await {
        record_count += 1;
        if !preview.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if value.get("type").and_then(|t| t.as_str()) != Some("user") {
            continue;
        }
        let Some(msg) = value.get("message") else { continue };
        if msg.get("role").and_then(|r| r.as_str()) != Some("user") {
            continue;
        }

        let candidates: Vec<String> = match msg.get("content") {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter(|i| i.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|i| i.get("text").and_then(|t| t.as_str()))
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        for text in candidates {
            if let Some(found) = preview_from_text(&text, &tag_re) {
                preview = found;
                break;
            }
        }
    }

    if preview.is_empty() {
        preview = "No preview available".to_string();
    }
    (preview, record_count)
}

fn preview_from_text(text: &str, tag_re: &Regex) -> Option<String> {
    let mut text = text.trim().to_string();

    if text.starts_with("tool_use_id") || text.contains("[Request interrupted") {
        return None;
    }
    if text.to_lowercase().contains("session is being continued") {
        return None;
    }

    // Image references carry the real prompt after the tag.
    if text.starts_with("[Image #") {
        if let Some((_, rest)) = text.split_once(']') {
            text = rest.trim().to_string();
        }
    }

    let text = tag_re.replace_all(&text, "").trim().to_string();
    if text.contains("is running") && text.contains('…') {
        return None;
    }
    if text.len() <= 3 {
        return None;
    }

    Some(text.chars().take(100).collect::<String>().replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_session(dir: &Path, project: &str, id: &str, lines: &[serde_json::Value]) -> PathBuf {
        let project_dir = dir.join(project);
        std::fs::create_dir_all(&project_dir).unwrap();
        let path = project_dir.join(format!("{id}.jsonl"));
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        path
    }

    fn user_record(content: serde_json::Value) -> serde_json::Value {
        json!({"type": "user", "message": {"role": "user", "content": content}})
    }

    #[test]
    fn test_find_sessions_and_by_id() {
        let dir = tempdir().unwrap();
        write_session(dir.path(), "proj-a", "aaa111", &[user_record(json!("hello"))]);
        write_session(dir.path(), "proj-b", "bbb222", &[user_record(json!("world"))]);

        let sessions = find_sessions(dir.path());
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().any(|s| s.session_id == "aaa111" && s.project == "proj-a"));

        let found = find_session_by_id(dir.path(), "bbb222").unwrap();
        assert!(found.ends_with("proj-b/bbb222.jsonl"));
        assert!(find_session_by_id(dir.path(), "missing").is_none());
    }

    #[tokio::test]
    async fn test_preview_skips_boilerplate() {
        let dir = tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "proj",
            "ccc333",
            &[
                user_record(json!([{"type": "text", "text": "tool_use_id toolu_123 output"}])),
                user_record(json!("This session is being continued from a previous one")),
                user_record(json!("<local-command-stdout>ok</local-command-stdout>")),
                user_record(json!("fix the login bug please")),
            ],
        );

        let (preview, count) = conversation_preview(&path).await;
        assert_eq!(preview, "fix the login bug please");
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_preview_empty_file() {
        let dir = tempdir().unwrap();
        let path = write_session(dir.path(), "proj", "ddd444", &[]);
        let (preview, count) = conversation_preview(&path).await;
        assert_eq!(preview, "No preview available");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_preview_caps_length_and_flattens_newlines() {
        let dir = tempdir().unwrap();
        let long = "x".repeat(300);
        let path = write_session(
            dir.path(),
            "proj",
            "eee555",
            &[user_record(json!(format!("line one\nline two {long}")))],
        );
        let (preview, _) = conversation_preview(&path).await;
        assert!(preview.chars().count() <= 100);
        assert!(!preview.contains('\n'));
    }
}
