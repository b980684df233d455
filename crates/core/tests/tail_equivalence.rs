//! Whole-file parsing and incremental tailing must agree: re-parsing a
//! complete file from scratch yields the same message sequence as polling the
//! same bytes delivered at arbitrary chunk boundaries.

use std::io::Write;

use claude_scribe_core::parser::parse_session_with_options;
use claude_scribe_core::tail::TailIngester;
use serde_json::json;
use tempfile::NamedTempFile;

fn session_lines() -> Vec<String> {
    let records = vec![
        json!({
            "type": "user",
            "message": {"role": "user", "content": "hello"},
            "timestamp": "2026-08-01T10:00:00Z",
        }),
        json!({
            "type": "assistant",
            "message": {"role": "assistant", "content": [
                {"type": "text", "text": "hi there"},
                {"type": "tool_use", "id": "t1544", "name": "Read", "input": {"file": "a.py"}},
            ]},
            "timestamp": "2026-08-01T10:00:01Z",
        }),
        json!({"type": "not-json-anyone-knows", "x": 1}),
        json!({
            "type": "user",
            "message": {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "t1544", "content": "print('hi')"},
            ]},
            "timestamp": "2026-08-01T10:00:02Z",
        }),
        json!({
            "type": "assistant",
            "message": {"role": "assistant", "content": [
                {"type": "thinking", "thinking": "short file"},
                {"type": "text", "text": "that file is tiny"},
            ]},
            "timestamp": "2026-08-01T10:00:03Z",
        }),
    ];
    let mut lines: Vec<String> = records.iter().map(|r| format!("{r}\n")).collect();
    // A malformed line in the middle must not disturb either path.
    lines.insert(2, "{ definitely not json\n".to_string());
    lines
}

#[tokio::test]
async fn whole_file_parse_equals_chunked_polling() {
    let full: String = session_lines().concat();

    // Path A: whole file at once.
    let mut whole = NamedTempFile::new().unwrap();
    whole.write_all(full.as_bytes()).unwrap();
    whole.flush().unwrap();
    let expected = parse_session_with_options(whole.path(), true).await.unwrap();
    assert!(!expected.is_empty());

    // Path B: incremental delivery at hostile chunk boundaries (mid-line,
    // single bytes, everything-at-once tail).
    let mut grown = NamedTempFile::new().unwrap();
    let mut ingester = TailIngester::new(grown.path(), true);
    let mut collected = ingester.bootstrap().unwrap();

    let bytes = full.as_bytes();
    let mut written: usize = 0;
    for chunk_len in [3usize, 1, 150, 42, 1, 7, usize::MAX] {
        let end = written.saturating_add(chunk_len).min(bytes.len());
        grown.write_all(&bytes[written..end]).unwrap();
        grown.flush().unwrap();
        written = end;
        collected.extend(ingester.poll().unwrap());
        if written == bytes.len() {
            break;
        }
    }

    assert_eq!(collected, expected);
}

#[tokio::test]
async fn bootstrap_alone_equals_whole_file_parse() {
    let full: String = session_lines().concat();
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(full.as_bytes()).unwrap();
    f.flush().unwrap();

    let expected = parse_session_with_options(f.path(), true).await.unwrap();
    let mut ingester = TailIngester::new(f.path(), true);
    assert_eq!(ingester.bootstrap().unwrap(), expected);
}
