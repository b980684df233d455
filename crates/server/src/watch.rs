// crates/server/src/watch.rs
//! Live watch sessions: bootstrap the file's history, then follow appends.
//!
//! One background task per session runs the poll loop. It is the only writer
//! of the tail checkpoint, the resolution tables, and the rendered history —
//! viewers share nothing with it except the subscriber registry and read
//! access to the history.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use claude_scribe_core::export::PAGE_CSS;
use claude_scribe_core::render::render_message_html;
use claude_scribe_core::tail::TailIngester;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::broadcast::Broadcaster;
use crate::error::WatchError;

/// How often the poll loop checks the file for growth.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// State shared between the poll loop and the HTTP handlers.
#[derive(Debug)]
pub struct WatchState {
    path: PathBuf,
    session_id: String,
    broadcaster: Broadcaster,
    /// Rendered fragments in file order; written only by the poll loop.
    history: RwLock<Vec<String>>,
}

impl WatchState {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub async fn message_count(&self) -> usize {
        self.history.read().await.len()
    }

    /// The full bootstrap page: everything parsed so far, plus the script
    /// that appends streamed fragments.
    pub async fn bootstrap_document(&self) -> String {
        let history = self.history.read().await;
        build_page(&self.session_id, &self.path, &history)
    }
}

/// A running watch session. Dropping it stops the poll loop.
#[derive(Debug)]
pub struct WatchSession {
    state: Arc<WatchState>,
    poller: JoinHandle<()>,
}

impl WatchSession {
    /// Parse the whole file once, then start following appends.
    pub async fn start(path: PathBuf) -> Result<Self, WatchError> {
        let session_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string());

        // The watch pipeline always runs in detailed mode, so tool activity
        // shows up in the live view.
        let mut ingester = TailIngester::new(&path, true);
        let (ingester, bootstrap) = tokio::task::spawn_blocking(move || {
            let result = ingester.bootstrap();
            (ingester, result)
        })
        .await
        .map_err(|_| WatchError::TaskFailed)?;
        let messages = bootstrap?;

        let fragments: Vec<String> = messages.iter().map(render_message_html).collect();
        debug!(
            session_id = %session_id,
            messages = fragments.len(),
            "Watch bootstrap complete"
        );

        let state = Arc::new(WatchState {
            path,
            session_id,
            broadcaster: Broadcaster::new(),
            history: RwLock::new(fragments),
        });

        let poller = tokio::spawn(poll_loop(state.clone(), ingester));
        Ok(Self { state, poller })
    }

    pub fn state(&self) -> Arc<WatchState> {
        self.state.clone()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// Poll until the session ends. Each batch of new messages is rendered,
/// appended to history, and fanned out in file order.
async fn poll_loop(state: Arc<WatchState>, mut ingester: TailIngester) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let (returned, result) = match tokio::task::spawn_blocking(move || {
            let result = ingester.poll();
            (ingester, result)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Watch poll task failed; stopping ingestion");
                return;
            }
        };
        ingester = returned;

        match result {
            Ok(messages) => {
                if messages.is_empty() {
                    continue;
                }
                // History append and fan-out under one writer keeps the
                // bootstrap document and the stream consistent.
                let mut history = state.history.write().await;
                for message in &messages {
                    let fragment = render_message_html(message);
                    history.push(fragment.clone());
                    if let Ok(payload) = serde_json::to_string(&fragment) {
                        state.broadcaster.publish(&payload);
                    }
                }
            }
            Err(e) => {
                warn!(
                    path = %state.path.display(),
                    error = %e,
                    "Watch source unreadable; stopping ingestion for this session"
                );
                return;
            }
        }
    }
}

fn build_page(session_id: &str, path: &Path, fragments: &[String]) -> String {
    let short_id: String = session_id.chars().take(8).collect();
    let messages_html = fragments.concat();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Claude Watch — {short_id}</title>
    <style>{PAGE_CSS}
    </style>
</head>
<body>
    <div class="header">
        <h1>Claude Conversation — Live View</h1>
        <div class="metadata">
            <p>Session: {session_id}</p>
            <p>File: {file}</p>
            <p>Messages at load: {count}</p>
        </div>
    </div>
    <div id="messages">
{messages_html}
    </div>
    <div id="status-bar">🟢 Connected</div>
    <script>
        const es = new EventSource('/events');
        const statusBar = document.getElementById('status-bar');
        es.onmessage = function(e) {{
            const html = JSON.parse(e.data);
            document.getElementById('messages').insertAdjacentHTML('beforeend', html);
            window.scrollTo(0, document.body.scrollHeight);
        }};
        es.onerror = function() {{
            statusBar.textContent = '🔴 Disconnected — reload to reconnect';
        }};
        es.onopen = function() {{
            statusBar.textContent = '🟢 Connected';
        }};
    </script>
</body>
</html>"#,
        file = path.display(),
        count = fragments.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn user_line(text: &str) -> String {
        json!({
            "type": "user",
            "message": {"role": "user", "content": text},
            "timestamp": "2026-08-01T10:00:00Z",
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_start_fails_on_missing_file() {
        let err = WatchSession::start(PathBuf::from("/nonexistent/session.jsonl"))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::Bootstrap(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_document_contains_history() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", user_line("first question")).unwrap();
        f.flush().unwrap();

        let session = WatchSession::start(f.path().to_path_buf()).await.unwrap();
        let state = session.state();
        assert_eq!(state.message_count().await, 1);

        let page = state.bootstrap_document().await;
        assert!(page.contains("first question"));
        assert!(page.contains("Messages at load: 1"));
        assert!(page.contains("EventSource('/events')"));
    }

    #[tokio::test]
    async fn test_appended_lines_reach_subscribers_and_history() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", user_line("initial")).unwrap();
        f.flush().unwrap();

        let session = WatchSession::start(f.path().to_path_buf()).await.unwrap();
        let state = session.state();
        let mut sub = state.broadcaster().subscribe();

        writeln!(f, "{}", user_line("appended later")).unwrap();
        f.flush().unwrap();

        // The payload is the JSON-encoded HTML fragment.
        let payload = tokio::time::timeout(Duration::from_secs(5), sub.rx.recv())
            .await
            .expect("poll loop should publish within the timeout")
            .expect("subscriber channel closed");
        let fragment: String = serde_json::from_str(&payload).unwrap();
        assert!(fragment.contains("appended later"));

        assert_eq!(state.message_count().await, 2);
        // The bootstrap document now includes the appended message too.
        assert!(state.bootstrap_document().await.contains("appended later"));
    }
}
