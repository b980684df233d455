// crates/server/src/main.rs
//! claude-scribe binary.
//!
//! Extracts clean conversation logs from Claude Code's JSONL session files
//! and can serve a live-updating HTML view of a session that is still being
//! written. Subcommands: `list`, `export`, `search`, `watch`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use claude_scribe_core::discovery::{
    claude_projects_dir, conversation_preview, find_session_by_id, find_sessions,
};
use claude_scribe_core::export::{save_conversation, ExportFormat};
use claude_scribe_core::parser::{parse_session, parse_session_with_options};
use claude_scribe_core::types::Role;
use claude_scribe_server::{router, WatchError, WatchSession};

/// Default port for the watch server.
const DEFAULT_PORT: u16 = 8765;

#[derive(Parser)]
#[command(
    name = "claude-scribe",
    version,
    about = "Extract, export, and live-watch Claude Code conversation logs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recent sessions with previews
    List {
        /// Show at most this many sessions (default: all)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Export sessions as markdown, JSON, or HTML artifacts
    Export {
        /// 1-based session numbers from `list`, comma-separated
        #[arg(long, value_delimiter = ',')]
        sessions: Vec<usize>,
        /// Export the N most recent sessions
        #[arg(long, conflicts_with = "sessions")]
        recent: Option<usize>,
        /// Export every discovered session
        #[arg(long, conflicts_with_all = ["sessions", "recent"])]
        all: bool,
        /// Export a specific JSONL file instead of discovering sessions
        #[arg(long)]
        input: Option<PathBuf>,
        /// Export the session with this id (searched under ~/.claude/projects)
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, value_enum, default_value_t = FormatArg::Markdown)]
        format: FormatArg,
        /// Include tool use, tool results, and system messages
        #[arg(long)]
        detailed: bool,
        /// Output directory (default: ./claude-logs)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Search conversation text projections
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = SpeakerArg::Both)]
        speaker: SpeakerArg,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long, default_value_t = 30)]
        max_results: usize,
    },
    /// Serve a live-updating HTML view of a session
    Watch {
        /// Session id to watch (searched under ~/.claude/projects)
        session_id: Option<String>,
        /// Watch a specific JSONL file instead
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
        /// Do not open the browser automatically
        #[arg(long)]
        no_open: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
    Html,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Html => ExportFormat::Html,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SpeakerArg {
    Human,
    Assistant,
    Both,
}

impl SpeakerArg {
    fn matches(self, role: Role) -> bool {
        match self {
            SpeakerArg::Human => role == Role::User,
            SpeakerArg::Assistant => role == Role::Assistant,
            SpeakerArg::Both => matches!(role, Role::User | Role::Assistant),
        }
    }
}

/// Watch server port: CLI flag, then env overrides, then the default.
fn get_port(cli: Option<u16>) -> u16 {
    cli.or_else(|| {
        std::env::var("CLAUDE_SCRIBE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
    })
    .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
    .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::List { limit } => cmd_list(limit).await,
        Command::Export {
            sessions,
            recent,
            all,
            input,
            session_id,
            format,
            detailed,
            output,
        } => {
            cmd_export(
                sessions,
                recent,
                all,
                input,
                session_id,
                format.into(),
                detailed,
                output,
            )
            .await
        }
        Command::Search {
            query,
            speaker,
            case_sensitive,
            max_results,
        } => cmd_search(&query, speaker, case_sensitive, max_results).await,
        Command::Watch {
            session_id,
            input,
            port,
            no_open,
        } => cmd_watch(session_id, input, port, no_open).await,
    }
}

async fn cmd_list(limit: Option<usize>) -> Result<()> {
    let projects_dir = claude_projects_dir()?;
    let sessions = find_sessions(&projects_dir);

    if sessions.is_empty() {
        println!("No Claude sessions found in {}", projects_dir.display());
        println!("Make sure you've used Claude Code and have conversations saved.");
        return Ok(());
    }

    println!("\n📚 Found {} Claude sessions:\n", sessions.len());
    let shown = limit.unwrap_or(sessions.len()).min(sessions.len());

    for (i, session) in sessions.iter().take(shown).enumerate() {
        let modified: DateTime<Local> = session.modified_at.into();
        let (preview, record_count) = conversation_preview(&session.path).await;
        let short_id: String = session.session_id.chars().take(8).collect();

        println!("\n{}. 📁 {}", i + 1, session.project);
        println!("   📄 Session: {short_id}...");
        println!("   📅 Modified: {}", modified.format("%Y-%m-%d %H:%M"));
        println!("   💬 Records: {record_count}");
        println!("   💾 Size: {:.1} KB", session.size_bytes as f64 / 1024.0);
        println!("   📝 Preview: \"{preview}\"");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_export(
    selected: Vec<usize>,
    recent: Option<usize>,
    all: bool,
    input: Option<PathBuf>,
    session_id: Option<String>,
    format: ExportFormat,
    detailed: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let output_dir = match output {
        Some(dir) => dir,
        None => std::env::current_dir()?.join("claude-logs"),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create output directory {}", output_dir.display()))?;

    let targets: Vec<PathBuf> = if let Some(path) = input {
        if !path.is_file() {
            bail!("File not found: {}", path.display());
        }
        vec![path]
    } else if let Some(id) = session_id {
        let projects_dir = claude_projects_dir()?;
        vec![find_session_by_id(&projects_dir, &id)
            .with_context(|| format!("Session not found: {id}"))?]
    } else {
        let sessions = find_sessions(&claude_projects_dir()?);
        if all {
            sessions.into_iter().map(|s| s.path).collect()
        } else if let Some(n) = recent {
            sessions.into_iter().take(n).map(|s| s.path).collect()
        } else if !selected.is_empty() {
            let mut paths = Vec::new();
            for number in selected {
                match number.checked_sub(1).and_then(|i| sessions.get(i)) {
                    Some(session) => paths.push(session.path.clone()),
                    None => eprintln!("❌ Invalid session number: {number}"),
                }
            }
            paths
        } else {
            bail!("Nothing selected: pass --sessions, --recent, --all, --input, or --session-id");
        }
    };

    println!("\n📤 Exporting {} session(s)...", targets.len());
    if detailed {
        println!("📋 Including tool use and system messages");
    }

    let mut success = 0usize;
    for path in &targets {
        let session_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string());

        let messages = match parse_session_with_options(path, detailed).await {
            Ok(messages) => messages,
            Err(e) => {
                eprintln!("❌ {}: {e}", path.display());
                continue;
            }
        };
        if messages.is_empty() {
            println!("⏭️  Skipped {} (no conversation)", path.display());
            continue;
        }

        let count = messages.len();
        match save_conversation(&messages, &session_id, &output_dir, format) {
            Ok(artifact) => {
                success += 1;
                let name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("✅ {success}/{}: {name} ({count} messages)", targets.len());
            }
            Err(e) => eprintln!("❌ {}: {e}", path.display()),
        }
    }

    println!("\n✅ Successfully exported {success}/{} sessions", targets.len());
    Ok(())
}

async fn cmd_search(
    query: &str,
    speaker: SpeakerArg,
    case_sensitive: bool,
    max_results: usize,
) -> Result<()> {
    let projects_dir = claude_projects_dir()?;
    let needle = if case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };

    println!("🔍 Searching for: {query}");
    let mut total = 0usize;
    let mut files_with_hits = 0usize;

    for session in find_sessions(&projects_dir) {
        if total >= max_results {
            break;
        }
        let Ok(messages) = parse_session(&session.path).await else {
            continue;
        };

        let mut first_hit: Option<(Role, String)> = None;
        let mut hits = 0usize;
        for message in &messages {
            if !speaker.matches(message.role) {
                continue;
            }
            let haystack = if case_sensitive {
                message.content.text.clone()
            } else {
                message.content.text.to_lowercase()
            };
            if haystack.contains(&needle) {
                hits += 1;
                if first_hit.is_none() {
                    let snippet: String = message.content.text.chars().take(100).collect();
                    first_hit = Some((message.role, snippet.replace('\n', " ")));
                }
            }
        }

        if let Some((role, snippet)) = first_hit {
            files_with_hits += 1;
            total += hits;
            println!("\n{files_with_hits}. 📄 {} ({hits} matches)", session.project);
            let speaker_label = match role {
                Role::User => "human",
                _ => "assistant",
            };
            println!("   {speaker_label}: {snippet}...");
        }
    }

    if total == 0 {
        println!("❌ No matches found.");
    } else {
        println!("\n✅ Found {total} matches across {files_with_hits} conversations");
    }
    Ok(())
}

async fn cmd_watch(
    session_id: Option<String>,
    input: Option<PathBuf>,
    port: Option<u16>,
    no_open: bool,
) -> Result<()> {
    let path = if let Some(path) = input {
        path
    } else if let Some(id) = session_id {
        let projects_dir = claude_projects_dir()?;
        find_session_by_id(&projects_dir, &id).with_context(|| format!("Session not found: {id}"))?
    } else {
        bail!("Provide a session id or --input path");
    };

    println!("👁  Loading: {}", path.display());
    let session = WatchSession::start(path).await?;
    let state = session.state();
    println!("   Messages loaded: {}", state.message_count().await);

    let port = get_port(port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| WatchError::Bind { addr, source })?;

    let url = format!("http://localhost:{port}");
    println!("🌐 Watch server: {url}");
    println!("Press Ctrl+C to stop...");
    if !no_open {
        let _ = open::that(&url);
    }

    axum::serve(listener, router(state))
        .await
        .map_err(WatchError::Serve)?;
    drop(session);
    Ok(())
}
