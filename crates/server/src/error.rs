// crates/server/src/error.rs
use std::net::SocketAddr;

use claude_scribe_core::error::ParseError;
use thiserror::Error;

/// Errors that can occur while starting or running a watch session
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to load session for watching: {0}")]
    Bootstrap(#[from] ParseError),

    #[error("Failed to bind watch server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Watch server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Watch bootstrap task failed")]
    TaskFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_error_wraps_parse_error() {
        let err = WatchError::from(ParseError::not_found("/missing.jsonl"));
        assert!(err.to_string().contains("/missing.jsonl"));
    }
}
