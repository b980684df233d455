// crates/core/src/tail.rs
//! Checkpointed incremental reads of a growing session file.
//!
//! A [`TailIngester`] bootstraps by parsing the whole file once, then on each
//! poll reads only the newly appended bytes. Only complete, newline-terminated
//! lines are parsed: a trailing fragment with no terminator is a partial write
//! and is left for a later poll. The checkpoint advances past fully consumed
//! lines only.
//!
//! Growth detection is by file size alone. Rotation and truncation are not
//! handled: if the file is replaced by a smaller one, polls are no-ops until
//! it grows past the stored offset again, at which point the offsets no
//! longer mean what they did. This uses synchronous I/O; drive it from
//! `tokio::task::spawn_blocking` in async contexts.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memchr::memrchr;
use tracing::warn;

use crate::error::ParseError;
use crate::parser::RecordParser;
use crate::types::Message;

/// How much of the session file has been consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// First byte not yet consumed. Always at a line boundary.
    pub offset: u64,
    /// File size observed at the last read.
    pub file_size: u64,
}

/// Incremental reader owning the checkpoint and the parse-session state.
pub struct TailIngester {
    path: PathBuf,
    checkpoint: Checkpoint,
    parser: RecordParser,
    detailed: bool,
}

impl TailIngester {
    pub fn new(path: impl Into<PathBuf>, detailed: bool) -> Self {
        Self {
            path: path.into(),
            checkpoint: Checkpoint::default(),
            parser: RecordParser::new(detailed),
            detailed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Parse the file from the beginning, resetting checkpoint and
    /// cross-reference state. Returns the history in file order.
    pub fn bootstrap(&mut self) -> Result<Vec<Message>, ParseError> {
        self.checkpoint = Checkpoint::default();
        self.parser = RecordParser::new(self.detailed);
        self.read_appended()
    }

    /// Read and parse whatever complete lines were appended since the last
    /// call. No-op when the file size is unchanged.
    pub fn poll(&mut self) -> Result<Vec<Message>, ParseError> {
        self.read_appended()
    }

    fn read_appended(&mut self) -> Result<Vec<Message>, ParseError> {
        let mut file = File::open(&self.path).map_err(|e| ParseError::io(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| ParseError::io(&self.path, e))?
            .len();

        if len == self.checkpoint.file_size {
            return Ok(Vec::new());
        }
        self.checkpoint.file_size = len;

        if len <= self.checkpoint.offset {
            warn!(
                path = %self.path.display(),
                offset = self.checkpoint.offset,
                file_size = len,
                "Session file shrank below checkpoint; tailing suspended until it regrows"
            );
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.checkpoint.offset))
            .map_err(|e| ParseError::io(&self.path, e))?;
        let to_read = (len - self.checkpoint.offset) as usize;
        let mut buf = vec![0u8; to_read];
        file.read_exact(&mut buf)
            .map_err(|e| ParseError::io(&self.path, e))?;

        // Everything past the last newline is a partial write; hold it back.
        let Some(last_newline) = memrchr(b'\n', &buf) else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::new();
        for raw_line in buf[..=last_newline].split(|&b| b == b'\n') {
            if raw_line.is_empty() {
                continue;
            }
            let line = String::from_utf8_lossy(raw_line);
            if let Some(message) = self.parser.parse_line(&line) {
                messages.push(message);
            }
        }

        self.checkpoint.offset += last_newline as u64 + 1;
        Ok(messages)
    }
}
