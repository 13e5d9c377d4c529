//! Watched link-specification file source
//!
//! Polls a local text file for modification and parses it into download
//! requests. Each poll tick compares the file's mtime against the last
//! observed value:
//! - file absent → a diagnostic, no requests, stored state cleared
//! - mtime unchanged → no requests
//! - mtime changed (or first observation) → re-read and parse the file
//!
//! After a fully successful batch the source truncates the link file so the
//! operator's next edit starts clean. That truncation changes the file's
//! mtime, so a suppression flag swallows exactly one subsequent "modified"
//! detection — the engine's own write must not be mistaken for a new edit.

use crate::types::{LinkRequest, parse_request_line};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{info, warn};

/// Link source backed by a watched specification file
pub struct FileSource {
    /// Path of the watched link-specification file
    link_file: PathBuf,

    /// Output directory prefix that per-line paths are joined under
    prefix: PathBuf,

    /// mtime observed on the previous tick; `None` means unknown
    last_modified: Option<SystemTime>,

    /// Swallow the next modification event (caused by our own truncation)
    suppress_next_change: bool,
}

impl FileSource {
    /// Create a file source watching `link_file`, joining paths under `prefix`
    pub fn new(link_file: PathBuf, prefix: PathBuf) -> Self {
        Self {
            link_file,
            prefix,
            last_modified: None,
            suppress_next_change: false,
        }
    }

    /// Check the link file once and parse it if it changed
    ///
    /// Returns the parsed batch when a real modification is detected, `None`
    /// otherwise. I/O failures are reported and yield `None`; they never
    /// escape to the poll loop.
    pub async fn check(&mut self) -> Option<Vec<LinkRequest>> {
        let metadata = match tokio::fs::metadata(&self.link_file).await {
            Ok(metadata) => metadata,
            Err(_) => {
                warn!(file = %self.link_file.display(), "could not find link file");
                self.last_modified = None;
                return None;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(error) => {
                warn!(
                    file = %self.link_file.display(),
                    error = %error,
                    "could not read link file modification time"
                );
                return None;
            }
        };

        if self.last_modified == Some(modified) {
            return None;
        }
        self.last_modified = Some(modified);

        if self.suppress_next_change {
            // Our own truncation, not an operator edit
            self.suppress_next_change = false;
            return None;
        }

        self.read_requests().await
    }

    /// Read and parse the link file into a batch
    async fn read_requests(&self) -> Option<Vec<LinkRequest>> {
        let contents = match tokio::fs::read_to_string(&self.link_file).await {
            Ok(contents) => contents,
            Err(error) => {
                warn!(
                    file = %self.link_file.display(),
                    error = %error,
                    "could not open link file for reading"
                );
                return None;
            }
        };
        let requests: Vec<LinkRequest> = contents
            .lines()
            .flat_map(|line| parse_request_line(line, &self.prefix))
            .collect();
        Some(requests)
    }

    /// Truncate the link file after a fully successful batch
    ///
    /// Arms the suppression flag so the mtime change caused by this write is
    /// not re-parsed as a new batch on the next tick. Truncation failure is
    /// reported and leaves the flag unarmed; the batch simply stays in the
    /// file and will be re-detected.
    pub async fn truncate_after_success(&mut self) {
        info!(file = %self.link_file.display(), "truncating link file");
        match tokio::fs::write(&self.link_file, b"").await {
            Ok(()) => {
                self.suppress_next_change = true;
            }
            Err(error) => {
                warn!(
                    file = %self.link_file.display(),
                    error = %error,
                    "could not open link file for truncating"
                );
            }
        }
    }
}
