//! Durable per-link attempt and result tracking
//!
//! Two tracker shapes, one per ingestion source:
//! - [`FileResultLog`] — the file-watcher variant's plain-text trace: the
//!   result file is truncated at the start of each batch, every attempt
//!   appends a separator and a pending line, every outcome appends a boolean.
//! - [`GotifyTracker`] — the notification variant: a JSON status log
//!   ([`StatusLog`]) holding one `{link, output_directory, status}` entry per
//!   request, transitioned `waiting` → `downloaded`/`error`, plus user-facing
//!   push notifications before and after each download (the "downloading"
//!   notification is deleted once a terminal one is sent).
//!
//! Tracker failures are absorbed here: they are logged and the batch
//! continues. Losing a trace line is better than abandoning a download.

use crate::error::{Error, Result};
use crate::gotify::GotifyClient;
use crate::types::{DownloadStatus, LinkRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Width reserved for the boolean outcome when sizing a separator line
const OUTCOME_WIDTH: usize = 5;

/// Durable record of download attempts and outcomes
///
/// The orchestrator drives one tracker per batch: `batch_started` once,
/// then `attempt_started`/`record` around every download, in batch order.
#[async_trait]
pub trait ResultTracker: Send {
    /// Called once before the first download of a batch
    async fn batch_started(&mut self);

    /// Called right before a download attempt begins
    async fn attempt_started(&mut self, request: &LinkRequest);

    /// Called once the attempt finished, with its outcome
    async fn record(&mut self, request: &LinkRequest, succeeded: bool);
}

/// Plain-text result trace for the file-watcher source
pub struct FileResultLog {
    path: PathBuf,
}

impl FileResultLog {
    /// Create a tracker appending to the given result file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn append(&self, text: &str) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl ResultTracker for FileResultLog {
    async fn batch_started(&mut self) {
        info!(file = %self.path.display(), "truncating download result file");
        if let Err(error) = tokio::fs::write(&self.path, b"").await {
            warn!(
                file = %self.path.display(),
                error = %error,
                "could not truncate download result file"
            );
        }
    }

    async fn attempt_started(&mut self, request: &LinkRequest) {
        let text = format!("{} {} ", request.link, request.output_dir.display());
        let separator = "*".repeat(text.len() + OUTCOME_WIDTH);
        if let Err(error) = self.append(&format!("{separator}\n{text}")).await {
            warn!(
                file = %self.path.display(),
                error = %error,
                "could not write attempt status to result file"
            );
        }
    }

    async fn record(&mut self, _request: &LinkRequest, succeeded: bool) {
        if let Err(error) = self.append(if succeeded { "true\n" } else { "false\n" }).await {
            warn!(
                file = %self.path.display(),
                error = %error,
                "could not write download result to result file"
            );
        }
    }
}

/// One entry of the JSON status log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEntry {
    /// The requested link
    pub link: String,
    /// Directory the download was destined for
    pub output_directory: PathBuf,
    /// Current state of the attempt
    pub status: DownloadStatus,
}

/// JSON-array status log, the notification variant's durable source of truth
///
/// Every mutation rewrites the whole array through a temporary file and an
/// atomic rename, so the log stays syntactically valid JSON even when a write
/// is cut short. Operators read this file directly.
pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    /// Create a status log backed by the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Seed the log with an empty array when the file does not exist yet
    pub async fn ensure_exists(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.store(&[]).await
    }

    /// Append a `waiting` entry for a fresh attempt
    pub async fn append_waiting(&self, request: &LinkRequest) -> Result<()> {
        let mut entries = self.load().await?;
        entries.push(StatusEntry {
            link: request.link.clone(),
            output_directory: request.output_dir.clone(),
            status: DownloadStatus::Waiting,
        });
        self.store(&entries).await
    }

    /// Transition every entry for `link` to its terminal status
    pub async fn record_outcome(&self, link: &str, succeeded: bool) -> Result<()> {
        let mut entries = self.load().await?;
        let status = if succeeded {
            DownloadStatus::Downloaded
        } else {
            DownloadStatus::Error
        };
        for entry in entries.iter_mut().filter(|entry| entry.link == link) {
            entry.status = status;
        }
        self.store(&entries).await
    }

    /// Read and decode the whole log
    pub async fn load(&self) -> Result<Vec<StatusEntry>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|error| {
                Error::StatusLog(format!(
                    "could not read {}: {error}",
                    self.path.display()
                ))
            })?;
        serde_json::from_str(&data).map_err(|error| {
            Error::StatusLog(format!(
                "could not decode {}: {error}",
                self.path.display()
            ))
        })
    }

    /// Rewrite the whole log atomically
    async fn store(&self, entries: &[StatusEntry]) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, format!("{data}\n"))
            .await
            .map_err(|error| {
                Error::StatusLog(format!("could not write {}: {error}", tmp.display()))
            })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|error| {
            Error::StatusLog(format!(
                "could not replace {}: {error}",
                self.path.display()
            ))
        })
    }
}

/// Result tracker for the notification source: JSON status log plus push
/// notifications around every download
pub struct GotifyTracker {
    status: StatusLog,
    client: GotifyClient,
    markdown: bool,
    /// Id of the in-flight "downloading" notification, deleted on completion
    pending_notification: Option<i64>,
}

impl GotifyTracker {
    /// Create a tracker pushing through `client` and logging to `status`
    pub fn new(status: StatusLog, client: GotifyClient, markdown: bool) -> Self {
        Self {
            status,
            client,
            markdown,
            pending_notification: None,
        }
    }

    fn before_text(&self, request: &LinkRequest) -> String {
        let name = request.display_name();
        let dir = request.output_dir.display();
        if self.markdown {
            format!("Downloading \n**{name}** \nto \n**{dir}**")
        } else {
            format!("Downloading {name} to {dir}")
        }
    }

    fn after_text(&self, request: &LinkRequest, succeeded: bool) -> String {
        let prefix = if succeeded { "Downloaded" } else { "Error downloading" };
        let name = request.display_name();
        let dir = request.output_dir.display();
        if self.markdown {
            format!("{prefix} \n**{name}** \nto \n**{dir}**")
        } else {
            format!("{prefix} {name} to {dir}")
        }
    }
}

#[async_trait]
impl ResultTracker for GotifyTracker {
    async fn batch_started(&mut self) {
        if let Err(error) = self.status.ensure_exists().await {
            warn!(error = %error, "could not initialize download status log");
        }
    }

    async fn attempt_started(&mut self, request: &LinkRequest) {
        if let Err(error) = self.status.append_waiting(request).await {
            warn!(link = %request.link, error = %error, "could not record waiting status");
        }
        // Remember the id so the stale "downloading" note can be cleaned up
        self.pending_notification = self
            .client
            .create_message(&self.before_text(request))
            .await
            .ok();
    }

    async fn record(&mut self, request: &LinkRequest, succeeded: bool) {
        if let Err(error) = self.status.record_outcome(&request.link, succeeded).await {
            warn!(link = %request.link, error = %error, "could not record download outcome");
        }
        if let Some(id) = self.pending_notification.take() {
            // Failure already logged at the HTTP boundary; the terminal
            // notification still goes out
            let _ = self.client.delete_message(id).await;
        }
        let _ = self
            .client
            .create_message(&self.after_text(request, succeeded))
            .await;
    }
}
