//! Download command execution
//!
//! The orchestrator only knows the [`DownloadExecutor`] trait: hand it a link,
//! get back whether the download succeeded. The stock implementation,
//! [`CommandExecutor`], substitutes the link into a user-supplied command
//! template and runs it through the platform shell inside the temporary
//! download directory. Success is the process exiting with status 0 — nothing
//! else is inspected.

use crate::config::LINK_PLACEHOLDER;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Strategy for fetching a single link
///
/// Implementations are driven strictly sequentially; the engine never invokes
/// an executor concurrently with itself.
#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    /// Download one link, reporting whether the attempt succeeded
    ///
    /// # Errors
    /// Returns an error when the attempt could not even be started (e.g. the
    /// command failed to spawn). Callers treat that as a failed download.
    async fn download(&self, link: &str) -> Result<bool>;
}

/// Executor that runs a templated shell command per link
pub struct CommandExecutor {
    /// Command template containing the `{link}` placeholder
    template: String,

    /// Working directory the command runs in (the temporary download dir)
    workdir: PathBuf,
}

impl CommandExecutor {
    /// Create an executor for the given command template and working directory
    pub fn new(template: String, workdir: PathBuf) -> Self {
        Self { template, workdir }
    }

    fn render(&self, link: &str) -> String {
        self.template.replace(LINK_PLACEHOLDER, link)
    }
}

/// Build a platform-shell invocation of `command`
pub(crate) fn shell_command(command: &str) -> tokio::process::Command {
    #[cfg(unix)]
    {
        let mut process = tokio::process::Command::new("sh");
        process.arg("-c").arg(command);
        process
    }
    #[cfg(windows)]
    {
        let mut process = tokio::process::Command::new("cmd");
        process.arg("/C").arg(command);
        process
    }
}

#[async_trait]
impl DownloadExecutor for CommandExecutor {
    async fn download(&self, link: &str) -> Result<bool> {
        let command = self.render(link);
        info!(command = %command, "attempt to run download command");

        let status = shell_command(&command)
            .current_dir(&self.workdir)
            .status()
            .await
            .map_err(|error| Error::Executor(format!("could not run {command:?}: {error}")))?;

        if status.success() {
            info!(link = %link, "link downloaded");
            Ok(true)
        } else {
            warn!(link = %link, code = ?status.code(), "could not download the link");
            Ok(false)
        }
    }
}
