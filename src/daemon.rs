//! The poll loop
//!
//! [`Daemon`] ties the pipeline together: one [`LinkSource`] produces batches
//! of requests, the [`Orchestrator`](crate::orchestrator::Orchestrator)
//! processes them, the source reacts to the outcomes, and the loop sleeps the
//! configured period between cycles. The loop runs until its cancellation
//! token fires, which is treated as a normal shutdown.

use crate::config::{Config, SourceConfig};
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::gotify::GotifyClient;
use crate::inbox::InboxSource;
use crate::link_file::FileSource;
use crate::orchestrator::Orchestrator;
use crate::relocate::Relocator;
use crate::results::{FileResultLog, GotifyTracker, ResultTracker, StatusLog};
use crate::types::{DownloadResult, LinkRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A front-end feeding batches of link requests into the pipeline
///
/// Implementations: the watched link file and the Gotify inbox. The daemon
/// polls the active source once per cycle and reports every batch's outcomes
/// back to it.
#[async_trait]
pub trait LinkSource: Send {
    /// Produce the next batch of requests, empty when nothing new arrived
    async fn poll(&mut self) -> Vec<LinkRequest>;

    /// React to the outcomes of a batch this source produced
    async fn batch_finished(&mut self, results: &[DownloadResult]);
}

#[async_trait]
impl LinkSource for FileSource {
    async fn poll(&mut self) -> Vec<LinkRequest> {
        self.check().await.unwrap_or_default()
    }

    async fn batch_finished(&mut self, results: &[DownloadResult]) {
        // Only a fully successful batch clears the operator's link file;
        // anything else stays visible for the next edit
        if !results.is_empty() && results.iter().all(|result| result.succeeded) {
            self.truncate_after_success().await;
        }
    }
}

#[async_trait]
impl LinkSource for InboxSource {
    async fn poll(&mut self) -> Vec<LinkRequest> {
        self.fetch().await
    }

    async fn batch_finished(&mut self, _results: &[DownloadResult]) {
        // The cursor already advanced during the fetch; failed downloads are
        // recorded in the status log, not re-queued
    }
}

/// The assembled download daemon
pub struct Daemon {
    source: Box<dyn LinkSource>,
    orchestrator: Orchestrator,
    check_period: Duration,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("check_period", &self.check_period)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    /// Validate the configuration and assemble the pipeline
    ///
    /// Creates the temporary download directory. Configuration violations and
    /// an uncreatable temporary directory are fatal; the caller reports them
    /// and exits without entering the loop.
    ///
    /// # Errors
    /// Returns [`Error::Config`](crate::error::Error::Config) for invalid
    /// settings, or an I/O error when the temporary directory cannot be
    /// created.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        if config.download.command == crate::config::DEFAULT_COMMAND {
            probe_default_downloader().await?;
        }
        tokio::fs::create_dir_all(&config.download.temp_dir).await?;

        let executor = Arc::new(CommandExecutor::new(
            config.download.command.clone(),
            config.download.temp_dir.clone(),
        ));
        let relocator = Relocator::new(config.download.temp_dir.clone());

        let (source, tracker): (Box<dyn LinkSource>, Box<dyn ResultTracker>) = match &config.source
        {
            SourceConfig::File(file) => {
                info!(
                    link_file = %file.link_file.display(),
                    "watching link file for download requests"
                );
                (
                    Box::new(FileSource::new(
                        file.link_file.clone(),
                        config.download.output_dir.clone(),
                    )),
                    Box::new(FileResultLog::new(file.result_file.clone())),
                )
            }
            SourceConfig::Gotify(gotify) => {
                info!(host = %gotify.host, application_id = %gotify.application_id,
                    "polling gotify inbox for download requests");
                let client =
                    GotifyClient::new(gotify.clone(), config.download.http_connect_timeout)?;
                let source = InboxSource::new(
                    client.clone(),
                    gotify.page_size,
                    config.download.output_dir.clone(),
                );
                let tracker = GotifyTracker::new(
                    StatusLog::new(gotify.status_file.clone()),
                    client,
                    gotify.markdown,
                );
                (Box::new(source), Box::new(tracker))
            }
        };

        Ok(Self {
            source,
            orchestrator: Orchestrator::new(executor, relocator, tracker),
            check_period: config.download.check_period,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the poll loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the poll loop until the cancellation token fires
    ///
    /// Each cycle polls the source, orchestrates any batch it produced, lets
    /// the source react to the outcomes, and sleeps the configured period.
    /// Cancellation is a normal shutdown and completes with `Ok(())`.
    pub async fn run(mut self) -> Result<()> {
        info!(period = ?self.check_period, "poll loop started");
        loop {
            let batch = self.source.poll().await;
            if batch.is_empty() {
                debug!("no new download requests this cycle");
            } else {
                let results = self.orchestrator.run(batch).await;
                self.source.batch_finished(&results).await;
            }

            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("shutdown requested, poll loop stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(self.check_period) => {}
            }
        }
    }
}

/// Check that the stock aria2c download command is actually available
///
/// Only runs when the command template was left at its default. A custom
/// template skips the probe — whatever tool it names is the operator's
/// responsibility.
async fn probe_default_downloader() -> Result<()> {
    info!("checking for aria2c (aria2c --version)");
    let status = crate::executor::shell_command("aria2c --version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {
            info!("aria2c command is working");
            Ok(())
        }
        _ => Err(crate::error::Error::config(
            "could not find the aria2c command; install it or configure a custom download \
             command (see https://aria2.github.io/manual/en/html/aria2c.html)",
            "command",
        )),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DownloadConfig, FileSourceConfig};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn file_config(root: &Path) -> Config {
        Config {
            download: DownloadConfig {
                temp_dir: root.join("tmp"),
                output_dir: root.join("out"),
                command: "true '{link}'".to_string(),
                check_period: Duration::from_millis(20),
                http_connect_timeout: Duration::from_secs(1),
            },
            source: SourceConfig::File(FileSourceConfig {
                link_file: root.join("links"),
                result_file: root.join("results"),
            }),
        }
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_the_loop() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = file_config(temp_dir.path());
        config.download.temp_dir = PathBuf::from("relative");

        let err = Daemon::new(config).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Config { .. }));
    }

    #[tokio::test]
    async fn daemon_creates_the_temporary_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = file_config(temp_dir.path());
        let _daemon = Daemon::new(config).await.unwrap();
        assert!(temp_dir.path().join("tmp").is_dir());
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let daemon = Daemon::new(file_config(temp_dir.path())).await.unwrap();
        let cancel = daemon.cancellation_token();

        let handle = tokio::spawn(daemon.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop promptly after cancellation")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn file_batch_runs_and_truncates_on_success() {
        let temp_dir = TempDir::new().unwrap();
        let link_file = temp_dir.path().join("links");
        std::fs::write(&link_file, "http://h/a.mkv\n").unwrap();

        let daemon = Daemon::new(file_config(temp_dir.path())).await.unwrap();
        let cancel = daemon.cancellation_token();
        let handle = tokio::spawn(daemon.run());

        // Give the loop time to pick up and process the batch
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // The always-succeeding command cleared the link file and the result
        // file recorded the outcome
        assert_eq!(std::fs::read_to_string(&link_file).unwrap(), "");
        let results = std::fs::read_to_string(temp_dir.path().join("results")).unwrap();
        assert!(results.ends_with("true\n"));
    }
}
