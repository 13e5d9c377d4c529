//! # push-dl
//!
//! Link-ingestion and download-orchestration library: watch a link
//! specification file or a Gotify notification inbox for download requests,
//! drive an external download command for each link, move the fetched
//! artifacts into per-link output directories, and record every outcome
//! durably.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Strictly sequential** - One download at a time, one shared temporary
//!   directory, outcomes recorded in batch order
//! - **Failure-absorbing** - Only configuration errors are fatal; everything
//!   else is logged and the poll loop keeps running
//!
//! ## Quick Start
//!
//! ```no_run
//! use push_dl::{Config, Daemon, run_with_shutdown};
//! use push_dl::config::{DownloadConfig, FileSourceConfig, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         download: DownloadConfig {
//!             temp_dir: "/var/tmp/push-dl".into(),
//!             output_dir: "/srv/media".into(),
//!             ..Default::default()
//!         },
//!         source: SourceConfig::File(FileSourceConfig {
//!             link_file: "/etc/push-dl/links".into(),
//!             result_file: "/var/lib/push-dl/results".into(),
//!         }),
//!     };
//!
//!     let daemon = Daemon::new(config).await?;
//!
//!     // Poll until SIGTERM/SIGINT
//!     run_with_shutdown(daemon).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// The poll loop and link-source seam
pub mod daemon;
/// Error types
pub mod error;
/// Download command execution
pub mod executor;
/// Gotify API client
pub mod gotify;
/// Gotify inbox link source
pub mod inbox;
/// Watched link-file source
pub mod link_file;
/// Batch download orchestration
pub mod orchestrator;
/// Relocation of downloaded artifacts
pub mod relocate;
/// Durable attempt/result tracking
pub mod results;
/// Numeric-range link templates
pub mod template;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, GotifyConfig, SourceConfig};
pub use daemon::{Daemon, LinkSource};
pub use error::{Error, GotifyError, Result};
pub use executor::{CommandExecutor, DownloadExecutor};
pub use gotify::GotifyClient;
pub use orchestrator::Orchestrator;
pub use results::{FileResultLog, GotifyTracker, ResultTracker, StatusLog};
pub use types::{DownloadResult, DownloadStatus, LinkRequest};

/// Run the daemon until a termination signal arrives.
///
/// Spawns the poll loop, waits for SIGTERM/SIGINT (Ctrl+C on non-unix
/// platforms), then cancels the loop and waits for it to wind down. A signal
/// is a normal shutdown: the returned value is whatever the loop finished
/// with, `Ok(())` in the cancellation case.
///
/// # Example
///
/// ```no_run
/// use push_dl::{Config, Daemon, run_with_shutdown};
///
/// # async fn example(config: Config) -> push_dl::Result<()> {
/// let daemon = Daemon::new(config).await?;
/// run_with_shutdown(daemon).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(daemon: Daemon) -> Result<()> {
    let cancel = daemon.cancellation_token();
    let loop_handle = tokio::spawn(daemon.run());

    wait_for_signal().await;
    cancel.cancel();

    match loop_handle.await {
        Ok(result) => result,
        Err(error) => {
            tracing::error!(error = %error, "poll loop task failed");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to ctrl_c
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
        }
        (Ok(mut sigterm), Err(error)) => {
            tracing::warn!(error = %error, "could not register SIGINT handler");
            sigterm.recv().await;
            tracing::info!("received SIGTERM");
        }
        (Err(error), Ok(mut sigint)) => {
            tracing::warn!(error = %error, "could not register SIGTERM handler");
            sigint.recv().await;
            tracing::info!("received SIGINT");
        }
        (Err(error), Err(_)) => {
            tracing::warn!(error = %error, "could not register signal handlers, using ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(error) => tracing::error!(error = %error, "failed to listen for Ctrl+C"),
    }
}
