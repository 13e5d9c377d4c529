//! Configuration types for push-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder substituted with the literal link in the download command
pub const LINK_PLACEHOLDER: &str = "{link}";

/// Default download command (aria2c with sane bulk-download flags)
pub const DEFAULT_COMMAND: &str = "aria2c \
--allow-overwrite=false \
-x 16 \
--disk-cache=256M \
--auto-file-renaming=false \
--file-allocation=trunc \
'{link}'";

/// Download behavior configuration (directories, command, polling)
///
/// Groups settings related to how links are fetched and where the artifacts
/// land. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Temporary directory the download command runs in (must be absolute)
    pub temp_dir: PathBuf,

    /// Output directory prefix that per-link paths are joined under (must be absolute)
    pub output_dir: PathBuf,

    /// Command template used to download a link; `{link}` is replaced by the
    /// actual link address (default: aria2c)
    #[serde(default = "default_command")]
    pub command: String,

    /// Sleep between polling cycles (default: 5 seconds)
    #[serde(default = "default_check_period", with = "duration_serde")]
    pub check_period: Duration,

    /// HTTP connection timeout for the Gotify API (default: 15 seconds)
    #[serde(default = "default_http_connect_timeout", with = "duration_serde")]
    pub http_connect_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            command: default_command(),
            check_period: default_check_period(),
            http_connect_timeout: default_http_connect_timeout(),
        }
    }
}

/// Which front-end feeds the download pipeline
///
/// Exactly one link source is active per daemon instance: either a watched
/// link-specification file or a Gotify message inbox.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Watch a local link-specification file for modifications
    File(FileSourceConfig),
    /// Poll a Gotify application inbox for link messages
    Gotify(GotifyConfig),
}

/// File link source configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// Path of the link-specification file to watch
    pub link_file: PathBuf,

    /// Path of the plain-text result file (truncated per batch, booleans appended)
    pub result_file: PathBuf,
}

/// Gotify link source and notification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GotifyConfig {
    /// Gotify hostname
    pub host: String,

    /// Gotify port (defaults to 443 with TLS, 80 without)
    #[serde(default)]
    pub port: Option<u16>,

    /// Use TLS (https) when talking to the server
    #[serde(default)]
    pub tls: bool,

    /// Application token used to push notifications
    pub application_token: String,

    /// Application id whose inbox is polled for link messages
    pub application_id: String,

    /// Client token used to fetch and delete messages
    pub client_token: String,

    /// Messages fetched per pagination request (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Priority attached to pushed notifications (default: 0)
    #[serde(default)]
    pub priority: i32,

    /// Title attached to pushed notifications (default: "File Downloader")
    #[serde(default = "default_title")]
    pub title: String,

    /// Render pushed notifications as markdown
    #[serde(default)]
    pub markdown: bool,

    /// Path of the JSON status log tracking per-link download state
    pub status_file: PathBuf,
}

/// Main configuration for the download daemon
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — directories, command template, polling
/// - [`source`](SourceConfig) — the active link front-end and its settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings (directories, command template, polling)
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Active link source (file watcher or Gotify inbox)
    pub source: SourceConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// Checks the invariants the daemon relies on before the poll loop starts.
    /// Violations are fatal: the caller is expected to report them and exit
    /// non-zero rather than enter the loop.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key on the first
    /// violation found.
    pub fn validate(&self) -> Result<()> {
        if !self.download.temp_dir.is_absolute() {
            return Err(Error::config(
                format!(
                    "temp_dir ({}) must be an absolute path",
                    self.download.temp_dir.display()
                ),
                "temp_dir",
            ));
        }
        if !self.download.output_dir.is_absolute() {
            return Err(Error::config(
                format!(
                    "output_dir ({}) must be an absolute path",
                    self.download.output_dir.display()
                ),
                "output_dir",
            ));
        }
        if !self.download.command.contains(LINK_PLACEHOLDER) {
            return Err(Error::config(
                format!("command must contain the {} placeholder", LINK_PLACEHOLDER),
                "command",
            ));
        }
        if self.download.check_period.is_zero() {
            return Err(Error::config("check_period must be non-zero", "check_period"));
        }

        match &self.source {
            SourceConfig::File(file) => {
                if file.link_file.as_os_str().is_empty() {
                    return Err(Error::config("link_file must be set", "link_file"));
                }
                if file.result_file.as_os_str().is_empty() {
                    return Err(Error::config("result_file must be set", "result_file"));
                }
            }
            SourceConfig::Gotify(gotify) => {
                if gotify.host.is_empty() {
                    return Err(Error::config("host must be set", "host"));
                }
                if gotify.application_token.is_empty() {
                    return Err(Error::config(
                        "application_token must be set",
                        "application_token",
                    ));
                }
                if gotify.application_id.is_empty() {
                    return Err(Error::config("application_id must be set", "application_id"));
                }
                if gotify.client_token.is_empty() {
                    return Err(Error::config("client_token must be set", "client_token"));
                }
                if gotify.page_size == 0 {
                    return Err(Error::config("page_size must be non-zero", "page_size"));
                }
                if gotify.status_file.as_os_str().is_empty() {
                    return Err(Error::config("status_file must be set", "status_file"));
                }
            }
        }

        Ok(())
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_check_period() -> Duration {
    Duration::from_secs(5)
}

fn default_http_connect_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_page_size() -> usize {
    10
}

fn default_title() -> String {
    "File Downloader".to_string()
}

/// Serialize Duration as seconds for config files
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn file_config() -> Config {
        Config {
            download: DownloadConfig {
                temp_dir: PathBuf::from("/tmp/push-dl"),
                output_dir: PathBuf::from("/out"),
                ..Default::default()
            },
            source: SourceConfig::File(FileSourceConfig {
                link_file: PathBuf::from("/etc/push-dl/links"),
                result_file: PathBuf::from("/var/lib/push-dl/results"),
            }),
        }
    }

    fn gotify_config() -> Config {
        Config {
            download: DownloadConfig {
                temp_dir: PathBuf::from("/tmp/push-dl"),
                output_dir: PathBuf::from("/out"),
                ..Default::default()
            },
            source: SourceConfig::Gotify(GotifyConfig {
                host: "gotify.example.com".to_string(),
                port: None,
                tls: true,
                application_token: "AppToken1".to_string(),
                application_id: "7".to_string(),
                client_token: "ClientToken1".to_string(),
                page_size: default_page_size(),
                priority: 0,
                title: default_title(),
                markdown: false,
                status_file: PathBuf::from("/var/lib/push-dl/status.json"),
            }),
        }
    }

    #[test]
    fn valid_configs_pass_validation() {
        file_config().validate().unwrap();
        gotify_config().validate().unwrap();
    }

    #[test]
    fn relative_temp_dir_is_rejected() {
        let mut config = file_config();
        config.download.temp_dir = PathBuf::from("relative/tmp");
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("temp_dir")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn relative_output_dir_is_rejected() {
        let mut config = file_config();
        config.download.output_dir = PathBuf::from("out");
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("output_dir")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn command_without_placeholder_is_rejected() {
        let mut config = file_config();
        config.download.command = "wget -q".to_string();
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("command")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn missing_gotify_credentials_are_rejected() {
        let mut config = gotify_config();
        if let SourceConfig::Gotify(gotify) = &mut config.source {
            gotify.client_token = String::new();
        }
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("client_token")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn default_command_contains_placeholder() {
        assert!(DEFAULT_COMMAND.contains(LINK_PLACEHOLDER));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = gotify_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        match back.source {
            SourceConfig::Gotify(gotify) => {
                assert_eq!(gotify.host, "gotify.example.com");
                assert_eq!(gotify.page_size, 10);
            }
            SourceConfig::File(_) => panic!("expected gotify source"),
        }
    }
}
