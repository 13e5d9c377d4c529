//! Core types for push-dl

use crate::template;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One requested download: a link and the directory its artifacts end up in
///
/// Produced by parsing a link-file line or a notification message body.
/// A single parsed line may expand into several requests when the link
/// carries a numeric-range template. Requests live only for the duration of
/// one polling cycle's batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRequest {
    /// The link to download
    pub link: String,
    /// Directory the downloaded files are moved into
    pub output_dir: PathBuf,
}

impl LinkRequest {
    /// Display filename of this request's link, for user-facing messages
    ///
    /// The last path segment of the link, or the whole link when it does not
    /// parse as a URL or has no usable path.
    pub fn display_name(&self) -> String {
        url::Url::parse(&self.link)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.link.clone())
    }
}

/// Per-link download state recorded in the JSON status log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Attempt recorded, download not finished yet
    Waiting,
    /// Download command exited successfully
    Downloaded,
    /// Download command failed
    Error,
}

/// Outcome of one download attempt, paired with the originating request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadResult {
    /// The request this outcome belongs to
    pub request: LinkRequest,
    /// Whether the download command exited with status 0
    pub succeeded: bool,
}

/// Parse one link-specification line or message body into requests
///
/// The accepted forms are `<link>` and `<link> <relative-output-path>`. Blank
/// lines and lines starting with `#` yield nothing. A bare output path has any
/// leading `/` stripped and is joined under `prefix`; a missing path means the
/// prefix itself. Lines with three or more whitespace-separated tokens are
/// reported and skipped. The link runs through numeric-range template
/// expansion, so one line may yield many requests; every accepted request is
/// logged.
pub fn parse_request_line(line: &str, prefix: &Path) -> Vec<LinkRequest> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Vec::new();
    }

    let mut tokens = line.split_whitespace();
    let link = match tokens.next() {
        Some(link) => link,
        None => return Vec::new(),
    };
    let output_dir = match (tokens.next(), tokens.next()) {
        (None, _) => prefix.to_path_buf(),
        (Some(path), None) => prefix.join(path.trim_start_matches('/')),
        (Some(_), Some(_)) => {
            warn!(line = %line, "detected line with unknown parts");
            return Vec::new();
        }
    };

    let requests: Vec<LinkRequest> = template::expand(link)
        .into_iter()
        .map(|link| LinkRequest {
            link,
            output_dir: output_dir.clone(),
        })
        .collect();
    for request in &requests {
        info!(
            link = %request.link,
            output_dir = %request.output_dir.display(),
            "detected link"
        );
    }
    requests
}
