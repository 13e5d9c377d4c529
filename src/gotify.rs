//! Gotify API client
//!
//! Thin client for the three Gotify operations the daemon needs:
//! - pushing a notification (`POST /message` with the application token)
//! - deleting a notification (`DELETE /message/<id>` with the client token)
//! - fetching an application's messages
//!   (`GET /application/<id>/message?since=..&limit=..` with the client token)
//!
//! Response shapes are decoded exactly once, here. Transport failures,
//! undecodable bodies, and bodies carrying an `errorDescription` field each
//! map to their own [`GotifyError`] variant; nothing escapes this layer as a
//! panic or an untyped failure.

use crate::config::GotifyConfig;
use crate::error::{GotifyError, GotifyResult, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the client token for fetch/delete operations
const GOTIFY_KEY_HEADER: &str = "X-Gotify-Key";

/// One message from an application inbox
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned message id, used as the poll cursor
    pub id: i64,
    /// Raw message body (a link line)
    pub message: String,
}

/// Response shape of a message page fetch
#[derive(Debug, Deserialize)]
struct MessagePage {
    messages: Vec<Message>,
}

/// Response shape of a successful message push
#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: i64,
}

/// Client for a single Gotify server
#[derive(Clone)]
pub struct GotifyClient {
    http: reqwest::Client,
    config: GotifyConfig,
    base_url: String,
}

impl GotifyClient {
    /// Create a client for the configured server
    ///
    /// The port defaults to 443 with TLS and 80 without, matching the scheme.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: GotifyConfig, connect_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(GotifyError::Transport)?;
        let scheme = if config.tls { "https" } else { "http" };
        let port = config.port.unwrap_or(if config.tls { 443 } else { 80 });
        let base_url = format!("{scheme}://{}:{port}", config.host);
        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    /// Push a notification with the configured priority, title, and rendering
    ///
    /// When markdown rendering is configured the `client::display` content
    /// type extra is attached, so callers can pass markdown-decorated text.
    /// Returns the id of the created message, which [`delete_message`] accepts
    /// later.
    ///
    /// [`delete_message`]: GotifyClient::delete_message
    ///
    /// # Errors
    /// Returns [`GotifyError`] on transport failure, an undecodable body, or a
    /// server-side rejection.
    pub async fn create_message(&self, text: &str) -> GotifyResult<i64> {
        let url = format!("{}/message", self.base_url);
        let mut body = json!({
            "message": text,
            "priority": self.config.priority,
        });
        if !self.config.title.is_empty() {
            body["title"] = json!(self.config.title);
        }
        if self.config.markdown {
            body["extras"] = json!({
                "client::display": { "contentType": "text/markdown" }
            });
        }

        let result = self
            .http
            .post(&url)
            .query(&[("token", self.config.application_token.as_str())])
            .json(&body)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    url = %url,
                    token = %mask_token(&self.config.application_token),
                    error = %error,
                    "could not send notification"
                );
                return Err(GotifyError::Transport(error));
            }
        };

        let created: CreatedMessage = self.decode(response, "send notification").await?;
        debug!(url = %url, id = created.id, "sent notification");
        Ok(created.id)
    }

    /// Delete a previously pushed notification
    ///
    /// An empty response body is success; a JSON body is checked for an
    /// application-level rejection.
    ///
    /// # Errors
    /// Returns [`GotifyError`] on transport failure, an undecodable body, or a
    /// server-side rejection.
    pub async fn delete_message(&self, id: i64) -> GotifyResult<()> {
        let url = format!("{}/message/{id}", self.base_url);
        let result = self
            .http
            .delete(&url)
            .header(GOTIFY_KEY_HEADER, &self.config.client_token)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %url, error = %error, "could not delete notification");
                return Err(GotifyError::Transport(error));
            }
        };

        let body = response.bytes().await.map_err(GotifyError::Transport)?;
        if body.is_empty() {
            debug!(url = %url, "deleted notification");
            return Ok(());
        }
        // A non-empty body on delete only matters if it carries a rejection
        check_application_error(&body, &url, "delete notification")?;
        debug!(url = %url, "deleted notification");
        Ok(())
    }

    /// Fetch one page of the configured application's messages
    ///
    /// `since` is the server's pagination cursor; `limit` bounds the page
    /// size. Messages come back in the server's own order (newest-relevant
    /// first).
    ///
    /// # Errors
    /// Returns [`GotifyError`] on transport failure, an undecodable body, or a
    /// server-side rejection.
    pub async fn app_messages(&self, since: i64, limit: usize) -> GotifyResult<Vec<Message>> {
        let url = format!(
            "{}/application/{}/message",
            self.base_url, self.config.application_id
        );
        let result = self
            .http
            .get(&url)
            .query(&[("since", since.to_string()), ("limit", limit.to_string())])
            .header(GOTIFY_KEY_HEADER, &self.config.client_token)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %url, since, error = %error, "could not fetch notifications");
                return Err(GotifyError::Transport(error));
            }
        };

        let page: MessagePage = self.decode(response, "fetch notifications").await?;
        Ok(page.messages)
    }

    /// Read a response body and decode it into the expected shape
    ///
    /// An `errorDescription` field anywhere in the body wins over the expected
    /// shape and becomes an application error.
    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> GotifyResult<T> {
        // Strip the query before logging: create_message carries its token there
        let mut log_url = response.url().clone();
        log_url.set_query(None);
        let url = log_url.to_string();
        let body = response.bytes().await.map_err(|error| {
            warn!(url = %url, error = %error, "could not read response");
            GotifyError::Transport(error)
        })?;
        let value = check_application_error(&body, &url, operation)?;
        serde_json::from_value(value).map_err(|error| {
            warn!(url = %url, error = %error, "unexpected response shape");
            GotifyError::Decode(error.to_string())
        })
    }
}

/// Parse a body as JSON and surface any `errorDescription` it carries
fn check_application_error(
    body: &[u8],
    url: &str,
    operation: &str,
) -> GotifyResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|error| {
        warn!(url = %url, error = %error, "could not decode response body");
        GotifyError::Decode(error.to_string())
    })?;
    if let Some(description) = value.get("errorDescription").and_then(|v| v.as_str()) {
        warn!(url = %url, reason = %description, "could not {operation}");
        return Err(GotifyError::Application {
            description: description.to_string(),
        });
    }
    Ok(value)
}

/// Mask a token for diagnostics: first and last characters kept, rest starred
pub(crate) fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 2 {
        return "*".repeat(count);
    }
    let mut chars = token.chars();
    let first = chars.next().unwrap_or('*');
    let last = chars.next_back().unwrap_or('*');
    format!("{first}{}{last}", "*".repeat(count - 2))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GotifyConfig;
    use std::path::PathBuf;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Build a client pointed at a mock server URI like "http://127.0.0.1:PORT"
    fn client_for(uri: &str) -> GotifyClient {
        let parsed = url::Url::parse(uri).unwrap();
        let config = GotifyConfig {
            host: parsed.host_str().unwrap().to_string(),
            port: parsed.port(),
            tls: false,
            application_token: "AppTokenXYZ".to_string(),
            application_id: "42".to_string(),
            client_token: "ClientTokenXYZ".to_string(),
            page_size: 10,
            priority: 5,
            title: "File Downloader".to_string(),
            markdown: false,
            status_file: PathBuf::from("/tmp/status.json"),
        };
        GotifyClient::new(config, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn create_message_returns_server_assigned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .and(query_param("token", "AppTokenXYZ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 17,
                "appid": 42,
                "message": "Downloading x to y",
                "priority": 5,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let id = client.create_message("Downloading x to y").await.unwrap();
        assert_eq!(id, 17);
    }

    #[tokio::test]
    async fn create_message_maps_error_description_to_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "Unauthorized",
                "errorCode": 401,
                "errorDescription": "you need to provide a valid access token",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.create_message("hello").await.unwrap_err();
        match err {
            GotifyError::Application { description } => {
                assert!(description.contains("valid access token"));
            }
            other => panic!("expected Application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_message_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.create_message("hello").await.unwrap_err();
        assert!(matches!(err, GotifyError::Decode(_)));
    }

    #[tokio::test]
    async fn delete_message_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/message/17"))
            .and(header(GOTIFY_KEY_HEADER, "ClientTokenXYZ"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        client.delete_message(17).await.unwrap();
    }

    #[tokio::test]
    async fn delete_message_surfaces_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/message/17"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "Not Found",
                "errorDescription": "message does not exist",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.delete_message(17).await.unwrap_err();
        assert!(matches!(err, GotifyError::Application { .. }));
    }

    #[tokio::test]
    async fn app_messages_decodes_message_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/application/42/message"))
            .and(query_param("since", "0"))
            .and(query_param("limit", "10"))
            .and(header(GOTIFY_KEY_HEADER, "ClientTokenXYZ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {"id": 5, "message": "http://h/a.mkv", "appid": 42, "priority": 0},
                    {"id": 4, "message": "http://h/b.mkv shows", "appid": 42, "priority": 0},
                ],
                "paging": {"size": 2, "limit": 10},
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let messages = client.app_messages(0, 10).await.unwrap();
        assert_eq!(
            messages,
            vec![
                Message {
                    id: 5,
                    message: "http://h/a.mkv".to_string()
                },
                Message {
                    id: 4,
                    message: "http://h/b.mkv shows".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = client_for(&uri);
        let err = client.app_messages(0, 10).await.unwrap_err();
        assert!(matches!(err, GotifyError::Transport(_)));
    }

    #[test]
    fn mask_token_keeps_only_edges() {
        assert_eq!(mask_token("AppTokenXYZ"), "A*********Z");
        assert_eq!(mask_token("ab"), "**");
        assert_eq!(mask_token(""), "");
    }
}
