//! Gotify inbox link source
//!
//! Polls a Gotify application inbox for link messages. Each poll runs one
//! pagination pass over the inbox, newest page first, accumulating messages
//! until one with the id of the last consumed message is seen. A clean pass
//! advances the in-memory cursor to the newest consumed id, so a message
//! feeds the pipeline at most once.
//!
//! A transport, decode, or server-side error aborts the pass: whatever was
//! accumulated so far is still returned, but the cursor stays put and the
//! next cycle re-scans from it. Duplicate delivery after such a failure is
//! accepted — losing requests is not.

use crate::gotify::{GotifyClient, Message};
use crate::types::{LinkRequest, parse_request_line};
use std::path::PathBuf;
use tracing::{debug, info};

/// Link source backed by a Gotify application inbox
pub struct InboxSource {
    client: GotifyClient,
    page_size: usize,
    prefix: PathBuf,
    /// Id of the last message consumed by a clean pass; lives only in memory
    last_message_id: i64,
}

impl InboxSource {
    /// Create an inbox source, starting from an empty cursor
    pub fn new(client: GotifyClient, page_size: usize, prefix: PathBuf) -> Self {
        Self {
            client,
            page_size,
            prefix,
            last_message_id: 0,
        }
    }

    /// The current poll cursor (id of the last consumed message)
    pub fn cursor(&self) -> i64 {
        self.last_message_id
    }

    /// Fetch all new messages since the cursor and parse them into requests
    ///
    /// Returns requests in chronological message order. The cursor advances
    /// only when the pagination pass completed without an error.
    pub async fn fetch(&mut self) -> Vec<LinkRequest> {
        let (mut messages, clean) = self.scan().await;
        messages.reverse();

        if messages.is_empty() {
            debug!(since = self.last_message_id, "received no notifications");
        } else {
            info!(count = messages.len(), "received notification(s)");
        }

        let requests: Vec<LinkRequest> = messages
            .iter()
            .flat_map(|message| parse_request_line(&message.message, &self.prefix))
            .collect();

        if clean && let Some(newest) = messages.last() {
            self.last_message_id = newest.id;
        }
        requests
    }

    /// Walk the inbox pages, newest first, accumulating unconsumed messages
    ///
    /// Returns the accumulated messages (newest first) and whether the walk
    /// finished without an error.
    async fn scan(&self) -> (Vec<Message>, bool) {
        let mut accumulated = Vec::new();
        let mut running_since = 0;
        loop {
            // Failures are logged at the HTTP boundary; the pass just ends
            let page = match self.client.app_messages(running_since, self.page_size).await {
                Ok(page) => page,
                Err(_) => return (accumulated, false),
            };
            let Some(oldest) = page.last() else {
                return (accumulated, true);
            };
            let next_since = oldest.id;

            let before = accumulated.len();
            for message in &page {
                if message.id == self.last_message_id {
                    // This and everything older in the page is already consumed
                    break;
                }
                accumulated.push(message.clone());
            }
            if accumulated.len() > before {
                debug!(
                    count = accumulated.len() - before,
                    page_newest = page[0].id,
                    page_oldest = next_since,
                    "received notification page"
                );
            }
            running_since = next_since;
        }
    }
}
