//! Slack Web API access.
//!
//! The pipeline talks to Slack only through [`SlackApi`], so the HTTP client
//! can be swapped for [`InMemoryWorkspace`] in tests.
//!
//! # Available Implementations
//!
//! | Implementation | Use Case |
//! |----------------|----------|
//! | `SlackClient` | Blocking HTTP client for the real Web API |
//! | `InMemoryWorkspace` | Canned workspace with paging and fault injection |
//!
//! # Error Modes
//!
//! Every operation may fail with [`crate::Error::RateLimited`] (retryable) or
//! [`crate::Error::OperationFailed`]. Retrying is the caller's job; see
//! [`crate::services::RetryPolicy`].

mod client;
mod memory;

pub use client::SlackClient;
pub use memory::{ApiCall, InMemoryWorkspace};

use crate::Result;
use crate::models::{Channel, ChannelKind, FileRecord, Identity, Message};
use std::time::Duration;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// Cursor for the next page; `None` or empty on the final page.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// Returns the next cursor, treating an empty string as the end.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// One page of a conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    /// Messages on this page, newest first as Slack returns them.
    pub messages: Vec<Message>,
    /// Whether more messages follow.
    pub has_more: bool,
    /// Cursor for the next page.
    pub next_cursor: Option<String>,
}

impl HistoryPage {
    /// Converts to a generic page; the cursor only counts while `has_more`.
    #[must_use]
    pub fn into_page(self) -> Page<Message> {
        let next_cursor = if self.has_more { self.next_cursor } else { None };
        Page::new(self.messages, next_cursor)
    }
}

/// Confirmation returned by a message delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedMessage {
    /// Channel the message was deleted from.
    pub channel_id: String,
    /// `ts` of the deleted message.
    pub timestamp: String,
}

/// Operations the pruning pipeline needs from Slack.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn SlackApi>`
/// - Signal throttling with [`crate::Error::RateLimited`] so callers can retry
///   the same request; never advance a cursor on failure
pub trait SlackApi: Send + Sync {
    /// Lists all workspace members in one call.
    fn list_members(&self) -> Result<Vec<Identity>>;

    /// Lists one page of conversations of the given kinds.
    fn list_conversations(
        &self,
        kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<Page<Channel>>;

    /// Lists one page of a conversation's history.
    fn list_history(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage>;

    /// Lists one page of files uploaded by `owner_id`.
    fn list_files(&self, owner_id: &str, cursor: Option<&str>) -> Result<Page<FileRecord>>;

    /// Deletes a message.
    fn delete_message(&self, channel_id: &str, timestamp: &str) -> Result<DeletedMessage>;

    /// Deletes a file.
    fn delete_file(&self, file_id: &str) -> Result<()>;
}

/// HTTP client configuration for Slack requests.
#[derive(Debug, Clone, Copy)]
pub struct SlackHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for SlackHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: SlackHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(concat!("slackprune/", env!("CARGO_PKG_VERSION")));
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build Slack HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}
