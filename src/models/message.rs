//! Messages and uploaded files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message from a conversation history.
///
/// `timestamp` is the Slack `ts` and identifies the message within its
/// channel. History pages do not carry the channel, so `channel_id` stays
/// empty until the message is attached to one with [`Message::in_channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Owning conversation ID.
    pub channel_id: String,
    /// Slack `ts` string.
    pub timestamp: String,
    /// Author member ID; empty for bot and system messages.
    pub author_id: String,
    /// Message text.
    pub text: String,
}

impl Message {
    /// Creates a message that is not yet attached to a channel.
    #[must_use]
    pub fn new(
        timestamp: impl Into<String>,
        author_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: String::new(),
            timestamp: timestamp.into(),
            author_id: author_id.into(),
            text: text.into(),
        }
    }

    /// Attaches the message to `channel_id`.
    #[must_use]
    pub fn in_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File ID (`F...`).
    pub id: String,
    /// File name.
    pub name: String,
    /// Uploader member ID.
    pub owner_id: String,
    /// Upload time, second granularity.
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a file record.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            created_at,
        }
    }
}
