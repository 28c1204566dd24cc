//! Conversations and their kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of conversation a channel represents.
///
/// Assigned once when the channel is ingested, so later stages never have to
/// re-inspect Slack's `is_im` / `is_mpim` / `is_private` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A named private channel.
    PrivateChannel,
    /// A multi-party direct message.
    GroupDm,
    /// A one-to-one direct message.
    DirectMessage,
}

impl ChannelKind {
    /// Classifies a conversation from Slack's kind flags.
    ///
    /// Returns `None` for kinds the tool never touches (public channels).
    /// Group DMs also carry `is_private`, so the more specific flags win.
    #[must_use]
    pub const fn from_flags(is_im: bool, is_mpim: bool, is_private: bool) -> Option<Self> {
        if is_im {
            Some(Self::DirectMessage)
        } else if is_mpim {
            Some(Self::GroupDm)
        } else if is_private {
            Some(Self::PrivateChannel)
        } else {
            None
        }
    }

    /// Returns the Slack `types` value for listing conversations of this kind.
    #[must_use]
    pub const fn api_type(self) -> &'static str {
        match self {
            Self::PrivateChannel => "private_channel",
            Self::GroupDm => "mpim",
            Self::DirectMessage => "im",
        }
    }

    /// Returns every kind, in listing order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::PrivateChannel, Self::GroupDm, Self::DirectMessage]
    }

    /// Short label used in previews.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrivateChannel | Self::GroupDm => "CH",
            Self::DirectMessage => "IM",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrivateChannel => "private channel",
            Self::GroupDm => "group DM",
            Self::DirectMessage => "direct message",
        };
        f.write_str(name)
    }
}

/// A conversation snapshot taken from the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Conversation ID.
    pub id: String,
    /// Channel name; empty for direct messages.
    pub name: String,
    /// Conversation kind.
    pub kind: ChannelKind,
    /// Counterpart member ID, only set for direct messages.
    pub peer_user_id: Option<String>,
}

impl Channel {
    /// Creates a named channel (private channel or group DM).
    #[must_use]
    pub fn named(id: impl Into<String>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            peer_user_id: None,
        }
    }

    /// Creates a direct message with `peer_user_id`.
    #[must_use]
    pub fn direct(id: impl Into<String>, peer_user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: ChannelKind::DirectMessage,
            peer_user_id: Some(peer_user_id.into()),
        }
    }
}
