//! Conversation selection.
//!
//! Which conversations are scanned depends on both their kind and whether a
//! filter pattern was given:
//!
//! | Kind | No pattern | Pattern |
//! |------|------------|---------|
//! | Group DM | included | name matches |
//! | Direct message | included | peer's username matches |
//! | Private channel | excluded | name matches |
//!
//! Named private channels are only ever scanned when explicitly targeted.

use super::{Directory, RetryPolicy, drain_pages};
use crate::Result;
use crate::models::{Channel, ChannelKind, FilterPattern};
use crate::slack::SlackApi;
use tracing::info;

/// Selects the conversations to scan.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSelector<'a> {
    directory: &'a Directory,
    pattern: Option<&'a FilterPattern>,
}

impl<'a> ChannelSelector<'a> {
    /// Creates a selector.
    #[must_use]
    pub const fn new(directory: &'a Directory, pattern: Option<&'a FilterPattern>) -> Self {
        Self { directory, pattern }
    }

    /// Name the pattern is matched against: the channel name, or for direct
    /// messages the peer's username (empty when unknown).
    #[must_use]
    pub fn display_name<'c>(&self, channel: &'c Channel) -> &'c str
    where
        'a: 'c,
    {
        match channel.kind {
            ChannelKind::DirectMessage => channel
                .peer_user_id
                .as_deref()
                .and_then(|id| self.directory.display_name(id))
                .unwrap_or_default(),
            ChannelKind::GroupDm | ChannelKind::PrivateChannel => &channel.name,
        }
    }

    /// Returns true if `channel` should be scanned.
    #[must_use]
    pub fn includes(&self, channel: &Channel) -> bool {
        match (channel.kind, self.pattern) {
            (ChannelKind::PrivateChannel, None) => false,
            (ChannelKind::GroupDm | ChannelKind::DirectMessage, None) => true,
            (_, Some(pattern)) => pattern.is_match(self.display_name(channel)),
        }
    }

    /// Lists every private channel, group DM and direct message, keeping the
    /// ones [`ChannelSelector::includes`] accepts, in listing order.
    ///
    /// # Errors
    ///
    /// Returns the listing error; a failed listing is never partially used.
    pub fn select(&self, api: &dyn SlackApi, retry: &RetryPolicy) -> Result<Vec<Channel>> {
        info!("Fetching conversations");
        let listed = drain_pages(retry, "conversations.list", |cursor| {
            api.list_conversations(ChannelKind::all(), cursor)
        })?;

        let total = listed.len();
        let selected: Vec<Channel> = listed.into_iter().filter(|c| self.includes(c)).collect();
        for (i, channel) in selected.iter().enumerate() {
            info!(
                kind = %channel.kind,
                "{:03}. {} ID: {}, Name: {}",
                i + 1,
                channel.kind.label(),
                channel.id,
                self.display_name(channel)
            );
        }
        info!(listed = total, selected = selected.len(), "Selected conversations");
        Ok(selected)
    }
}
