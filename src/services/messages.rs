//! Message selection.

use super::{RetryPolicy, drain_pages};
use crate::Result;
use crate::models::{Channel, Cutoff, Message, from_remote_timestamp};
use crate::slack::SlackApi;
use tracing::{info, info_span};

/// Collects the caller's messages at or before the cutoff.
#[derive(Debug, Clone, Copy)]
pub struct MessageCollector<'a> {
    author_id: &'a str,
    cutoff: Option<&'a Cutoff>,
}

impl<'a> MessageCollector<'a> {
    /// Creates a collector for messages written by `author_id`.
    #[must_use]
    pub const fn new(author_id: &'a str, cutoff: Option<&'a Cutoff>) -> Self {
        Self { author_id, cutoff }
    }

    /// Returns true if `message` was written by the author at or before the
    /// cutoff.
    #[must_use]
    pub fn retains(&self, message: &Message) -> bool {
        message.author_id == self.author_id
            && self
                .cutoff
                .is_none_or(|cutoff| cutoff.admits_message(&message.timestamp))
    }

    /// Walks every channel's history and keeps the retained messages, each
    /// tagged with its channel. Channel order and per-channel history order
    /// are preserved.
    ///
    /// # Errors
    ///
    /// Returns the first history listing error.
    pub fn collect(
        &self,
        api: &dyn SlackApi,
        retry: &RetryPolicy,
        channels: &[Channel],
    ) -> Result<Vec<Message>> {
        let mut selected: Vec<Message> = Vec::new();
        for channel in channels {
            let span = info_span!("history", channel_id = %channel.id);
            let _enter = span.enter();

            let history = drain_pages(retry, "conversations.history", |cursor| {
                api.list_history(&channel.id, cursor)
                    .map(crate::slack::HistoryPage::into_page)
            })?;

            let before = selected.len();
            for message in history.into_iter().filter(|m| self.retains(m)) {
                let message = message.in_channel(channel.id.as_str());
                info!(
                    "{:03}. MSG TS: {}, Text: {}",
                    selected.len() - before + 1,
                    describe_timestamp(&message.timestamp),
                    message.text
                );
                selected.push(message);
            }
            info!(selected = selected.len() - before, "Scanned history");
        }

        info!(total = selected.len(), "Selected messages");
        Ok(selected)
    }
}

fn describe_timestamp(ts: &str) -> String {
    from_remote_timestamp(ts).map_or_else(|_| ts.to_string(), |t| t.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_own_messages() {
        let collector = MessageCollector::new("U1", None);
        assert!(collector.retains(&Message::new("1.000000", "U1", "mine")));
        assert!(!collector.retains(&Message::new("1.000000", "U2", "theirs")));
        assert!(!collector.retains(&Message::new("1.000000", "", "bot")));
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let cutoff = Cutoff::parse("20240101").unwrap();
        let collector = MessageCollector::new("U1", Some(&cutoff));
        assert!(collector.retains(&Message::new(cutoff.timestamp(), "U1", "at cutoff")));
        assert!(collector.retains(&Message::new("1704067199.999999", "U1", "before")));
        assert!(!collector.retains(&Message::new("1704067200.000001", "U1", "after")));
    }

    #[test]
    fn test_describe_timestamp_falls_back_to_raw() {
        assert_eq!(describe_timestamp("garbage"), "garbage");
        assert_eq!(describe_timestamp("0.000000"), "1970-01-01T00:00:00+00:00");
    }
}
