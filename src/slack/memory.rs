//! In-memory Slack workspace for testing.
//!
//! Serves canned members, conversations, histories and files through
//! [`SlackApi`] with a fixed page size, records every call it receives, and
//! can be told to fail specific calls so retry and error paths can be driven
//! deterministically.
//!
//! # Example
//!
//! ```rust
//! use slackprune::models::{Channel, ChannelKind, Message};
//! use slackprune::slack::{ApiCall, InMemoryWorkspace, SlackApi};
//!
//! let workspace = InMemoryWorkspace::new()
//!     .with_member("U1", "alice")
//!     .with_channel(Channel::named("G1", "g1", ChannelKind::GroupDm))
//!     .with_message("G1", Message::new("1700000000.000001", "U1", "hello"));
//!
//! workspace.fail_with_rate_limit(ApiCall::ListMembers, 1);
//! assert!(workspace.list_members().is_err());
//! assert_eq!(workspace.list_members().unwrap().len(), 1);
//! ```

use super::{DeletedMessage, HistoryPage, Page, SlackApi};
use crate::models::{Channel, ChannelKind, FileRecord, Identity, Message};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A call received by [`InMemoryWorkspace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiCall {
    /// `list_members`.
    ListMembers,
    /// `list_conversations` at a cursor.
    ListConversations {
        /// Cursor passed in.
        cursor: Option<String>,
    },
    /// `list_history` of a channel at a cursor.
    ListHistory {
        /// Channel listed.
        channel_id: String,
        /// Cursor passed in.
        cursor: Option<String>,
    },
    /// `list_files` of an owner at a cursor.
    ListFiles {
        /// Owner listed.
        owner_id: String,
        /// Cursor passed in.
        cursor: Option<String>,
    },
    /// `delete_message`.
    DeleteMessage {
        /// Channel of the message.
        channel_id: String,
        /// `ts` of the message.
        timestamp: String,
    },
    /// `delete_file`.
    DeleteFile {
        /// File deleted.
        file_id: String,
    },
}

impl ApiCall {
    const fn method(&self) -> &'static str {
        match self {
            Self::ListMembers => "users.list",
            Self::ListConversations { .. } => "conversations.list",
            Self::ListHistory { .. } => "conversations.history",
            Self::ListFiles { .. } => "files.list",
            Self::DeleteMessage { .. } => "chat.delete",
            Self::DeleteFile { .. } => "files.delete",
        }
    }
}

#[derive(Debug, Clone)]
enum FaultKind {
    RateLimited,
    Failed(String),
}

#[derive(Debug)]
struct Fault {
    call: ApiCall,
    kind: FaultKind,
    remaining: u32,
}

#[derive(Debug, Default)]
struct State {
    members: Vec<Identity>,
    channels: Vec<Channel>,
    history: HashMap<String, Vec<Message>>,
    files: Vec<FileRecord>,
    faults: Vec<Fault>,
    calls: Vec<ApiCall>,
}

/// In-memory [`SlackApi`] implementation.
///
/// Cursors are stringified offsets into the underlying lists. Deletes remove
/// the item, so deleting twice fails the way Slack does.
#[derive(Debug)]
pub struct InMemoryWorkspace {
    page_size: usize,
    state: Mutex<State>,
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkspace {
    /// Default number of items per page.
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
            state: Mutex::new(State::default()),
        }
    }

    /// Sets the page size for every listing (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds a member.
    #[must_use]
    pub fn with_member(mut self, id: &str, name: &str) -> Self {
        self.state_mut().members.push(Identity::new(id, name));
        self
    }

    /// Adds a conversation.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.state_mut().channels.push(channel);
        self
    }

    /// Appends a message to a conversation's history.
    #[must_use]
    pub fn with_message(mut self, channel_id: &str, message: Message) -> Self {
        self.state_mut()
            .history
            .entry(channel_id.to_string())
            .or_default()
            .push(message);
        self
    }

    /// Adds an uploaded file.
    #[must_use]
    pub fn with_file(mut self, file: FileRecord) -> Self {
        self.state_mut().files.push(file);
        self
    }

    /// Makes the next `times` matching calls fail with a rate limit.
    pub fn fail_with_rate_limit(&self, call: ApiCall, times: u32) {
        self.push_fault(call, FaultKind::RateLimited, times);
    }

    /// Makes the next `times` matching calls fail with `cause`.
    pub fn fail_with_error(&self, call: ApiCall, cause: &str, times: u32) {
        self.push_fault(call, FaultKind::Failed(cause.to_string()), times);
    }

    /// Returns every call received so far, in order, failed ones included.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Counts received calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.state().calls.iter().filter(|&c| predicate(c)).count()
    }

    /// Returns true if any delete call was received.
    #[must_use]
    pub fn received_deletes(&self) -> bool {
        self.count_calls(|c| {
            matches!(c, ApiCall::DeleteMessage { .. } | ApiCall::DeleteFile { .. })
        }) > 0
    }

    /// Number of messages still present in `channel_id`.
    #[must_use]
    pub fn message_count(&self, channel_id: &str) -> usize {
        self.state().history.get(channel_id).map_or(0, Vec::len)
    }

    /// Number of files still present.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.state().files.len()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_fault(&self, call: ApiCall, kind: FaultKind, times: u32) {
        if times > 0 {
            self.state().faults.push(Fault {
                call,
                kind,
                remaining: times,
            });
        }
    }

    /// Records `call` and returns the injected failure for it, if any.
    fn receive(&self, call: ApiCall) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call.clone());

        let Some(index) = state
            .faults
            .iter()
            .position(|f| f.call == call && f.remaining > 0)
        else {
            return Ok(state);
        };

        let fault = &mut state.faults[index];
        fault.remaining -= 1;
        let kind = fault.kind.clone();
        if fault.remaining == 0 {
            state.faults.remove(index);
        }
        drop(state);

        Err(match kind {
            FaultKind::RateLimited => Error::RateLimited {
                operation: call.method().to_string(),
                retry_after: None,
            },
            FaultKind::Failed(cause) => Error::OperationFailed {
                operation: call.method().to_string(),
                cause,
            },
        })
    }

    /// Slices `items` at `cursor`, returning the page and the next cursor.
    fn paginate<T: Clone>(
        &self,
        operation: &str,
        items: &[T],
        cursor: Option<&str>,
    ) -> Result<(Vec<T>, Option<String>)> {
        let start = match cursor {
            None | Some("") => 0,
            Some(c) => c.parse::<usize>().map_err(|_| Error::OperationFailed {
                operation: operation.to_string(),
                cause: format!("invalid_cursor: {c}"),
            })?,
        };
        let start = start.min(items.len());
        let end = (start + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());
        Ok((items[start..end].to_vec(), next))
    }
}

impl SlackApi for InMemoryWorkspace {
    fn list_members(&self) -> Result<Vec<Identity>> {
        let state = self.receive(ApiCall::ListMembers)?;
        Ok(state.members.clone())
    }

    fn list_conversations(
        &self,
        kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<Page<Channel>> {
        let state = self.receive(ApiCall::ListConversations {
            cursor: cursor.map(str::to_string),
        })?;
        let matching: Vec<Channel> = state
            .channels
            .iter()
            .filter(|c| kinds.contains(&c.kind))
            .cloned()
            .collect();
        drop(state);

        let (items, next) = self.paginate("conversations.list", &matching, cursor)?;
        Ok(Page::new(items, next))
    }

    fn list_history(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage> {
        let state = self.receive(ApiCall::ListHistory {
            channel_id: channel_id.to_string(),
            cursor: cursor.map(str::to_string),
        })?;
        let Some(messages) = state.history.get(channel_id).cloned() else {
            let known = state.channels.iter().any(|c| c.id == channel_id);
            drop(state);
            if known {
                return Ok(HistoryPage {
                    messages: Vec::new(),
                    has_more: false,
                    next_cursor: None,
                });
            }
            return Err(Error::OperationFailed {
                operation: "conversations.history".to_string(),
                cause: "channel_not_found".to_string(),
            });
        };
        drop(state);

        let (messages, next) = self.paginate("conversations.history", &messages, cursor)?;
        Ok(HistoryPage {
            messages,
            has_more: next.is_some(),
            next_cursor: next,
        })
    }

    fn list_files(&self, owner_id: &str, cursor: Option<&str>) -> Result<Page<FileRecord>> {
        let state = self.receive(ApiCall::ListFiles {
            owner_id: owner_id.to_string(),
            cursor: cursor.map(str::to_string),
        })?;
        let owned: Vec<FileRecord> = state
            .files
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .cloned()
            .collect();
        drop(state);

        let (items, next) = self.paginate("files.list", &owned, cursor)?;
        Ok(Page::new(items, next))
    }

    fn delete_message(&self, channel_id: &str, timestamp: &str) -> Result<DeletedMessage> {
        let mut state = self.receive(ApiCall::DeleteMessage {
            channel_id: channel_id.to_string(),
            timestamp: timestamp.to_string(),
        })?;
        let history = state.history.get_mut(channel_id);
        let position = history
            .as_ref()
            .and_then(|h| h.iter().position(|m| m.timestamp == timestamp));
        match (history, position) {
            (Some(history), Some(index)) => {
                history.remove(index);
                Ok(DeletedMessage {
                    channel_id: channel_id.to_string(),
                    timestamp: timestamp.to_string(),
                })
            },
            _ => Err(Error::OperationFailed {
                operation: "chat.delete".to_string(),
                cause: "message_not_found".to_string(),
            }),
        }
    }

    fn delete_file(&self, file_id: &str) -> Result<()> {
        let mut state = self.receive(ApiCall::DeleteFile {
            file_id: file_id.to_string(),
        })?;
        let Some(index) = state.files.iter().position(|f| f.id == file_id) else {
            return Err(Error::OperationFailed {
                operation: "files.delete".to_string(),
                cause: "file_not_found".to_string(),
            });
        };
        state.files.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn workspace() -> InMemoryWorkspace {
        InMemoryWorkspace::new()
            .with_page_size(2)
            .with_member("U1", "alice")
            .with_channel(Channel::named("C1", "c1", ChannelKind::PrivateChannel))
            .with_channel(Channel::named("G1", "g1", ChannelKind::GroupDm))
            .with_channel(Channel::direct("D1", "U2"))
            .with_message("G1", Message::new("3.000000", "U1", "c"))
            .with_message("G1", Message::new("2.000000", "U2", "b"))
            .with_message("G1", Message::new("1.000000", "U1", "a"))
    }

    #[test]
    fn test_conversation_paging() {
        let ws = workspace();
        let first = ws.list_conversations(ChannelKind::all(), None).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next(), Some("2"));

        let second = ws.list_conversations(ChannelKind::all(), first.next()).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.next(), None);
    }

    #[test]
    fn test_conversation_kind_filter() {
        let ws = workspace();
        let page = ws
            .list_conversations(&[ChannelKind::DirectMessage], None)
            .unwrap();
        assert_eq!(page.items, vec![Channel::direct("D1", "U2")]);
    }

    #[test]
    fn test_history_paging() {
        let ws = workspace();
        let first = ws.list_history("G1", None).unwrap();
        assert!(first.has_more);
        assert_eq!(first.messages.len(), 2);

        let second = ws.list_history("G1", first.next_cursor.as_deref()).unwrap();
        assert!(!second.has_more);
        assert_eq!(second.messages[0].timestamp, "1.000000");

        assert!(ws.list_history("C1", None).unwrap().messages.is_empty());
        assert!(ws.list_history("nope", None).is_err());
    }

    #[test]
    fn test_faults_are_consumed() {
        let ws = workspace();
        ws.fail_with_rate_limit(ApiCall::ListMembers, 2);

        assert!(ws.list_members().unwrap_err().is_rate_limited());
        assert!(ws.list_members().unwrap_err().is_rate_limited());
        assert_eq!(ws.list_members().unwrap().len(), 1);
        assert_eq!(ws.count_calls(|c| *c == ApiCall::ListMembers), 3);
    }

    #[test]
    fn test_delete_removes_items() {
        let created = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let ws = workspace().with_file(FileRecord::new("F1", "a.png", "U1", created));

        let confirmed = ws.delete_message("G1", "2.000000").unwrap();
        assert_eq!(confirmed.channel_id, "G1");
        assert_eq!(ws.message_count("G1"), 2);
        assert!(ws.delete_message("G1", "2.000000").is_err());

        ws.delete_file("F1").unwrap();
        assert_eq!(ws.file_count(), 0);
        assert!(ws.delete_file("F1").is_err());
        assert!(ws.received_deletes());
    }
}
