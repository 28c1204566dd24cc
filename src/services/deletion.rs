//! Sequential deletion of selected messages and files.

use super::{RetryPolicy, Sleeper};
use crate::models::{FileRecord, Message};
use crate::slack::SlackApi;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn};

/// Default pause after each successful delete.
pub const DEFAULT_DELETE_PAUSE: Duration = Duration::from_millis(200);

/// Outcome of a deletion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Messages deleted.
    pub messages_deleted: usize,
    /// Messages that could not be deleted.
    pub messages_failed: usize,
    /// Files deleted.
    pub files_deleted: usize,
    /// Files that could not be deleted.
    pub files_failed: usize,
}

impl DeletionReport {
    /// Total items deleted.
    #[must_use]
    pub const fn deleted(&self) -> usize {
        self.messages_deleted + self.files_deleted
    }

    /// Total items that failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.messages_failed + self.files_failed
    }
}

/// Deletes messages and files one at a time.
///
/// Each delete runs under the retry policy, so rate limits are waited out on
/// the same item. Any other failure is logged and the item skipped; it never
/// stops the batch. After every successful delete the executor pauses to stay
/// under the rate limit.
pub struct DeletionExecutor<'a> {
    api: &'a dyn SlackApi,
    retry: &'a RetryPolicy,
    pause: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<'a> DeletionExecutor<'a> {
    /// Creates an executor pausing `pause` after each delete, using the retry
    /// policy's sleeper for both waits.
    #[must_use]
    pub fn new(api: &'a dyn SlackApi, retry: &'a RetryPolicy, pause: Duration) -> Self {
        Self {
            api,
            retry,
            pause,
            sleeper: retry.sleeper(),
        }
    }

    /// Deletes all messages, then all files.
    pub fn execute(&self, messages: &[Message], files: &[FileRecord]) -> DeletionReport {
        let mut report = DeletionReport::default();
        (report.messages_deleted, report.messages_failed) = self.delete_messages(messages);
        (report.files_deleted, report.files_failed) = self.delete_files(files);
        info!(
            deleted = report.deleted(),
            failed = report.failed(),
            "Deletion finished"
        );
        report
    }

    fn delete_messages(&self, messages: &[Message]) -> (usize, usize) {
        let span = info_span!("delete_messages", count = messages.len());
        let _enter = span.enter();

        let (mut deleted, mut failed) = (0, 0);
        for (i, message) in messages.iter().enumerate() {
            let result = self.retry.run("chat.delete", || {
                self.api
                    .delete_message(&message.channel_id, &message.timestamp)
            });
            match result {
                Ok(confirmed) => {
                    deleted += 1;
                    info!(
                        "{:03}. Deleted message: {} {}",
                        i + 1,
                        confirmed.channel_id,
                        confirmed.timestamp
                    );
                    self.sleeper.sleep(self.pause);
                },
                Err(e) => {
                    failed += 1;
                    warn!(
                        error = %e,
                        channel_id = %message.channel_id,
                        ts = %message.timestamp,
                        text = %message.text,
                        "Delete failed"
                    );
                },
            }
        }
        (deleted, failed)
    }

    fn delete_files(&self, files: &[FileRecord]) -> (usize, usize) {
        let span = info_span!("delete_files", count = files.len());
        let _enter = span.enter();

        let (mut deleted, mut failed) = (0, 0);
        for (i, file) in files.iter().enumerate() {
            match self
                .retry
                .run("files.delete", || self.api.delete_file(&file.id))
            {
                Ok(()) => {
                    deleted += 1;
                    info!("{:03}. Deleted file: {} {}", i + 1, file.id, file.name);
                    self.sleeper.sleep(self.pause);
                },
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, file_id = %file.id, name = %file.name, "Delete failed");
                },
            }
        }
        (deleted, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, ChannelKind};
    use crate::services::RecordingSleeper;
    use crate::slack::{ApiCall, InMemoryWorkspace};
    use chrono::DateTime;

    fn message(ts: &str) -> Message {
        Message::new(ts, "U1", "text").in_channel("G1")
    }

    fn file() -> FileRecord {
        FileRecord::new("F1", "a.png", "U1", DateTime::from_timestamp(1, 0).unwrap())
    }

    fn workspace() -> InMemoryWorkspace {
        InMemoryWorkspace::new()
            .with_channel(Channel::named("G1", "g1", ChannelKind::GroupDm))
            .with_message("G1", Message::new("2.000000", "U1", "b"))
            .with_message("G1", Message::new("1.000000", "U1", "a"))
            .with_file(file())
    }

    #[test]
    fn test_failed_item_does_not_stop_batch() {
        let ws = workspace();
        let sleeper = Arc::new(RecordingSleeper::new());
        let retry = RetryPolicy::default().with_sleeper(Arc::clone(&sleeper) as Arc<dyn Sleeper>);
        let executor = DeletionExecutor::new(&ws, &retry, DEFAULT_DELETE_PAUSE);

        let messages = vec![message("9.000000"), message("2.000000"), message("1.000000")];
        let report = executor.execute(&messages, &[file()]);

        assert_eq!(
            report,
            DeletionReport {
                messages_deleted: 2,
                messages_failed: 1,
                files_deleted: 1,
                files_failed: 0,
            }
        );
        assert_eq!(ws.message_count("G1"), 0);
        assert_eq!(sleeper.count(DEFAULT_DELETE_PAUSE), 3);
    }

    #[test]
    fn test_rate_limited_delete_retries_same_item() {
        let ws = workspace();
        ws.fail_with_rate_limit(
            ApiCall::DeleteMessage {
                channel_id: "G1".to_string(),
                timestamp: "2.000000".to_string(),
            },
            2,
        );
        let sleeper = Arc::new(RecordingSleeper::new());
        let retry = RetryPolicy::default().with_sleeper(Arc::clone(&sleeper) as Arc<dyn Sleeper>);
        let executor = DeletionExecutor::new(&ws, &retry, DEFAULT_DELETE_PAUSE);

        let report = executor.execute(&[message("2.000000"), message("1.000000")], &[]);

        assert_eq!(report.messages_deleted, 2);
        assert_eq!(report.messages_failed, 0);
        assert_eq!(
            sleeper.sleeps(),
            vec![
                retry.wait(),
                retry.wait(),
                DEFAULT_DELETE_PAUSE,
                DEFAULT_DELETE_PAUSE
            ]
        );
        let delete_calls: Vec<ApiCall> = ws
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::DeleteMessage { .. }))
            .collect();
        assert_eq!(delete_calls.len(), 4);
    }
}
