//! Integration tests for the pruning pipeline over an in-memory workspace.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::too_many_lines)]

use chrono::DateTime;
use slackprune::models::{Channel, ChannelKind, Cutoff, FileRecord, FilterPattern, Message};
use slackprune::services::{
    DEFAULT_DELETE_PAUSE, PruneOptions, PruneService, RecordingSleeper, RetryPolicy, Sleeper,
};
use slackprune::slack::{ApiCall, InMemoryWorkspace};
use slackprune::{Error, PruneConfig};
use std::sync::Arc;
use std::time::Duration;

fn alice_workspace() -> InMemoryWorkspace {
    InMemoryWorkspace::new()
        .with_member("U1", "alice")
        .with_member("U2", "bob")
        .with_channel(Channel::named("g1", "g1", ChannelKind::GroupDm))
        .with_channel(Channel::named("c1", "c1", ChannelKind::PrivateChannel))
        .with_message("g1", Message::new("1700000003.000000", "U1", "third"))
        .with_message("g1", Message::new("1700000002.000000", "U2", "bob says"))
        .with_message("g1", Message::new("1700000001.000000", "U1", "first"))
        .with_message("c1", Message::new("1700000000.000000", "U1", "private"))
}

fn recording_retry() -> (RetryPolicy, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let retry = RetryPolicy::default().with_sleeper(Arc::clone(&sleeper) as Arc<dyn Sleeper>);
    (retry, sleeper)
}

fn is_message_delete(call: &ApiCall) -> bool {
    matches!(call, ApiCall::DeleteMessage { .. })
}

#[test]
fn test_end_to_end_dry_run() {
    let ws = Arc::new(alice_workspace());
    let (retry, sleeper) = recording_retry();
    let service = PruneService::new(ws.clone(), PruneOptions::new("alice"), retry);

    let outcome = service.run().unwrap();

    assert!(outcome.is_dry_run());
    assert_eq!(outcome.plan.me.id, "U1");
    let channel_ids: Vec<&str> = outcome.plan.channels.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(channel_ids, vec!["g1"]);
    assert_eq!(outcome.plan.messages.len(), 2);
    assert!(outcome.plan.messages.iter().all(|m| m.channel_id == "g1"));
    assert!(outcome.plan.messages.iter().all(|m| m.author_id == "U1"));
    assert!(!ws.received_deletes());
    assert!(sleeper.sleeps().is_empty());
}

#[test]
fn test_end_to_end_commit() {
    let ws = Arc::new(alice_workspace());
    let (retry, sleeper) = recording_retry();
    let service = PruneService::new(
        ws.clone(),
        PruneOptions::new("alice").with_commit(true),
        retry,
    );

    let outcome = service.run().unwrap();
    let report = outcome.report.unwrap();

    assert_eq!(report.messages_deleted, 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(ws.count_calls(is_message_delete), 2);
    assert_eq!(sleeper.sleeps(), vec![DEFAULT_DELETE_PAUSE, DEFAULT_DELETE_PAUSE]);
    assert_eq!(ws.message_count("g1"), 1);
    assert_eq!(ws.message_count("c1"), 1);
}

#[test]
fn test_filter_admits_private_channels() {
    let ws = Arc::new(alice_workspace().with_channel(Channel::named(
        "c2",
        "random",
        ChannelKind::PrivateChannel,
    )));
    let (retry, _) = recording_retry();
    let options = PruneOptions::new("alice").with_filter(FilterPattern::parse("c1,g1").unwrap());
    let plan = PruneService::new(ws, options, retry).plan().unwrap();

    let channel_ids: Vec<&str> = plan.channels.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(channel_ids, vec!["g1", "c1"]);
    assert_eq!(plan.messages.len(), 3);
}

#[test]
fn test_direct_messages_match_peer_name() {
    let ws = Arc::new(
        alice_workspace()
            .with_channel(Channel::direct("d1", "U2"))
            .with_message("d1", Message::new("1700000009.000000", "U1", "hi bob")),
    );
    let (retry, _) = recording_retry();

    let options = PruneOptions::new("alice").with_filter(FilterPattern::parse("bob").unwrap());
    let plan = PruneService::new(ws.clone(), options, retry.clone()).plan().unwrap();
    let channel_ids: Vec<&str> = plan.channels.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(channel_ids, vec!["d1"]);
    assert_eq!(plan.messages.len(), 1);

    let options = PruneOptions::new("alice").with_filter(FilterPattern::parse("carol").unwrap());
    let plan = PruneService::new(ws, options, retry).plan().unwrap();
    assert!(plan.channels.is_empty());
    assert!(plan.is_empty());
}

#[test]
fn test_cutoff_applies_to_messages_and_files() {
    let cutoff = Cutoff::parse("20231115").unwrap();
    let boundary = cutoff.timestamp().to_string();
    let ws = Arc::new(
        InMemoryWorkspace::new()
            .with_member("U1", "alice")
            .with_channel(Channel::named("g1", "g1", ChannelKind::GroupDm))
            .with_message("g1", Message::new("1700006400.000001", "U1", "after"))
            .with_message("g1", Message::new(boundary.clone(), "U1", "at cutoff"))
            .with_message("g1", Message::new("1600000000.000000", "U1", "before"))
            .with_file(FileRecord::new(
                "F1",
                "old.png",
                "U1",
                DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
            ))
            .with_file(FileRecord::new(
                "F2",
                "boundary.png",
                "U1",
                cutoff.instant(),
            )),
    );
    let (retry, _) = recording_retry();
    let options = PruneOptions::new("alice").with_cutoff(Some(cutoff));
    let plan = PruneService::new(ws, options, retry).plan().unwrap();

    let timestamps: Vec<&str> = plan.messages.iter().map(|m| m.timestamp.as_str()).collect();
    assert_eq!(timestamps, vec![boundary.as_str(), "1600000000.000000"]);
    let file_ids: Vec<&str> = plan.files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(file_ids, vec!["F1"]);
}

#[test]
fn test_files_need_a_cutoff() {
    let ws = Arc::new(alice_workspace().with_file(FileRecord::new(
        "F1",
        "a.png",
        "U1",
        DateTime::from_timestamp(1, 0).unwrap(),
    )));
    let (retry, _) = recording_retry();
    let plan = PruneService::new(ws, PruneOptions::new("alice"), retry)
        .plan()
        .unwrap();
    assert!(plan.files.is_empty());
    assert!(!plan.is_empty());
}

#[test]
fn test_rate_limited_history_page_is_retried() {
    let mut ws = InMemoryWorkspace::new()
        .with_page_size(2)
        .with_member("U1", "alice")
        .with_channel(Channel::named("g1", "g1", ChannelKind::GroupDm));
    for i in (1..=6).rev() {
        ws = ws.with_message("g1", Message::new(format!("170000000{i}.000000"), "U1", "m"));
    }
    let ws = Arc::new(ws);
    ws.fail_with_rate_limit(
        ApiCall::ListHistory {
            channel_id: "g1".to_string(),
            cursor: Some("2".to_string()),
        },
        1,
    );
    let (retry, sleeper) = recording_retry();
    let plan = PruneService::new(ws.clone(), PruneOptions::new("alice"), retry.clone())
        .plan()
        .unwrap();

    assert_eq!(plan.messages.len(), 6);
    let mut timestamps: Vec<&str> = plan.messages.iter().map(|m| m.timestamp.as_str()).collect();
    timestamps.dedup();
    assert_eq!(timestamps.len(), 6);
    assert_eq!(sleeper.sleeps(), vec![retry.wait()]);
    assert_eq!(
        ws.count_calls(|c| matches!(c, ApiCall::ListHistory { .. })),
        4
    );
}

#[test]
fn test_unknown_user_is_fatal() {
    let ws = Arc::new(alice_workspace());
    let (retry, _) = recording_retry();
    let service = PruneService::new(
        ws.clone(),
        PruneOptions::new("Alice").with_commit(true),
        retry,
    );

    let result = service.run();

    assert!(matches!(result, Err(Error::IdentityNotFound(name)) if name == "Alice"));
    assert_eq!(ws.calls(), vec![ApiCall::ListMembers]);
}

#[test]
fn test_listing_failure_aborts_before_deleting() {
    let ws = Arc::new(alice_workspace());
    ws.fail_with_error(
        ApiCall::ListHistory {
            channel_id: "g1".to_string(),
            cursor: None,
        },
        "not_in_channel",
        1,
    );
    let (retry, _) = recording_retry();
    let service = PruneService::new(
        ws.clone(),
        PruneOptions::new("alice").with_commit(true),
        retry,
    );

    assert!(matches!(service.run(), Err(Error::OperationFailed { .. })));
    assert!(!ws.received_deletes());
}

#[test]
fn test_retry_ceiling_from_config() {
    let ws = Arc::new(alice_workspace());
    ws.fail_with_rate_limit(ApiCall::ListMembers, 10);

    let mut config = PruneConfig {
        me: Some("alice".to_string()),
        ..PruneConfig::default()
    };
    config.pacing.max_attempts = Some(3);
    config.pacing.rate_limit_wait_ms = 5;

    let sleeper = Arc::new(RecordingSleeper::new());
    let retry = config
        .retry_policy()
        .with_sleeper(Arc::clone(&sleeper) as Arc<dyn Sleeper>);
    let service = PruneService::new(ws.clone(), config.prune_options().unwrap(), retry);

    assert!(matches!(service.run(), Err(Error::OperationFailed { .. })));
    assert_eq!(ws.count_calls(|c| *c == ApiCall::ListMembers), 3);
    assert_eq!(sleeper.count(Duration::from_millis(5)), 2);
}
