//! Orchestration of a pruning run.
//!
//! A run resolves the caller, selects conversations, collects files and
//! messages, and reports the totals. Nothing is deleted unless the run is
//! committed: every run is a dry run by default.
//!
//! # Example
//!
//! ```rust
//! use slackprune::models::{Channel, ChannelKind, Message};
//! use slackprune::services::{PruneOptions, PruneService, RetryPolicy};
//! use slackprune::slack::InMemoryWorkspace;
//! use std::sync::Arc;
//!
//! let workspace = Arc::new(
//!     InMemoryWorkspace::new()
//!         .with_member("U1", "alice")
//!         .with_channel(Channel::named("G1", "g1", ChannelKind::GroupDm))
//!         .with_message("G1", Message::new("1700000000.000001", "U1", "hello")),
//! );
//!
//! let service = PruneService::new(workspace.clone(), PruneOptions::new("alice"), RetryPolicy::default());
//! let outcome = service.run().unwrap();
//! assert_eq!(outcome.plan.messages.len(), 1);
//! assert!(outcome.report.is_none());
//! assert!(!workspace.received_deletes());
//! ```

use super::{
    ChannelSelector, DEFAULT_DELETE_PAUSE, DeletionExecutor, DeletionReport, Directory,
    FileCollector, MessageCollector, RetryPolicy,
};
use crate::Result;
use crate::models::{Channel, Cutoff, FileRecord, FilterPattern, Identity, Message};
use crate::slack::SlackApi;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span};

/// What to prune and whether to actually delete.
#[derive(Debug, Clone)]
pub struct PruneOptions {
    /// Username of the caller.
    pub me: String,
    /// Conversation name filter.
    pub filter: Option<FilterPattern>,
    /// Only select items before this cutoff.
    pub cutoff: Option<Cutoff>,
    /// Perform deletes; otherwise stop after planning.
    pub commit: bool,
    /// Pause after each successful delete.
    pub delete_pause: Duration,
}

impl PruneOptions {
    /// Creates dry-run options for `me` with no filter and no cutoff.
    #[must_use]
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            filter: None,
            cutoff: None,
            commit: false,
            delete_pause: DEFAULT_DELETE_PAUSE,
        }
    }

    /// Sets the conversation filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<FilterPattern>) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the cutoff.
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: Option<Cutoff>) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Enables or disables deletion.
    #[must_use]
    pub const fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    /// Sets the pause after each delete.
    #[must_use]
    pub const fn with_delete_pause(mut self, pause: Duration) -> Self {
        self.delete_pause = pause;
        self
    }
}

/// Everything a run selected for deletion.
#[derive(Debug, Clone)]
pub struct PrunePlan {
    /// The resolved caller.
    pub me: Identity,
    /// Conversations scanned.
    pub channels: Vec<Channel>,
    /// Messages to delete, each tagged with its channel.
    pub messages: Vec<Message>,
    /// Files to delete.
    pub files: Vec<FileRecord>,
}

impl PrunePlan {
    /// Returns true if nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.files.is_empty()
    }
}

/// Result of [`PruneService::run`].
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    /// What was selected.
    pub plan: PrunePlan,
    /// Deletion results; `None` for a dry run.
    pub report: Option<DeletionReport>,
}

impl PruneOutcome {
    /// Returns true if no deletes were attempted.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.report.is_none()
    }
}

/// Runs the resolve, select, collect and delete pipeline.
pub struct PruneService {
    api: Arc<dyn SlackApi>,
    options: PruneOptions,
    retry: RetryPolicy,
}

impl PruneService {
    /// Creates a service.
    #[must_use]
    pub fn new(api: Arc<dyn SlackApi>, options: PruneOptions, retry: RetryPolicy) -> Self {
        Self {
            api,
            options,
            retry,
        }
    }

    /// Resolves the caller and selects everything to delete, without deleting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IdentityNotFound`] if the caller is unknown, or
    /// the first listing error. Listing failures are never partially used.
    pub fn plan(&self) -> Result<PrunePlan> {
        let span = info_span!("prune.plan", me = %self.options.me);
        let _enter = span.enter();

        let api = self.api.as_ref();
        let cutoff = self.options.cutoff.as_ref();

        let directory = Directory::resolve(api, &self.retry, &self.options.me)?;
        let me = directory.me().clone();

        let channels =
            ChannelSelector::new(&directory, self.options.filter.as_ref()).select(api, &self.retry)?;
        let files = FileCollector::new(&me.id, cutoff).collect(api, &self.retry)?;
        let messages = MessageCollector::new(&me.id, cutoff).collect(api, &self.retry, &channels)?;

        info!(
            channels = channels.len(),
            messages = messages.len(),
            files = files.len(),
            "Planning finished"
        );
        Ok(PrunePlan {
            me,
            channels,
            messages,
            files,
        })
    }

    /// Deletes everything in `plan`, regardless of the commit option.
    pub fn execute(&self, plan: &PrunePlan) -> DeletionReport {
        let span = info_span!("prune.execute", me = %plan.me.display_name);
        let _enter = span.enter();

        DeletionExecutor::new(self.api.as_ref(), &self.retry, self.options.delete_pause)
            .execute(&plan.messages, &plan.files)
    }

    /// Plans, then deletes only if the run is committed.
    ///
    /// # Errors
    ///
    /// Returns any planning error; deletion failures are counted in the report.
    pub fn run(&self) -> Result<PruneOutcome> {
        let plan = self.plan()?;
        if !self.options.commit {
            info!(
                messages = plan.messages.len(),
                files = plan.files.len(),
                "Dry run, nothing deleted"
            );
            return Ok(PruneOutcome { plan, report: None });
        }

        let report = self.execute(&plan);
        Ok(PruneOutcome {
            plan,
            report: Some(report),
        })
    }
}
