//! Pruning services.
//!
//! The pipeline runs strictly in order, one remote call at a time:
//!
//! 1. [`Directory`] resolves the caller's member ID
//! 2. [`ChannelSelector`] picks the conversations to scan
//! 3. [`FileCollector`] and [`MessageCollector`] gather what to delete
//! 4. [`DeletionExecutor`] deletes it, only for committed runs
//!
//! [`PruneService`] wires the stages together. Every remote call goes through
//! a [`RetryPolicy`]; listings are drained with [`drain_pages`].

mod channels;
mod deletion;
mod files;
mod identity;
mod lister;
mod messages;
mod prune;
mod retry;

pub use channels::ChannelSelector;
pub use deletion::{DEFAULT_DELETE_PAUSE, DeletionExecutor, DeletionReport};
pub use files::FileCollector;
pub use identity::Directory;
pub use lister::drain_pages;
pub use messages::MessageCollector;
pub use prune::{PruneOptions, PruneOutcome, PrunePlan, PruneService};
pub use retry::{DEFAULT_RATE_LIMIT_WAIT, RecordingSleeper, RetryPolicy, Sleeper, ThreadSleeper};
