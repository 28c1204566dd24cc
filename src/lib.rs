//! # Slackprune
//!
//! Finds and deletes your own Slack messages and uploaded files.
//!
//! Slackprune walks the private channels, group DMs and direct messages you
//! belong to, selects the messages you authored (and the files you own) that
//! fall before an optional cutoff date, previews them, and deletes them only
//! when the run is explicitly committed.
//!
//! ## Pipeline
//!
//! - Resolve your member ID from the workspace directory
//! - Select conversations by kind and an optional name pattern
//! - Collect your files and your messages in the selected conversations
//! - Stop (dry run) or delete everything sequentially, riding out rate limits
//!
//! ## Example
//!
//! ```rust,ignore
//! use slackprune::services::{PruneOptions, PruneService, RetryPolicy};
//! use slackprune::slack::SlackClient;
//! use std::sync::Arc;
//!
//! let api = Arc::new(SlackClient::new(token));
//! let service = PruneService::new(api, PruneOptions::new("alice"), RetryPolicy::default());
//! let plan = service.plan()?;
//! println!("{} messages, {} files", plan.messages.len(), plan.files.len());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::time::Duration;
use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod slack;

pub use config::{ConfigFile, ConfigOverrides, PruneConfig};
pub use models::{
    Channel, ChannelKind, Cutoff, FileRecord, FilterPattern, Identity, Message,
    from_remote_timestamp, to_remote_timestamp,
};
pub use services::{
    DeletionExecutor, DeletionReport, PruneOptions, PruneOutcome, PrunePlan, PruneService,
    RetryPolicy,
};
pub use slack::{InMemoryWorkspace, Page, SlackApi, SlackClient};

/// Error type for slackprune operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing token or username, malformed `--before` date, bad filter pattern |
/// | `MalformedTimestamp` | A Slack `ts` string is not `<seconds>.<micros>` |
/// | `IdentityNotFound` | No workspace member has the configured username |
/// | `RateLimited` | Slack answered HTTP 429 or `ratelimited` |
/// | `OperationFailed` | Any other transport, HTTP or API failure |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - No token was given via flag, environment or config file
    /// - The `me` username is missing
    /// - The `before` date is not `YYYYMMDD`
    /// - The filter terms do not compile to a regular expression
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A remote timestamp string could not be decoded.
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    /// The configured username does not belong to any workspace member.
    #[error("could not find user: {0}")]
    IdentityNotFound(String),

    /// The remote API rejected the call because the rate limit was exceeded.
    ///
    /// Always retryable. `retry_after` is the server's hint, when it sent one.
    #[error("rate limit exceeded during '{operation}'")]
    RateLimited {
        /// The operation that was throttled.
        operation: String,
        /// Server-suggested wait, if any.
        retry_after: Option<Duration>,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - The HTTP request cannot be sent or times out
    /// - Slack returns a non-success status or `"ok": false`
    /// - A response body cannot be decoded
    /// - The retry ceiling is reached while rate limited
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true when the error signals a rate-limit condition.
    ///
    /// Besides [`Error::RateLimited`], an [`Error::OperationFailed`] whose cause
    /// mentions the rate limit is treated the same way, since some API paths
    /// only surface the condition as error text.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::OperationFailed { cause, .. } => {
                let lower = cause.to_lowercase();
                lower.contains("rate limit") || lower.contains("ratelimited")
            },
            _ => false,
        }
    }
}

/// Result type alias for slackprune operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("-me flag missing".to_string());
        assert_eq!(err.to_string(), "invalid input: -me flag missing");

        let err = Error::OperationFailed {
            operation: "chat.delete".to_string(),
            cause: "message_not_found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'chat.delete' failed: message_not_found"
        );

        let err = Error::IdentityNotFound("alice".to_string());
        assert_eq!(err.to_string(), "could not find user: alice");
    }

    #[test]
    fn test_rate_limit_classification() {
        let err = Error::RateLimited {
            operation: "users.list".to_string(),
            retry_after: None,
        };
        assert!(err.is_rate_limited());

        let err = Error::OperationFailed {
            operation: "chat.delete".to_string(),
            cause: "slack rate limit exceeded, retry after 1s".to_string(),
        };
        assert!(err.is_rate_limited());

        let err = Error::OperationFailed {
            operation: "chat.delete".to_string(),
            cause: "ratelimited".to_string(),
        };
        assert!(err.is_rate_limited());

        let err = Error::OperationFailed {
            operation: "chat.delete".to_string(),
            cause: "cant_delete_message".to_string(),
        };
        assert!(!err.is_rate_limited());
        assert!(!Error::MalformedTimestamp("x".to_string()).is_rate_limited());
    }
}
