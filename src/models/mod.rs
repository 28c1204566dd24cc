//! Data models for slackprune.
//!
//! This module contains the records read from Slack and the selection
//! criteria applied to them.

mod channel;
mod filter;
mod identity;
mod message;
mod timestamp;

pub use channel::{Channel, ChannelKind};
pub use filter::FilterPattern;
pub use identity::Identity;
pub use message::{FileRecord, Message};
pub use timestamp::{CUTOFF_DATE_FORMAT, Cutoff, from_remote_timestamp, to_remote_timestamp};
