//! Workspace members.

use serde::{Deserialize, Serialize};

/// A workspace member as reported by the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Slack member ID (`U...`).
    pub id: String,
    /// Username the member is addressed by.
    pub display_name: String,
}

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}
