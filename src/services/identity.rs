//! Workspace member directory.

use super::RetryPolicy;
use crate::models::Identity;
use crate::slack::SlackApi;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::info;

/// Member ID to username lookup, plus the resolved caller.
///
/// Built once per run from a single member listing and never modified.
#[derive(Debug, Clone)]
pub struct Directory {
    names: HashMap<String, String>,
    me: Identity,
}

impl Directory {
    /// Lists workspace members and resolves `me` by exact username.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityNotFound`] if no member is named `me`, or the
    /// listing error if the member listing fails.
    pub fn resolve(api: &dyn SlackApi, retry: &RetryPolicy, me: &str) -> Result<Self> {
        info!("Fetching users");
        let members = retry.run("users.list", || api.list_members())?;
        let directory = Self::from_members(members, me)?;
        info!(
            id = %directory.me.id,
            name = %directory.me.display_name,
            members = directory.names.len(),
            "Found myself"
        );
        Ok(directory)
    }

    /// Builds the directory from an already fetched member list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityNotFound`] if no member is named `me`.
    pub fn from_members(members: Vec<Identity>, me: &str) -> Result<Self> {
        let mut found = None;
        let mut names = HashMap::with_capacity(members.len());
        for member in members {
            if member.display_name == me {
                found = Some(member.clone());
            }
            names.insert(member.id, member.display_name);
        }

        let me = found.ok_or_else(|| Error::IdentityNotFound(me.to_string()))?;
        Ok(Self { names, me })
    }

    /// The resolved caller.
    #[must_use]
    pub const fn me(&self) -> &Identity {
        &self.me
    }

    /// Looks up a member's username.
    #[must_use]
    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of known members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no members are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
