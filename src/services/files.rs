//! File selection.

use super::{RetryPolicy, drain_pages};
use crate::Result;
use crate::models::{Cutoff, FileRecord};
use crate::slack::SlackApi;
use tracing::info;

/// Collects the caller's files that were uploaded before the cutoff.
#[derive(Debug, Clone, Copy)]
pub struct FileCollector<'a> {
    owner_id: &'a str,
    cutoff: Option<&'a Cutoff>,
}

impl<'a> FileCollector<'a> {
    /// Creates a collector for files owned by `owner_id`.
    #[must_use]
    pub const fn new(owner_id: &'a str, cutoff: Option<&'a Cutoff>) -> Self {
        Self { owner_id, cutoff }
    }

    /// Returns true if `file` was created strictly before the cutoff.
    ///
    /// Without a cutoff nothing qualifies: files are only ever selected when
    /// a `before` date is given.
    #[must_use]
    pub fn retains(&self, file: &FileRecord) -> bool {
        self.cutoff
            .is_some_and(|cutoff| cutoff.admits_file(file.created_at))
    }

    /// Lists the owner's files and keeps the ones [`FileCollector::retains`]
    /// accepts, in listing order.
    ///
    /// # Errors
    ///
    /// Returns the listing error.
    pub fn collect(&self, api: &dyn SlackApi, retry: &RetryPolicy) -> Result<Vec<FileRecord>> {
        info!(owner = %self.owner_id, "Fetching files");
        let owner_id = self.owner_id;
        let listed = drain_pages(retry, "files.list", |cursor| api.list_files(owner_id, cursor))?;

        let total = listed.len();
        let selected: Vec<FileRecord> = listed.into_iter().filter(|f| self.retains(f)).collect();
        for (i, file) in selected.iter().enumerate() {
            info!(
                "{:03}. FILE ID: {}, Created: {}, Name: {}",
                i + 1,
                file.id,
                file.created_at,
                file.name
            );
        }
        info!(listed = total, selected = selected.len(), "Selected files");
        Ok(selected)
    }
}
