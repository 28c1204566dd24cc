//! Cursor pagination driver.

use super::RetryPolicy;
use crate::slack::Page;
use crate::{Error, Result};
use tracing::debug;

/// Drains every page of a cursor-paginated listing.
///
/// `fetch` is called with `None` first and then with each returned cursor
/// until a page comes back without one. Each fetch runs under `retry`, so a
/// rate-limited page is requested again with the same cursor and nothing is
/// skipped or duplicated. Any other error aborts the listing: a partial list
/// is never returned.
///
/// # Errors
///
/// Returns the first non-rate-limit error, or [`Error::OperationFailed`] if
/// the listing hands back the cursor it was just given.
pub fn drain_pages<T, F>(retry: &RetryPolicy, operation: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages: usize = 0;

    loop {
        let page = retry.run(operation, || fetch(cursor.as_deref()))?;
        pages += 1;

        let next = page.next().map(str::to_string);
        items.extend(page.items);

        let Some(next) = next else {
            break;
        };
        if cursor.as_deref() == Some(next.as_str()) {
            return Err(Error::OperationFailed {
                operation: operation.to_string(),
                cause: format!("cursor {next:?} did not advance"),
            });
        }

        debug!(operation, cursor = %next, pages, items = items.len(), "Next cursor");
        cursor = Some(next);
    }

    Ok(items)
}
