//! Conversation name filters.

use crate::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Case-insensitive alternation built from comma-separated terms.
///
/// `"ace,base"` becomes `(ace|base)` and matches any name containing either
/// term. Terms are trimmed and empty terms dropped, so a stray comma never
/// yields an empty alternative that matches every name. Terms are regular
/// expression fragments and are not escaped.
#[derive(Debug, Clone)]
pub struct FilterPattern {
    regex: Regex,
}

impl FilterPattern {
    /// Compiles a comma-separated term list.
    ///
    /// Returns `Ok(None)` for an empty or blank list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the list holds only separators, or
    /// the terms do not form a valid regex.
    pub fn parse(terms: &str) -> Result<Option<Self>> {
        if terms.trim().is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = terms
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(Error::InvalidInput(format!("filter {terms:?} contains no terms")));
        }

        let source = format!("({})", parts.join("|"));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("invalid filter {terms:?}: {e}")))?;
        Ok(Some(Self { regex }))
    }

    /// Returns true if `name` contains any of the terms.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The compiled pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
