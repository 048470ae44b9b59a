//! The ordered queue of tutorial URLs read from the queue file.

use std::path::Path;

use reqwest::Url;

use crate::error::Result;
use crate::site::SiteProfile;

/// Whether a queue entry points at a tutorial page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Not visited yet.
    Unchecked,
    Valid,
    /// Not a tutorial URL; skipped, never an error.
    Invalid,
}

/// One line of the queue file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Position in the queue file, counting only non-blank lines.
    pub index: usize,
    /// The URL exactly as written (trimmed).
    pub url: String,
    pub validity: Validity,
    /// Tutorial title, once the page has been visited.
    pub title: Option<String>,
}

impl QueueEntry {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

/// Returns true if `url` parses and its host and path carry the platform's tokens.
#[must_use]
pub fn is_tutorial_url(url: &str, domain_token: &str, path_token: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host_ok = parsed.host_str().is_some_and(|h| h.contains(domain_token));
    let path_ok = parsed.path().contains(path_token);
    host_ok && path_ok
}

/// Queue entries plus an iteration cursor.
#[derive(Debug, Clone)]
pub struct QueueStore {
    entries: Vec<QueueEntry>,
    cursor: usize,
    domain_token: String,
    path_token: String,
}

impl QueueStore {
    /// Reads one URL per line from `path`, preserving order.
    ///
    /// Lines are trimmed; blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path, site: &SiteProfile) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(contents.lines(), site))
    }

    /// Builds a queue from already-read lines.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>, site: &SiteProfile) -> Self {
        let entries = lines
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, url)| QueueEntry {
                index,
                url: url.to_string(),
                validity: Validity::Unchecked,
                title: None,
            })
            .collect();

        Self {
            entries,
            cursor: 0,
            domain_token: site.domain_token.clone(),
            path_token: site.path_token.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Advances the cursor and returns the entry it passed, with its validity decided.
    pub fn next_entry(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.get_mut(self.cursor)?;
        self.cursor += 1;
        if entry.validity == Validity::Unchecked {
            entry.validity = if is_tutorial_url(&entry.url, &self.domain_token, &self.path_token) {
                Validity::Valid
            } else {
                Validity::Invalid
            };
        }
        Some(entry.clone())
    }

    /// Caches the tutorial title for the entry at `index`. The first title recorded wins.
    pub fn record_title(&mut self, index: usize, title: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.title.get_or_insert_with(|| title.to_string());
        }
    }
}
