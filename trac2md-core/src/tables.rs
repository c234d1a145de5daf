//! Lookup tables supplied by the orchestration layer.
//!
//! These are populated once per migration run and only read during
//! conversion.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::{Error, LinkRegistry};

/// Name of a page once published to the (flat) target wiki.
#[must_use]
pub fn page_target_name(page: &str) -> &str {
    page.rsplit_once('/').map_or(page, |(_, last)| last)
}

/// Known wiki page names.
///
/// Trac pages are hierarchical (`Dev/Guide`) while the target wiki is flat.
/// Lookups therefore accept either the full ("unsplit") name or the last
/// path segment ("split") of a known page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndex {
    unsplit: FxHashSet<String>,
    split: FxHashSet<String>,
}

impl PageIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: impl Into<String>) {
        let page = page.into();
        self.split.insert(page_target_name(&page).to_string());
        self.unsplit.insert(page);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.unsplit.contains(name) || self.split.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.unsplit.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unsplit.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PageIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for page in iter {
            index.insert(page);
        }
        index
    }
}

/// Source user handle to target handle.
///
/// A handle mapped to `None` is known but has no target account; it is
/// treated like an unknown handle when rendering mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserTable {
    handles: FxHashMap<String, Option<String>>,
}

impl UserTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, target: Option<String>) {
        self.handles.insert(source.into(), target);
    }

    /// Target handle for `source`, if the user has one.
    #[must_use]
    pub fn resolve(&self, source: &str) -> Option<&str> {
        self.handles.get(source).and_then(|target| target.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommitEntry {
    hash: String,
    branch: String,
}

/// Subversion revision to git commit mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMap {
    revisions: FxHashMap<String, CommitEntry>,
}

impl CommitMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `git-svn` style map: one `hash revision [@branch]` entry per
    /// line. The branch defaults to `trunk`; a revision already mapped from
    /// `trunk` is never replaced by another branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommitMapLine`] for lines with fewer than two fields.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut map = Self::new();
        for (index, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(hash), Some(revision)) = (fields.next(), fields.next()) else {
                return Err(Error::InvalidCommitMapLine(index + 1, line.to_string()));
            };
            let branch = fields
                .next()
                .map_or("trunk", |branch| branch.get(1..).unwrap_or_default());
            map.insert(revision, hash, branch);
        }
        tracing::debug!(revisions = map.revisions.len(), "loaded commit map");
        Ok(map)
    }

    pub fn insert(&mut self, revision: &str, hash: &str, branch: &str) {
        let revision = revision.trim_start_matches('r');
        if self
            .revisions
            .get(revision)
            .is_some_and(|entry| entry.branch == "trunk")
        {
            return;
        }
        self.revisions.insert(
            revision.to_string(),
            CommitEntry {
                hash: hash.to_string(),
                branch: branch.to_string(),
            },
        );
    }

    /// Abbreviated commit hash for an svn revision.
    #[must_use]
    pub fn resolve(&self, revision: &str) -> Option<&str> {
        self.revisions.get(revision).map(|entry| {
            entry
                .hash
                .get(..10)
                .unwrap_or(entry.hash.as_str())
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

/// Owned set of lookup tables for one migration run.
///
/// Build the registry (and fill the other tables) first, then borrow the
/// tables into any number of [`Context`](crate::Context) values.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub pages: PageIndex,
    pub users: UserTable,
    pub registry: LinkRegistry,
    pub commits: CommitMap,
}

impl Tables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the tables for a conversion.
    #[must_use]
    pub fn context(&self, options: crate::Options) -> crate::Context<'_> {
        crate::Context::new(options, self.lookups())
    }

    #[must_use]
    pub fn lookups(&self) -> crate::Lookups<'_> {
        crate::Lookups {
            pages: &self.pages,
            users: &self.users,
            registry: &self.registry,
            commits: &self.commits,
        }
    }
}
