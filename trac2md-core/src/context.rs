use crate::{CommitMap, LinkRegistry, Options, PageIndex, UserTable};

/// Read-only views of the run-scoped lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct Lookups<'a> {
    pub pages: &'a PageIndex,
    pub users: &'a UserTable,
    pub registry: &'a LinkRegistry,
    pub commits: &'a CommitMap,
}

/// Everything a single conversion call may consult.
///
/// The context only holds shared borrows of the lookup tables, so it cannot
/// change while a conversion runs and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub options: Options,
    pub lookups: Lookups<'a>,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(options: Options, lookups: Lookups<'a>) -> Self {
        Self { options, lookups }
    }

    /// The same lookups with different options, e.g. per wiki page.
    #[must_use]
    pub fn with_options(&self, options: Options) -> Self {
        Self {
            options,
            lookups: self.lookups,
        }
    }

    #[must_use]
    pub fn pages(&self) -> &'a PageIndex {
        self.lookups.pages
    }

    #[must_use]
    pub fn users(&self) -> &'a UserTable {
        self.lookups.users
    }

    #[must_use]
    pub fn registry(&self) -> &'a LinkRegistry {
        self.lookups.registry
    }

    #[must_use]
    pub fn commits(&self) -> &'a CommitMap {
        self.lookups.commits
    }
}
