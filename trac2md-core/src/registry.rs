//! Heading anchors collected in a dedicated pre-pass over the wiki.
//!
//! A page's cross references can only be rewritten once every page's headings
//! are known, so the registry has two phases: it is filled through `&mut`
//! while headings are recorded, then shared read-only with every conversion.

use std::collections::BTreeMap;

use serde::Serialize;

/// Trac's generated id for a heading: everything but word characters, `:`,
/// `.` and `-` is dropped, and ids must start with a letter.
#[must_use]
pub fn trac_anchor(title: &str) -> String {
    let anchor: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
        .collect();
    match anchor.chars().next() {
        Some(first) if first.is_alphabetic() => anchor,
        _ => format!("a{anchor}"),
    }
}

/// The anchor GitHub generates for a rendered heading.
#[must_use]
pub fn github_slug(title: &str) -> String {
    title
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkRegistry {
    pages: BTreeMap<String, BTreeMap<String, String>>,
}

impl LinkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `anchor` on `page` is reachable at `path`.
    ///
    /// The first record for a key wins, matching how duplicate headings
    /// resolve to the first occurrence.
    pub fn insert(&mut self, page: &str, anchor: &str, path: impl Into<String>) {
        self.pages
            .entry(page.to_string())
            .or_default()
            .entry(anchor.to_string())
            .or_insert_with(|| path.into());
    }

    /// Register a heading under both its Trac id (or explicit anchor) and
    /// its GitHub slug.
    pub fn record_heading(&mut self, page: &str, title: &str, explicit_anchor: Option<&str>) {
        let slug = github_slug(title);
        let path = format!("{}#{slug}", crate::tables::page_target_name(page));
        let anchor = explicit_anchor.map_or_else(|| trac_anchor(title), str::to_string);
        tracing::trace!(page, anchor, path, "recording heading");
        self.insert(page, &anchor, path.clone());
        self.insert(page, &slug, path);
    }

    #[must_use]
    pub fn resolve(&self, page: &str, anchor: &str) -> Option<&str> {
        self.pages
            .get(page)
            .and_then(|anchors| anchors.get(anchor))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Getting Started", "GettingStarted")]
    #[case("What's new?", "Whatsnew")]
    #[case("1. Install", "a1.Install")]
    #[case("", "a")]
    fn test_trac_anchor(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(trac_anchor(title), expected);
    }

    #[rstest]
    #[case("Getting Started", "getting-started")]
    #[case("What's new?", "whats-new")]
    #[case("snake_case-and-dash", "snake_case-and-dash")]
    fn test_github_slug(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(github_slug(title), expected);
    }

    #[test]
    fn test_record_heading_registers_both_keys() {
        let mut registry = LinkRegistry::new();
        registry.record_heading("Dev/Guide", "Build Steps", None);
        assert_eq!(
            registry.resolve("Dev/Guide", "BuildSteps"),
            Some("Guide#build-steps")
        );
        assert_eq!(
            registry.resolve("Dev/Guide", "build-steps"),
            Some("Guide#build-steps")
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_explicit_anchor_and_first_record_wins() {
        let mut registry = LinkRegistry::new();
        registry.record_heading("Page", "Intro", Some("start"));
        registry.record_heading("Page", "Second", Some("start"));
        assert_eq!(registry.resolve("Page", "start"), Some("Page#intro"));
        assert_eq!(registry.resolve("Other", "start"), None);
    }
}
