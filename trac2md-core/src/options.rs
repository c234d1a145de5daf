use serde::{Deserialize, Serialize};

use crate::Error;

/// Default location of wiki pages in the target site.
pub const DEFAULT_WIKI_ROOT: &str = "/wiki";

/// Default location of the source tree in the target site.
pub const DEFAULT_SOURCE_ROOT: &str = "/tree/master";

/// How ticket references (`#123`, `ticket:123`) are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum TicketPolicy {
    /// Leave the reference as `#123`; the target tracker keeps ticket numbers.
    #[default]
    KeepReference,
    /// Rewrite the reference to a link below `url_prefix` (e.g. the old tracker).
    RewriteTo { url_prefix: String },
}

/// A literal prefix replacement applied to the final output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewrite {
    pub from: String,
    pub to: String,
}

impl UrlRewrite {
    /// Create a rewrite, rejecting pairs that would keep matching their own output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrlRewrite`] if `from` is empty or occurs inside `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, Error> {
        let rewrite = Self {
            from: from.into(),
            to: to.into(),
        };
        rewrite.validate()?;
        Ok(rewrite)
    }

    /// Check a whole set of rewrites: no target may contain any source, so
    /// a rewritten URL is never rewritten again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrlRewrite`] naming the first offending pair.
    pub fn validate_set(rewrites: &[Self]) -> Result<(), Error> {
        for rewrite in rewrites {
            rewrite.validate()?;
            if let Some(other) = rewrites
                .iter()
                .find(|other| rewrite.to.contains(other.from.as_str()))
            {
                return Err(Error::InvalidUrlRewrite(format!(
                    "{:?} -> {:?} produces {:?}",
                    rewrite.from, rewrite.to, other.from
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.from.is_empty() || self.to.contains(&self.from) {
            return Err(Error::InvalidUrlRewrite(format!(
                "{:?} -> {:?}",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Options {
    /// Directory the converted document is served from (`/issues/`,
    /// `/wiki/`). Relative links are computed from here.
    pub base_path: String,
    pub wiki_root: String,
    pub source_root: String,
    /// Prefix for attachment links and images of the current document.
    pub attachment_path: Option<String>,
    /// Wiki page being converted, used as the scope of same-page anchors.
    pub page: Option<String>,
    pub ticket_policy: TicketPolicy,
    /// Join soft-wrapped paragraph lines into a single line.
    ///
    /// Trac renders single newlines as spaces while GitHub issue bodies keep
    /// them as hard breaks.
    pub join_paragraphs: bool,
    /// Number of leading spaces stripped from every line before scanning.
    pub skip_prefix: usize,
    pub url_rewrites: Vec<UrlRewrite>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            wiki_root: DEFAULT_WIKI_ROOT.to_string(),
            source_root: DEFAULT_SOURCE_ROOT.to_string(),
            attachment_path: None,
            page: None,
            ticket_policy: TicketPolicy::default(),
            join_paragraphs: false,
            skip_prefix: 0,
            url_rewrites: Vec::new(),
        }
    }
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use trac2md_core::{Options, TicketPolicy};
    ///
    /// let options = Options::builder()
    ///     .with_base_path("/issues/")
    ///     .with_ticket_policy(TicketPolicy::KeepReference)
    ///     .with_join_paragraphs()
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of these options scoped to a wiki page.
    ///
    /// Relative links resolve against the (flat) wiki directory, and the
    /// attachment path is replaced so attachments resolve below the new page.
    #[must_use]
    pub fn for_wiki_page(&self, page: &str, attachment_path: Option<String>) -> Self {
        Self {
            base_path: format!("{}/", self.wiki_root.trim_end_matches('/')),
            page: Some(page.to_string()),
            attachment_path,
            ..self.clone()
        }
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.options.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn with_wiki_root(mut self, wiki_root: impl Into<String>) -> Self {
        self.options.wiki_root = wiki_root.into();
        self
    }

    #[must_use]
    pub fn with_source_root(mut self, source_root: impl Into<String>) -> Self {
        self.options.source_root = source_root.into();
        self
    }

    #[must_use]
    pub fn with_attachment_path(mut self, attachment_path: impl Into<String>) -> Self {
        self.options.attachment_path = Some(attachment_path.into());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.options.page = Some(page.into());
        self
    }

    #[must_use]
    pub fn with_ticket_policy(mut self, ticket_policy: TicketPolicy) -> Self {
        self.options.ticket_policy = ticket_policy;
        self
    }

    /// Join soft-wrapped paragraph lines.
    #[must_use]
    pub fn with_join_paragraphs(mut self) -> Self {
        self.options.join_paragraphs = true;
        self
    }

    #[must_use]
    pub fn with_skip_prefix(mut self, skip_prefix: usize) -> Self {
        self.options.skip_prefix = skip_prefix;
        self
    }

    #[must_use]
    pub fn with_url_rewrite(mut self, rewrite: UrlRewrite) -> Self {
        self.options.url_rewrites.push(rewrite);
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let options = Options::builder()
            .with_base_path("/issues/")
            .with_join_paragraphs()
            .with_skip_prefix(2)
            .build();
        assert_eq!(options.base_path, "/issues/");
        assert!(options.join_paragraphs);
        assert_eq!(options.skip_prefix, 2);
        assert_eq!(options.wiki_root, DEFAULT_WIKI_ROOT);
    }

    #[test]
    fn test_for_wiki_page_rebuilds_paths() {
        let options = Options::builder().with_attachment_path("/old").build();
        let page_options = options.for_wiki_page("Dev/Guide", Some("/files/Dev/Guide".into()));
        assert_eq!(page_options.base_path, "/wiki/");
        assert_eq!(page_options.page.as_deref(), Some("Dev/Guide"));
        assert_eq!(
            page_options.attachment_path.as_deref(),
            Some("/files/Dev/Guide")
        );
    }

    #[test]
    fn test_url_rewrite_rejects_self_matching_pairs() {
        assert!(UrlRewrite::new("http://a", "https://b").is_ok());
        assert!(UrlRewrite::new("", "https://b").is_err());
        assert!(UrlRewrite::new("example.org", "https://example.org/x").is_err());
    }

    #[test]
    fn test_url_rewrite_set_rejects_chains() -> Result<(), Error> {
        let first = UrlRewrite::new("http://a/", "http://b/")?;
        let second = UrlRewrite::new("http://b/", "http://c/")?;
        assert!(UrlRewrite::validate_set(&[first.clone(), second.clone()]).is_err());
        assert!(UrlRewrite::validate_set(&[second, first.clone()]).is_err());
        assert!(UrlRewrite::validate_set(&[first]).is_ok());
        Ok(())
    }

    #[test]
    fn test_ticket_policy_deserializes_tagged() -> Result<(), serde_json::Error> {
        let policy: TicketPolicy = serde_json::from_str(
            r#"{"policy": "rewrite_to", "url_prefix": "https://trac.example.org/ticket"}"#,
        )?;
        assert_eq!(
            policy,
            TicketPolicy::RewriteTo {
                url_prefix: "https://trac.example.org/ticket".to_string()
            }
        );
        Ok(())
    }
}
