//! JSON configuration consumed by the command-line front end.
//!
//! ```json
//! {
//!   "base_path": "/issues/",
//!   "ticket_policy": { "policy": "rewrite_to", "url_prefix": "https://trac.example.org/ticket" },
//!   "join_paragraphs": true,
//!   "users": { "jdoe": "janedoe", "ghost": null },
//!   "pages": ["WikiStart", "Dev/Guide"],
//!   "url_rewrites": [{ "from": "https://trac.example.org/wiki/", "to": "https://github.com/o/r/wiki/" }],
//!   "commit_map": "svn-git.map"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    CommitMap, Error, Options, PageIndex, Tables, TicketPolicy, UrlRewrite, UserTable,
    options::{DEFAULT_SOURCE_ROOT, DEFAULT_WIKI_ROOT},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub base_path: Option<String>,
    pub wiki_root: Option<String>,
    pub source_root: Option<String>,
    pub attachment_path: Option<String>,
    pub ticket_policy: TicketPolicy,
    pub join_paragraphs: bool,
    pub skip_prefix: usize,
    pub url_rewrites: Vec<UrlRewrite>,
    pub users: UserTable,
    pub pages: Vec<String>,
    /// Path of an svn to git commit map, relative to the configuration file.
    pub commit_map: Option<PathBuf>,
    #[serde(skip)]
    origin: Option<PathBuf>,
}

impl ContextConfig {
    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    #[tracing::instrument]
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let input = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&input)?;
        config.origin = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON for this shape.
    pub fn from_json(input: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(input)?)
    }

    /// Build conversion options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrlRewrite`] for rewrites that would match their own output.
    pub fn options(&self) -> Result<Options, Error> {
        UrlRewrite::validate_set(&self.url_rewrites)?;
        let mut builder = Options::builder()
            .with_base_path(self.base_path.clone().unwrap_or_else(|| "/".to_string()))
            .with_wiki_root(
                self.wiki_root
                    .clone()
                    .unwrap_or_else(|| DEFAULT_WIKI_ROOT.to_string()),
            )
            .with_source_root(
                self.source_root
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOURCE_ROOT.to_string()),
            )
            .with_ticket_policy(self.ticket_policy.clone())
            .with_skip_prefix(self.skip_prefix);
        if let Some(attachment_path) = &self.attachment_path {
            builder = builder.with_attachment_path(attachment_path.clone());
        }
        if self.join_paragraphs {
            builder = builder.with_join_paragraphs();
        }
        for rewrite in &self.url_rewrites {
            builder = builder.with_url_rewrite(rewrite.clone());
        }
        Ok(builder.build())
    }

    /// Build the lookup tables; the link registry starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit map cannot be read or parsed.
    pub fn tables(&self) -> Result<Tables, Error> {
        let commits = match &self.commit_map {
            Some(path) => {
                let path = match &self.origin {
                    Some(origin) if path.is_relative() => origin.join(path),
                    _ => path.clone(),
                };
                CommitMap::parse(&std::fs::read_to_string(path)?)?
            }
            None => CommitMap::new(),
        };
        Ok(Tables {
            pages: self.pages.iter().cloned().collect::<PageIndex>(),
            users: self.users.clone(),
            registry: crate::LinkRegistry::new(),
            commits,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_full_config() -> Result<(), Error> {
        let config = ContextConfig::from_json(
            r#"{
                "base_path": "/issues/",
                "ticket_policy": { "policy": "rewrite_to", "url_prefix": "https://trac.example.org/ticket" },
                "join_paragraphs": true,
                "users": { "jdoe": "janedoe", "ghost": null },
                "pages": ["WikiStart", "Dev/Guide"]
            }"#,
        )?;
        let options = config.options()?;
        assert_eq!(options.base_path, "/issues/");
        assert!(options.join_paragraphs);
        assert_eq!(
            options.ticket_policy,
            TicketPolicy::RewriteTo {
                url_prefix: "https://trac.example.org/ticket".to_string()
            }
        );
        let tables = config.tables()?;
        assert!(tables.pages.contains("Guide"));
        assert_eq!(tables.users.resolve("jdoe"), Some("janedoe"));
        assert_eq!(tables.users.resolve("ghost"), None);
        Ok(())
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = ContextConfig::from_json(r#"{ "base_pth": "/issues/" }"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_invalid_rewrite_rejected() -> Result<(), Error> {
        let config = ContextConfig::from_json(
            r#"{ "url_rewrites": [{ "from": "example.org", "to": "https://example.org" }] }"#,
        )?;
        assert!(matches!(config.options(), Err(Error::InvalidUrlRewrite(_))));
        Ok(())
    }

    #[test]
    fn test_chained_rewrites_rejected() -> Result<(), Error> {
        let config = ContextConfig::from_json(
            r#"{ "url_rewrites": [
                { "from": "http://b/", "to": "http://c/" },
                { "from": "http://a/", "to": "http://b/" }
            ] }"#,
        )?;
        assert!(matches!(config.options(), Err(Error::InvalidUrlRewrite(_))));
        Ok(())
    }

    #[test]
    fn test_commit_map_relative_to_config() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("svn.map"), "0123456789abcdef 12\n")?;
        let config_path = dir.path().join("context.json");
        let mut file = std::fs::File::create(&config_path)?;
        write!(file, r#"{{ "commit_map": "svn.map" }}"#)?;
        drop(file);

        let tables = ContextConfig::from_path(&config_path)?.tables()?;
        assert_eq!(tables.commits.resolve("12"), Some("0123456789"));
        Ok(())
    }
}
