//! Shared data model for converting Trac wiki markup to GitHub-flavoured
//! Markdown.
//!
//! This crate holds everything a conversion consults but never changes:
//!
//! - [`Options`] - per-document settings, built with [`Options::builder`]
//! - [`Tables`] - run-scoped lookup tables ([`PageIndex`], [`UserTable`],
//!   [`CommitMap`] and the [`LinkRegistry`])
//! - [`Context`] - options plus borrowed [`Lookups`], handed to the converter
//! - [`ContextConfig`] - JSON configuration for the command-line front end
//!
//! # Example
//!
//! ```
//! use trac2md_core::{Options, Tables};
//!
//! let mut tables = Tables::new();
//! tables.pages.insert("WikiStart");
//! tables.registry.record_heading("WikiStart", "Getting Started", None);
//!
//! // Once built, the tables are only borrowed.
//! let context = tables.context(Options::builder().with_base_path("/issues/").build());
//! assert!(context.pages().contains("WikiStart"));
//! ```

mod config;
mod context;
mod error;
mod options;
mod registry;
mod tables;

pub use config::ContextConfig;
pub use context::{Context, Lookups};
pub use error::Error;
pub use options::{
    DEFAULT_SOURCE_ROOT, DEFAULT_WIKI_ROOT, Options, OptionsBuilder, TicketPolicy, UrlRewrite,
};
pub use registry::{LinkRegistry, github_slug, trac_anchor};
pub use tables::{CommitMap, PageIndex, Tables, UserTable, page_target_name};
