//! Trac wiki markup to GitHub-flavoured Markdown.
//!
//! The converter is a line-oriented transducer made of small passes:
//!
//! 1. [`normalize`] - line endings, directive removal, bare reference rewrites
//! 2. [`extract_headings`] - `== Title ==` to `## Title`, optionally recording anchors
//! 3. block scanning - fences, quotes, lists and inline substitutions
//! 4. table assembly - `||` rows and `{{{#!td` cell blocks
//! 5. [`finalize`] - placeholder resolution and URL rewrites
//!
//! Conversion never fails: malformed markup degrades to literal text.
//!
//! # Example
//!
//! ```
//! use trac2md_core::{Options, Tables};
//!
//! let tables = Tables::new();
//! let context = tables.context(Options::default());
//! let markdown = trac2md_converter::convert("'''bold''' and ''italic''", &context);
//! assert_eq!(markdown, "**bold** and *italic*");
//! ```
//!
//! Cross-page anchors need every page's headings before any page is
//! converted, so record them first:
//!
//! ```
//! use trac2md_core::{Options, Tables};
//!
//! let mut tables = Tables::new();
//! tables.pages.insert("Guide");
//! trac2md_converter::record_headings(&mut tables.registry, "Guide", "== Build Steps ==\n");
//!
//! let context = tables.context(Options::builder().with_base_path("/wiki/").build());
//! let markdown = trac2md_converter::convert("[wiki:Guide#BuildSteps building]", &context);
//! assert_eq!(markdown, "[building](Guide#build-steps)");
//! ```
use regex::Regex;
use trac2md_core::{Context, LinkRegistry};

mod fence;
mod finalize;
mod heading;
mod inline;
mod list;
mod normalize;
mod scanner;
mod table;

#[cfg(test)]
mod proptests;

pub use finalize::{PIPE_PLACEHOLDER, finalize};
pub use heading::{RegistryMode, extract_headings};
pub use normalize::normalize;

/// Convert one Trac document to GitHub-flavoured Markdown.
#[must_use]
#[tracing::instrument(skip_all, fields(page = context.options.page.as_deref(), len = text.len()))]
pub fn convert(text: &str, context: &Context) -> String {
    let normalized = normalize(text);
    let rendered = render(&normalized, context, 0).join("\n");
    finalize(&rendered, &context.options)
}

/// Record the headings of `page` in the registry.
///
/// Returns the number of anchors added.
#[tracing::instrument(skip(registry, text))]
pub fn record_headings(registry: &mut LinkRegistry, page: &str, text: &str) -> usize {
    let before = registry.len();
    let normalized = normalize(text);
    let _ = extract_headings(
        &normalized,
        RegistryMode::Build {
            registry: &mut *registry,
            page,
        },
    );
    let recorded = registry.len().saturating_sub(before);
    tracing::debug!(recorded, "recorded heading anchors");
    recorded
}

/// Headings, block scan and table assembly over normalized text.
///
/// Cell blocks re-enter here with `nesting` one higher, so nested content is
/// converted the same way as the surrounding document.
pub(crate) fn render(text: &str, context: &Context, nesting: usize) -> Vec<String> {
    let text = extract_headings(text, RegistryMode::Read);
    let lines = scanner::scan(&text, context);
    table::assemble(lines, context, nesting)
}

/// Compile one of the crate's built-in patterns.
#[allow(clippy::expect_used)]
pub(crate) fn pattern(source: &str) -> Regex {
    // Every pattern is a literal exercised by the unit tests.
    Regex::new(source).expect("built-in pattern is valid")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use trac2md_core::{Options, Tables};

    use super::*;

    #[rstest]
    #[case::ticket_in_code("run {{{see ticket:5}}} now", "run `see ticket:5` now")]
    #[case::break_in_code("{{{a[[BR]]b}}} ticket:5", "`a[[BR]]b` #5")]
    #[case::years_stay_text(
        "2019. It was a good year.\n1999. So was this.",
        "2019. It was a good year.\n1999. So was this."
    )]
    #[case::indented_numbers_renumber(" 3. one\n 7. two", "1. one\n2. two")]
    #[case::table_then_text(
        "||a||b||\n||1||2||\nafter text",
        "| a | b |\n| --- | --- |\n| 1 | 2 |\n\nafter text"
    )]
    fn test_convert(#[case] input: &str, #[case] expected: &str) {
        let tables = Tables::new();
        let context = tables.context(Options::default());
        assert_eq!(convert(input, &context), expected);
    }

    #[test]
    fn test_deep_cell_nesting_converts() {
        let depth = 1000;
        let input = format!("{}x\n{}", "{{{#!td\n".repeat(depth), "}}}\n".repeat(depth));
        let tables = Tables::new();
        let context = tables.context(Options::default());
        let markdown = convert(&input, &context);
        assert!(markdown.starts_with("<table>"));
        assert!(markdown.lines().any(|line| line == "x"));
    }
}
