use regex::{Captures, Regex};
use trac2md_core::{Options, UrlRewrite};

/// Stand-in for a `|` inside a code span, so table cell splitting and
/// escaping never touch it. Private use area; stripped from input.
pub const PIPE_PLACEHOLDER: char = '\u{E000}';

/// Resolve placeholders and apply the configured URL rewrites.
///
/// All rewrites run in a single pass preferring the longest source, so their
/// order does not matter and rewritten text is never matched again.
/// Idempotent for rule sets accepted by [`UrlRewrite::validate_set`].
#[must_use]
#[tracing::instrument(skip_all)]
pub fn finalize(text: &str, options: &Options) -> String {
    let text = text.replace(PIPE_PLACEHOLDER, "|");
    let Some(sources) = rewrite_pattern(&options.url_rewrites) else {
        return text;
    };
    sources
        .replace_all(&text, |caps: &Captures| {
            let from = caps.get(0).map_or("", |m| m.as_str());
            options
                .url_rewrites
                .iter()
                .find(|rewrite| rewrite.from == from)
                .map_or_else(|| from.to_string(), |rewrite| rewrite.to.clone())
        })
        .into_owned()
}

/// One alternation over every rewrite source, longest first.
fn rewrite_pattern(rewrites: &[UrlRewrite]) -> Option<Regex> {
    let mut sources: Vec<&str> = rewrites
        .iter()
        .map(|rewrite| rewrite.from.as_str())
        .filter(|from| !from.is_empty())
        .collect();
    if sources.is_empty() {
        return None;
    }
    sources.sort_by_key(|from| std::cmp::Reverse(from.len()));
    let alternation = sources
        .iter()
        .map(|from| regex::escape(from))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&alternation) {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            tracing::warn!(%error, "url rewrites skipped");
            None
        }
    }
}
