//! Block structure: fenced regions, quotes, lists and paragraphs.
//!
//! The scanner walks normalized lines once and tags every output line with
//! the region it belongs to and its quote depth. Plain lines leave the
//! scanner fully converted (list markers renumbered, inline rules applied);
//! region lines are copied verbatim for the assembler.
use trac2md_core::Context;

use crate::{
    fence::{self, Fence},
    inline,
    list::{self, ListRenumberer},
};

/// Fenced region a line belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Region {
    Plain,
    Code { lang: Option<String> },
    RawHtml,
    CellBlock { header: bool },
}

/// Position of a line within its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Part {
    Open,
    Body,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaggedLine {
    pub(crate) text: String,
    pub(crate) quote_depth: usize,
    pub(crate) region: Region,
    pub(crate) part: Part,
}

#[derive(Debug)]
struct OpenRegion {
    region: Region,
    /// Nesting depth the closing `}}}` has to bring us back to.
    fence_level: usize,
    column: usize,
    /// Index of the first body line in the output.
    first_line: usize,
    /// Largest amount a body line sits left of the fence.
    deficit: usize,
    quote_depth: usize,
}

struct Scanner<'c, 'a> {
    context: &'c Context<'a>,
    depth: usize,
    /// Open `{{{#!wiki` / `{{{#!div` blocks; counted in `depth` as well.
    transparent: usize,
    open: Option<OpenRegion>,
    quote_prefix: String,
    quote_depth: usize,
    lists: ListRenumberer,
    /// Whether the last output line is paragraph text a continuation may join.
    joinable: bool,
    /// A table row ending in `\`, waiting for the line it continues on, with
    /// its quote depth.
    pending_row: Option<(String, usize)>,
    lines: Vec<TaggedLine>,
}

/// Tag every line of `text`.
pub(crate) fn scan(text: &str, context: &Context) -> Vec<TaggedLine> {
    let mut scanner = Scanner {
        context,
        depth: 0,
        transparent: 0,
        open: None,
        quote_prefix: String::new(),
        quote_depth: 0,
        lists: ListRenumberer::default(),
        joinable: false,
        pending_row: None,
        lines: Vec::new(),
    };
    for line in text.split('\n') {
        scanner.line(line);
    }
    scanner.finish()
}

impl Scanner<'_, '_> {
    fn line(&mut self, raw: &str) {
        let line = skip_prefix(raw, self.context.options.skip_prefix);
        let body = self.strip_quote(line);
        let trimmed = body.trim();
        let column = indentation(body);

        if self.open.is_some() {
            self.region_line(body, trimmed, column);
            return;
        }
        let fence = fence::classify(trimmed);
        if self
            .pending_row
            .as_ref()
            .is_some_and(|(_, depth)| fence.is_some() || *depth != self.quote_depth)
        {
            self.flush_pending_row();
        }
        match fence {
            Some(Fence::Open(processor)) if fence::is_transparent(processor) => {
                self.depth += 1;
                self.transparent += 1;
                self.joinable = false;
            }
            Some(Fence::Open(processor)) => self.open_region(processor, column),
            Some(Fence::Close) if self.transparent > 0 => {
                self.depth = self.depth.saturating_sub(1);
                self.transparent -= 1;
                self.joinable = false;
            }
            Some(Fence::Close) => {
                tracing::debug!("stray closing fence kept as text");
                self.plain_line(body, column);
            }
            None => self.plain_line(body, column),
        }
    }

    /// Track the quote prefix and return the line without it.
    fn strip_quote<'l>(&mut self, line: &'l str) -> &'l str {
        let mut body = line;
        if !self.quote_prefix.is_empty() {
            if let Some(rest) = line.strip_prefix(self.quote_prefix.as_str()) {
                // A quote opened by a bare `>` still takes `> text` lines.
                body = if self.quote_prefix.ends_with('>') {
                    rest.strip_prefix(' ').unwrap_or(rest)
                } else {
                    rest
                };
            } else if line.trim_end() == self.quote_prefix.trim_end() {
                return "";
            } else {
                self.leave_quote();
            }
        }
        if self.open.is_none() {
            let marker = quote_marker_len(body);
            if marker > 0
                && let (Some(prefix), Some(rest)) = (body.get(..marker), body.get(marker..))
            {
                self.quote_prefix.push_str(prefix);
                self.quote_depth += prefix.matches('>').count();
                self.lists.reset();
                self.joinable = false;
                body = rest;
            }
        }
        body
    }

    fn leave_quote(&mut self) {
        if self.open.is_some() {
            tracing::warn!(
                quote_depth = self.quote_depth,
                "quote ended inside a fenced block, closing the block"
            );
            self.close_region(true);
        }
        self.quote_prefix.clear();
        self.quote_depth = 0;
        self.lists.reset();
        self.joinable = false;
    }

    fn open_region(&mut self, processor: &str, column: usize) {
        let name = processor
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let region = match name.as_str() {
            "html" => Region::RawHtml,
            "td" => Region::CellBlock { header: false },
            "th" => Region::CellBlock { header: true },
            "" | "default" | "text" | "txt" | "plain" | "committicketreference" => {
                Region::Code { lang: None }
            }
            "c++" | "cxx" => Region::Code {
                lang: Some("cpp".to_string()),
            },
            "py" => Region::Code {
                lang: Some("python".to_string()),
            },
            lang => Region::Code {
                lang: Some(lang.to_string()),
            },
        };
        tracing::debug!(?region, column, depth = self.depth, "opening fenced region");
        let text = match &region {
            Region::Code { lang } => {
                format!("{}```{}", " ".repeat(column), lang.as_deref().unwrap_or_default())
            }
            Region::RawHtml | Region::CellBlock { .. } | Region::Plain => String::new(),
        };
        self.joinable = false;
        self.lines.push(TaggedLine {
            text,
            quote_depth: self.quote_depth,
            region: region.clone(),
            part: Part::Open,
        });
        self.open = Some(OpenRegion {
            region,
            fence_level: self.depth,
            column,
            first_line: self.lines.len(),
            deficit: 0,
            quote_depth: self.quote_depth,
        });
        self.depth += 1;
    }

    fn region_line(&mut self, body: &str, trimmed: &str, column: usize) {
        match fence::classify(trimmed) {
            Some(Fence::Open(_)) => self.depth += 1,
            Some(Fence::Close) => {
                self.depth = self.depth.saturating_sub(1);
                if self
                    .open
                    .as_ref()
                    .is_some_and(|open| open.fence_level == self.depth)
                {
                    self.close_region(false);
                    return;
                }
            }
            None => {}
        }
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if !trimmed.is_empty() && column < open.column {
            open.deficit = open.deficit.max(open.column - column);
        }
        self.lines.push(TaggedLine {
            text: body.to_string(),
            quote_depth: open.quote_depth,
            region: open.region.clone(),
            part: Part::Body,
        });
    }

    /// Close the open region. `synthesized` marks a recovery close for a
    /// fence that never came.
    fn close_region(&mut self, synthesized: bool) {
        let Some(open) = self.open.take() else {
            return;
        };
        if synthesized {
            tracing::warn!(region = ?open.region, "unterminated fenced block, synthesizing a closing fence");
        }
        if open.deficit > 0 {
            tracing::debug!(deficit = open.deficit, "re-indenting fenced block");
            let pad = " ".repeat(open.deficit);
            for line in self.lines.iter_mut().skip(open.first_line) {
                if !line.text.is_empty() {
                    line.text.insert_str(0, &pad);
                }
            }
        }
        let text = match &open.region {
            Region::Code { .. } => format!("{}```", " ".repeat(open.column)),
            Region::RawHtml | Region::CellBlock { .. } | Region::Plain => String::new(),
        };
        self.lines.push(TaggedLine {
            text,
            quote_depth: open.quote_depth,
            region: open.region,
            part: Part::Close,
        });
        self.depth = open.fence_level;
        self.joinable = false;
    }

    fn plain_line(&mut self, body: &str, column: usize) {
        let joined;
        let body = match self.pending_row.take() {
            Some((row, _)) => {
                joined = join_row(&row, body);
                joined.as_str()
            }
            None => body,
        };
        let trimmed = body.trim();
        if trimmed.starts_with("||") && trimmed.ends_with('\\') {
            self.lists.reset();
            self.joinable = false;
            self.pending_row = Some((trimmed.to_string(), self.quote_depth));
            return;
        }
        if trimmed.is_empty() {
            self.joinable = false;
            self.push_plain(String::new());
            return;
        }
        if trimmed.starts_with("||") || trimmed.starts_with("|-") {
            self.lists.reset();
            self.joinable = false;
            let row = self.substitute_row(body);
            self.push_plain(row);
            return;
        }
        if let Some(item) = list::parse_item(body) {
            let marker = self.lists.item(&item);
            let content = inline::substitute(item.content, self.context);
            self.push_plain(format!("{marker}{content}"));
            self.joinable = true;
            return;
        }
        if self.lists.is_active() {
            let content_column = if column == 0 {
                self.lists.reset();
                None
            } else {
                self.lists.continuation(column)
            };
            if let Some(content_column) = content_column {
                let content = inline::substitute(trimmed, self.context);
                if !(starts_paragraph_text(trimmed) && self.join_onto_previous(&content)) {
                    self.push_plain(format!("{}{content}", " ".repeat(content_column)));
                    self.joinable = true;
                }
                return;
            }
        }
        if column >= 4 {
            self.joinable = false;
            self.push_plain(body.to_string());
            return;
        }
        if is_rule(trimmed) {
            if self.lines.last().is_some_and(|line| {
                line.region == Region::Plain && !line.text.trim().is_empty()
            }) {
                self.push_plain(String::new());
            }
            self.joinable = false;
            self.push_plain(trimmed.to_string());
            return;
        }
        let heading = is_heading(trimmed);
        let converted = inline::substitute(body, self.context);
        if !heading && starts_paragraph_text(trimmed) && self.join_onto_previous(&converted) {
            return;
        }
        self.push_plain(converted);
        self.joinable = !heading;
    }

    /// Inline substitution cell by cell, so no construct spans two cells.
    fn substitute_row(&self, row: &str) -> String {
        row.split("||")
            .map(|cell| inline::substitute(cell, self.context))
            .collect::<Vec<_>>()
            .join("||")
    }

    /// Emit a continued row whose continuation never came.
    fn flush_pending_row(&mut self) {
        let Some((row, quote_depth)) = self.pending_row.take() else {
            return;
        };
        let text = self.substitute_row(&row);
        self.lines.push(TaggedLine {
            text,
            quote_depth,
            region: Region::Plain,
            part: Part::Body,
        });
    }

    /// Append `content` to the previous paragraph line when joining is on.
    fn join_onto_previous(&mut self, content: &str) -> bool {
        if !(self.context.options.join_paragraphs && self.joinable) {
            return false;
        }
        let Some(previous) = self.lines.last_mut() else {
            return false;
        };
        previous.text.push(' ');
        previous.text.push_str(content.trim_start());
        true
    }

    fn push_plain(&mut self, text: String) {
        self.lines.push(TaggedLine {
            text,
            quote_depth: self.quote_depth,
            region: Region::Plain,
            part: Part::Body,
        });
    }

    fn finish(mut self) -> Vec<TaggedLine> {
        self.flush_pending_row();
        if self.open.is_some() {
            self.close_region(true);
        }
        self.lines
    }
}

/// `left||\` + `||right` joins into one row; anything else joins with a space.
fn join_row(left: &str, right: &str) -> String {
    let left = left.trim_end();
    let left = left.strip_suffix('\\').unwrap_or(left).trim_end();
    let right = right.trim();
    match (left.strip_suffix("||"), right.starts_with("||")) {
        (Some(head), true) => format!("{head}{right}"),
        _ => format!("{left} {right}"),
    }
}

/// Remove up to `skip` leading spaces.
fn skip_prefix(line: &str, skip: usize) -> &str {
    let spaces = line.bytes().take(skip).take_while(|&b| b == b' ').count();
    line.get(spaces..).unwrap_or(line)
}

/// Byte length of a leading run of `>` markers, each optionally followed by
/// one space.
fn quote_marker_len(line: &str) -> usize {
    let bytes = line.as_bytes();
    let mut len = 0;
    while bytes.get(len) == Some(&b'>') {
        len += 1;
        if bytes.get(len) == Some(&b' ') {
            len += 1;
        }
    }
    len
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn is_heading(trimmed: &str) -> bool {
    let hashes = trimmed.len() - trimmed.trim_start_matches('#').len();
    (1..=6).contains(&hashes) && trimmed.get(hashes..).is_some_and(|rest| rest.starts_with(' '))
}

fn is_rule(trimmed: &str) -> bool {
    trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'-')
}

/// A line that may continue a paragraph: it starts with ordinary text rather
/// than something that opens a block of its own.
fn starts_paragraph_text(trimmed: &str) -> bool {
    trimmed.chars().next().is_some_and(|c| {
        !c.is_whitespace() && !c.is_ascii_digit() && !matches!(c, '`' | '*' | '#' | '=' | '>' | '-' | '_' | '|' | '{')
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use trac2md_core::{Options, Tables};

    use super::*;

    fn scan_with(text: &str, options: Options) -> Vec<TaggedLine> {
        let tables = Tables::new();
        scan(text, &tables.context(options))
    }

    fn texts(lines: &[TaggedLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn test_code_block_interior_is_verbatim() {
        let lines = scan_with("{{{\n  ''x'' #1\n}}}", Options::default());
        assert_eq!(texts(&lines), ["```", "  ''x'' #1", "```"]);
        assert_eq!(lines.get(1).map(|line| &line.region), Some(&Region::Code { lang: None }));
    }

    #[test]
    fn test_processor_becomes_language() {
        let lines = scan_with("{{{#!python\nprint(1)\n}}}", Options::default());
        assert_eq!(texts(&lines), ["```python", "print(1)", "```"]);
    }

    #[test]
    fn test_nested_fence_is_literal() {
        let lines = scan_with("{{{\n{{{\ninner\n}}}\n}}}\nafter", Options::default());
        assert_eq!(texts(&lines), ["```", "{{{", "inner", "}}}", "```", "after"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_unterminated_block_is_closed() {
        let lines = scan_with("{{{\nfoo", Options::default());
        assert_eq!(texts(&lines), ["```", "foo", "```"]);
        assert!(logs_contain("synthesizing a closing fence"));
    }

    #[test]
    fn test_deficit_padding() {
        let lines = scan_with("    {{{\n  a\n      b\n    }}}", Options::default());
        assert_eq!(texts(&lines), ["    ```", "    a", "        b", "    ```"]);
    }

    #[test]
    fn test_quoted_code_block() {
        let lines = scan_with("> {{{\n> a\n>\n> }}}\n> text", Options::default());
        assert_eq!(texts(&lines), ["```", "a", "", "```", "text"]);
        assert!(lines.iter().all(|line| line.quote_depth == 1));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_quote_mismatch_closes_block() {
        let lines = scan_with("> {{{\n> a\nplain", Options::default());
        assert_eq!(texts(&lines), ["```", "a", "```", "plain"]);
        assert_eq!(
            lines.iter().map(|line| line.quote_depth).collect::<Vec<_>>(),
            [1, 1, 1, 0]
        );
        assert!(logs_contain("quote ended inside a fenced block"));
    }

    #[test]
    fn test_nested_quotes() {
        let lines = scan_with("> a\n> > b\n> c", Options::default());
        assert_eq!(texts(&lines), ["a", "b", "c"]);
        assert_eq!(
            lines.iter().map(|line| line.quote_depth).collect::<Vec<_>>(),
            [1, 2, 1]
        );
    }

    #[test]
    fn test_raw_html_and_cell_blocks() {
        let lines = scan_with("{{{#!html\n<b>x</b>\n}}}\n{{{#!th align=left\nH\n}}}", Options::default());
        let regions: Vec<_> = lines.iter().map(|line| (&line.region, line.part)).collect();
        assert_eq!(
            regions,
            [
                (&Region::RawHtml, Part::Open),
                (&Region::RawHtml, Part::Body),
                (&Region::RawHtml, Part::Close),
                (&Region::CellBlock { header: true }, Part::Open),
                (&Region::CellBlock { header: true }, Part::Body),
                (&Region::CellBlock { header: true }, Part::Close),
            ]
        );
    }

    #[test]
    fn test_transparent_block_content_is_converted() {
        let lines = scan_with("{{{#!div class=note\n''note''\n}}}", Options::default());
        assert_eq!(texts(&lines), ["*note*"]);
    }

    #[test]
    fn test_lists_renumber_and_reflow() {
        let lines = scan_with(" 1. one\n    more\n 5. two\n   * sub\nafter", Options::default());
        assert_eq!(texts(&lines), ["1. one", "   more", "2. two", "   - sub", "after"]);
    }

    #[test]
    fn test_preformatted_outside_lists() {
        let lines = scan_with("text\n\n    ''kept''", Options::default());
        assert_eq!(texts(&lines), ["text", "", "    ''kept''"]);
    }

    #[test]
    fn test_join_paragraphs() {
        let options = Options::builder().with_join_paragraphs().build();
        let lines = scan_with("first line\nsecond line\n\n * item\n   wrapped\n== x\n# Title\nnext", options);
        assert_eq!(
            texts(&lines),
            ["first line second line", "", "- item wrapped", "== x", "# Title", "next"]
        );
    }

    #[test]
    fn test_skip_prefix() {
        let options = Options::builder().with_skip_prefix(2).build();
        let lines = scan_with("  {{{\n    code\n  }}}", options);
        assert_eq!(texts(&lines), ["```", "  code", "```"]);
    }

    #[test]
    fn test_rule_after_paragraph_gets_blank_line() {
        let lines = scan_with("text\n----", Options::default());
        assert_eq!(texts(&lines), ["text", "", "----"]);
    }

    #[test]
    fn test_continued_row_joined_before_substitution() {
        let lines = scan_with("||''a \\\nb''||c||\\\n||d||\nafter", Options::default());
        assert_eq!(texts(&lines), ["||*a b*||c||d||", "after"]);
    }

    #[test]
    fn test_continued_row_flushed_by_fence() {
        let lines = scan_with("||a||\\\n{{{\nx\n}}}", Options::default());
        assert_eq!(texts(&lines), ["||a||\\", "```", "x", "```"]);
    }

    #[rstest]
    #[case("||a||\\", "||b||", "||a||b||")]
    #[case("||a long \\", "text||", "||a long text||")]
    fn test_join_row(#[case] left: &str, #[case] right: &str, #[case] expected: &str) {
        assert_eq!(join_row(left, right), expected);
    }

    #[test]
    fn test_table_rows_converted_per_cell() {
        let lines = scan_with("||''a''||b''||''c||", Options::default());
        assert_eq!(texts(&lines), ["||*a*||b''||''c||"]);
    }
}
