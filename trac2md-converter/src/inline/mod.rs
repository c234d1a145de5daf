//! Inline substitutions for plain lines.
//!
//! A line is held as a sequence of segments. Text segments are still Trac
//! markup; literal segments are finished Markdown that no later rule may look
//! at. Each rule only rewrites text segments and emits literals, so the rules
//! can run in a fixed order without re-matching each other's output.
use std::sync::LazyLock;

use regex::{Captures, Regex};
use trac2md_core::{Context, UserTable};

use crate::{PIPE_PLACEHOLDER, pattern};

mod links;

use links::Linker;

pub(crate) static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\{\{\{(.+?)\}\}\}|`([^`]+)`"));

/// `!` in front of a link-like construct keeps it literal. A `!` directly
/// followed by `(` after the construct is left alone.
static ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"!(\[\[[^\]]*\]\]|\[[^\]]*\]|#\d+|(?:wiki|ticket|source|attachment|changeset|comment|report|milestone):[^\s\]]+|r\d+\b|@\w+|[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+)(\()?",
    )
});

static SUPERSCRIPT: LazyLock<Regex> = LazyLock::new(|| pattern(r"\^([^\s^]+)\^"));

static SUBSCRIPT: LazyLock<Regex> = LazyLock::new(|| pattern(r",,([^\s,]+),,"));

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(^|[^\w.@/`])@([A-Za-z0-9](?:[\w.-]*\w)?)"));

static CAMEL_CASE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(^|[^\w/.#-])([A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+(?:/[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+)*)\b")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Trac markup, still open to rewriting.
    Text(String),
    /// Finished Markdown.
    Literal(String),
}

impl Segment {
    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) | Self::Literal(text) => text.is_empty(),
        }
    }
}

fn text(value: impl Into<String>) -> Segment {
    Segment::Text(value.into())
}

fn literal(value: impl Into<String>) -> Segment {
    Segment::Literal(value.into())
}

/// Capture group `index`, or `""` when it did not participate.
fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

#[derive(Debug, Default)]
struct Segments(Vec<Segment>);

impl Segments {
    fn new(line: &str) -> Self {
        Self(vec![text(line)])
    }

    /// Rewrite every match of `re` in the text segments. A rule returning
    /// `None` leaves that match as it is.
    fn apply<F>(&mut self, re: &Regex, mut rule: F)
    where
        F: FnMut(&Captures<'_>) -> Option<Vec<Segment>>,
    {
        for segment in std::mem::take(&mut self.0) {
            let line = match segment {
                Segment::Literal(value) => {
                    self.0.push(Segment::Literal(value));
                    continue;
                }
                Segment::Text(line) => line,
            };
            let mut last = 0;
            for caps in re.captures_iter(&line) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let Some(replacement) = rule(&caps) else {
                    continue;
                };
                self.push_text(line.get(last..whole.start()).unwrap_or_default());
                self.0
                    .extend(replacement.into_iter().filter(|segment| !segment.is_empty()));
                last = whole.end();
            }
            self.push_text(line.get(last..).unwrap_or_default());
        }
    }

    /// Turn paired occurrences of `marker` into `replacement`, pairing across
    /// segment boundaries so emphasis may wrap a link. An unpaired final
    /// marker stays text.
    fn delimit(&mut self, marker: &str, replacement: &str) {
        let total: usize = self
            .0
            .iter()
            .map(|segment| match segment {
                Segment::Text(line) => line.matches(marker).count(),
                Segment::Literal(_) => 0,
            })
            .sum();
        let mut remaining = total - total % 2;
        if remaining == 0 {
            return;
        }
        for segment in std::mem::take(&mut self.0) {
            let line = match segment {
                Segment::Literal(value) => {
                    self.0.push(Segment::Literal(value));
                    continue;
                }
                Segment::Text(line) => line,
            };
            let mut last = 0;
            for (start, _) in line.match_indices(marker) {
                if remaining == 0 {
                    break;
                }
                self.push_text(line.get(last..start).unwrap_or_default());
                self.0.push(literal(replacement));
                last = start + marker.len();
                remaining -= 1;
            }
            self.push_text(line.get(last..).unwrap_or_default());
        }
    }

    fn push_text(&mut self, value: &str) {
        if !value.is_empty() {
            self.0.push(text(value));
        }
    }

    fn render(self) -> String {
        self.0
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(value) | Segment::Literal(value) => value,
            })
            .collect()
    }
}

/// Render `content` as a backtick code span. Pipes are replaced by the
/// placeholder so table splitting never sees them.
pub(crate) fn code_span(content: &str) -> String {
    let fence = if content.contains('`') { "``" } else { "`" };
    let pad = if content.starts_with('`') || content.ends_with('`') {
        " "
    } else {
        ""
    };
    let content: String = content
        .chars()
        .map(|c| if c == '|' { PIPE_PLACEHOLDER } else { c })
        .collect();
    format!("{fence}{pad}{content}{pad}{fence}")
}

/// Apply every inline rule to one plain line.
pub(crate) fn substitute(line: &str, context: &Context) -> String {
    let links = Linker::new(context);
    let mut segments = Segments::new(line);

    protect(&mut segments);
    segments.apply(&SUPERSCRIPT, |caps| {
        Some(vec![literal("<sup>"), text(group(caps, 1)), literal("</sup>")])
    });
    segments.apply(&SUBSCRIPT, |caps| {
        Some(vec![literal("<sub>"), text(group(caps, 1)), literal("</sub>")])
    });
    links.external(&mut segments);
    links.internal(&mut segments);
    links.files(&mut segments);
    segments.delimit("'''''", "***");
    segments.delimit("'''", "**");
    segments.delimit("''", "*");
    links.tickets(&mut segments);
    mentions(&mut segments, context.users());
    camel_case(&mut segments, &links);

    segments.render()
}

/// Code spans and `!` escapes become literals before any rule runs.
fn protect(segments: &mut Segments) {
    segments.apply(&CODE_SPAN, |caps| {
        let content = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        Some(vec![literal(code_span(content))])
    });
    segments.apply(&ESCAPE, |caps| {
        if caps.get(2).is_some() {
            return None;
        }
        Some(vec![literal(group(caps, 1))])
    });
}

fn mentions(segments: &mut Segments, users: &UserTable) {
    segments.apply(&MENTION, |caps| {
        let handle = group(caps, 2);
        let rendered = match users.resolve(handle) {
            Some(target) => format!("@{target}"),
            None => {
                tracing::debug!(handle, "unmapped mention");
                code_span(&format!("@{handle}"))
            }
        };
        Some(vec![text(group(caps, 1)), literal(rendered)])
    });
}

/// Link `CamelCase` words naming known pages, outside any `[...]`.
///
/// Bracket depth runs across the text segments of the whole line. Finished
/// literals (links, code spans, URLs) never open or close a bracket.
fn camel_case(segments: &mut Segments, links: &Linker) {
    let mut depth = 0;
    for segment in std::mem::take(&mut segments.0) {
        let line = match segment {
            Segment::Literal(value) => {
                segments.0.push(Segment::Literal(value));
                continue;
            }
            Segment::Text(line) => line,
        };
        let mut last = 0;
        for caps in CAMEL_CASE.captures_iter(&line) {
            let Some(word) = caps.get(2) else {
                continue;
            };
            let before = line.get(last..word.start()).unwrap_or_default();
            let here = bracket_depth(depth, before);
            if here != 0 || !links.is_known_page(word.as_str()) {
                continue;
            }
            segments.push_text(before);
            segments.0.push(links.wiki_link(word.as_str(), ""));
            depth = here;
            last = word.end();
        }
        let rest = line.get(last..).unwrap_or_default();
        depth = bracket_depth(depth, rest);
        segments.push_text(rest);
    }
}

fn bracket_depth(mut depth: usize, value: &str) -> usize {
    for c in value.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}
