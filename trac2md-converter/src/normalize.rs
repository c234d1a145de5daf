use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{PIPE_PLACEHOLDER, fence::FenceDepth, inline::CODE_SPAN, pattern};

static DIRECTIVE_LINE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s*\[\[(?:TOC|PageOutline)(?:\([^)]*\))?\]\]\s*$"));

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| pattern(r"\[\[(?:BR|br)\]\]"));

static BARE_WIKI: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(^|[\s(])wiki:([\w/#-]+(?:\.[\w/#-]+)*)"));

static BARE_TICKET: LazyLock<Regex> = LazyLock::new(|| pattern(r"(^|[\s(])ticket:(\d+)\b"));

/// Commit hook comments: `In [changeset:"rev/repo" rev/repo]:` and a `{{{`
/// block holding the commit message.
static CHANGESET_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r#"(?m)^In \[changeset:"([^"/\]]+)(?:/[^"\]]*)?"[^\]\n]*\]:\n\{\{\{\n(?:#![^\n]*\n)?((?s:.*?))\n\}\}\}$"#,
    )
});

/// Bring a document into the shape every later pass expects.
///
/// Total and idempotent. Fenced interiors are left untouched apart from
/// line endings.
#[must_use]
#[tracing::instrument(skip_all, fields(len = text.len()))]
pub fn normalize(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(PIPE_PLACEHOLDER, "");
    let text = CHANGESET_COMMENT.replace_all(&text, quote_commit_message);

    let mut fences = FenceDepth::default();
    let mut lines = Vec::new();
    for line in text.split('\n') {
        if !fences.is_open_text(line) {
            lines.push(line.to_string());
            continue;
        }
        if DIRECTIVE_LINE.is_match(line) {
            tracing::trace!(line, "dropping directive");
            continue;
        }
        lines.push(rewrite_outside_code(line));
    }
    lines.join("\n")
}

/// Apply the line rewrites to everything but inline code spans.
fn rewrite_outside_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for span in CODE_SPAN.find_iter(line) {
        out.push_str(&rewrite(line.get(last..span.start()).unwrap_or_default()));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&rewrite(line.get(last..).unwrap_or_default()));
    out
}

fn rewrite(text: &str) -> String {
    let text = LINE_BREAK.replace_all(text, "\n");
    let text = BARE_WIKI.replace_all(&text, "${1}[wiki:${2}]");
    BARE_TICKET.replace_all(&text, "${1}#${2}").into_owned()
}

fn quote_commit_message(caps: &Captures) -> String {
    let revision = caps.get(1).map_or("", |m| m.as_str());
    let message = caps.get(2).map_or("", |m| m.as_str());
    let mut out = format!("In [changeset:{revision}]:");
    for line in message.split('\n') {
        out.push('\n');
        if line.trim().is_empty() {
            out.push('>');
        } else {
            out.push_str("> ");
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::crlf("a\r\nb\rc", "a\nb\nc")]
    #[case::toc("[[TOC]]\n= Title =\n", "= Title =\n")]
    #[case::outline("intro\n  [[PageOutline(2-3, Contents)]]  \nrest", "intro\nrest")]
    #[case::inline_toc_kept("see [[TOC]] here", "see [[TOC]] here")]
    #[case::line_break("one[[BR]]two[[br]]three", "one\ntwo\nthree")]
    #[case::bare_wiki("see wiki:Dev/Guide.", "see [wiki:Dev/Guide].")]
    #[case::bare_wiki_start("wiki:WikiStart#Intro is", "[wiki:WikiStart#Intro] is")]
    #[case::bracketed_wiki("[wiki:Page label]", "[wiki:Page label]")]
    #[case::bare_ticket("fixed in ticket:42, (ticket:7)", "fixed in #42, (#7)")]
    #[case::comment_ticket_kept("comment:3:ticket:12", "comment:3:ticket:12")]
    #[case::code_span_ticket("run {{{see ticket:5}}} now", "run {{{see ticket:5}}} now")]
    #[case::code_span_break("type {{{a[[BR]]b}}} ticket:5", "type {{{a[[BR]]b}}} #5")]
    #[case::backtick_span("`wiki:Page` and wiki:Page", "`wiki:Page` and [wiki:Page]")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_fenced_interior_untouched() {
        let input = "{{{\n[[TOC]]\nwiki:Page ticket:1 [[BR]]\n}}}\nticket:1";
        assert_eq!(
            normalize(input),
            "{{{\n[[TOC]]\nwiki:Page ticket:1 [[BR]]\n}}}\n#1"
        );
    }

    #[test]
    fn test_changeset_comment_becomes_quote() {
        let input = "In [changeset:\"1234\" 1234]:\n{{{\n#!CommitTicketReference repository=\"\" revision=\"1234\"\nFix the build\n\nRefs #12\n}}}\nmore";
        assert_eq!(
            normalize(input),
            "In [changeset:1234]:\n> Fix the build\n>\n> Refs #12\nmore"
        );
    }

    #[test]
    fn test_changeset_comment_with_repository() {
        let input = "In [changeset:\"abc1234def/proj\" abc1234def/proj]:\n{{{\nTidy\n}}}";
        assert_eq!(normalize(input), "In [changeset:abc1234def]:\n> Tidy");
    }

    #[rstest]
    #[case("[[TOC]]\r\nIn [changeset:\"9\" 9]:\n{{{\nmsg\n}}}\nwiki:A ticket:2[[BR]]x")]
    #[case("{{{\n}}}\n}}}\n{{{#!html\n<b>\n")]
    fn test_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }
}
