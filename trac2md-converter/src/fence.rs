//! Recognition of `{{{` / `}}}` fence lines.

/// What a trimmed line means to the fence machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fence<'a> {
    /// `{{{` or `{{{#!processor args`; carries the processor line (may be empty).
    Open(&'a str),
    Close,
}

/// Classify a line with surrounding whitespace already trimmed.
///
/// `{{{x}}}` on one line is an inline code span, not a fence.
pub(crate) fn classify(trimmed: &str) -> Option<Fence<'_>> {
    if trimmed == "}}}" {
        return Some(Fence::Close);
    }
    let rest = trimmed.strip_prefix("{{{")?;
    if rest.is_empty() {
        return Some(Fence::Open(""));
    }
    if rest.contains("}}}") {
        return None;
    }
    rest.strip_prefix("#!").map(|processor| Fence::Open(processor.trim()))
}

/// `{{{#!wiki` and `{{{#!div` wrap wiki markup: only their fence lines are
/// dropped, the content is converted like the surrounding text.
pub(crate) fn is_transparent(processor: &str) -> bool {
    let name = processor.split_whitespace().next().unwrap_or_default();
    name.eq_ignore_ascii_case("wiki") || name.eq_ignore_ascii_case("div")
}

/// Fence nesting for passes that run before the block scanner.
///
/// This knows nothing about quotes or table cells; it only keeps line-local
/// rewrites out of code interiors.
#[derive(Debug, Default)]
pub(crate) struct FenceDepth {
    /// One entry per open fence: `true` when it (or an outer one) is opaque.
    stack: Vec<bool>,
}

impl FenceDepth {
    /// Feed the next line. Returns `true` when the line is wiki text outside
    /// every opaque fence; fence lines themselves never are.
    pub(crate) fn is_open_text(&mut self, line: &str) -> bool {
        let opaque = self.stack.last().copied().unwrap_or(false);
        let trimmed = line.trim_start_matches(['>', ' ', '\t']).trim_end();
        match classify(trimmed) {
            Some(Fence::Open(processor)) => {
                self.stack.push(opaque || !is_transparent(processor));
                false
            }
            Some(Fence::Close) if !self.stack.is_empty() => {
                self.stack.pop();
                false
            }
            Some(Fence::Close) | None => !opaque,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("{{{", Some(Fence::Open("")))]
    #[case("{{{#!python", Some(Fence::Open("python")))]
    #[case("{{{#!td align=left", Some(Fence::Open("td align=left")))]
    #[case("}}}", Some(Fence::Close))]
    #[case("{{{inline}}}", None)]
    #[case("{{{ not a fence", None)]
    #[case("}}} trailing", None)]
    fn test_classify(#[case] line: &str, #[case] expected: Option<Fence<'_>>) {
        assert_eq!(classify(line), expected);
    }

    #[test]
    fn test_depth_tracks_nesting() {
        let mut depth = FenceDepth::default();
        let flags: Vec<bool> = ["a", "{{{", "b", "{{{#!sh", "c", "}}}", "d", "}}}", "e", "}}}"]
            .into_iter()
            .map(|line| depth.is_open_text(line))
            .collect();
        assert_eq!(
            flags,
            [true, false, false, false, false, false, false, false, true, true]
        );
    }

    #[test]
    fn test_transparent_blocks_keep_wiki_text() {
        let mut depth = FenceDepth::default();
        assert!(!depth.is_open_text("{{{#!div class=note"));
        assert!(depth.is_open_text("= heading ="));
        assert!(!depth.is_open_text("{{{"));
        assert!(!depth.is_open_text("= code ="));
        assert!(!depth.is_open_text("}}}"));
        assert!(depth.is_open_text("text"));
        assert!(!depth.is_open_text("}}}"));
    }

    #[test]
    fn test_quoted_fences_count() {
        let mut depth = FenceDepth::default();
        assert!(!depth.is_open_text("> {{{"));
        assert!(!depth.is_open_text("> == not a heading =="));
        assert!(!depth.is_open_text("> }}}"));
        assert!(depth.is_open_text("> text"));
    }
}
