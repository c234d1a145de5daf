//! List markers and renumbering.
//!
//! Trac numbers ordered lists from the literal marker of each item; Markdown
//! has no alphabetic or roman lists at all. Every ordered item is therefore
//! re-rendered from a counter kept per nesting level.

/// Kind of list marker, as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    Bullet,
    Numeric,
    Alpha { upper: bool },
    Roman { upper: bool },
}

/// A source line that starts a list item.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ListItem<'a> {
    pub(crate) column: usize,
    token: &'a str,
    pub(crate) content: &'a str,
}

impl ListItem<'_> {
    /// Resolve the marker kind; `previous` is the kind of the list already
    /// open at this column, which disambiguates `i.` and friends.
    fn kind(&self, previous: Option<MarkerKind>) -> Option<MarkerKind> {
        let token = self.token;
        if token == "*" || token == "-" {
            return Some(MarkerKind::Bullet);
        }
        if self.column == 0 {
            return None;
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return (token.len() <= 9).then_some(MarkerKind::Numeric);
        }
        let upper = token.bytes().all(|b| b.is_ascii_uppercase());
        if !(upper || token.bytes().all(|b| b.is_ascii_lowercase())) {
            return None;
        }
        let roman = token.bytes().all(|b| b"ivxlcdmIVXLCDM".contains(&b));
        let continues_roman = matches!(previous, Some(MarkerKind::Roman { .. })) && roman;
        let continues_alpha = matches!(previous, Some(MarkerKind::Alpha { .. }));
        if token.len() == 1 {
            if continues_roman || (!continues_alpha && (token == "i" || token == "I")) {
                Some(MarkerKind::Roman { upper })
            } else {
                Some(MarkerKind::Alpha { upper })
            }
        } else if roman {
            Some(MarkerKind::Roman { upper })
        } else {
            None
        }
    }
}

/// Recognise `* item`, `- item`, `1. item`, `a. item`, `iv. item`.
///
/// Ordered markers need at least one leading space, as in Trac, so prose
/// such as `A. Smith wrote` or `2019. It was` is left alone.
pub(crate) fn parse_item(line: &str) -> Option<ListItem<'_>> {
    let rest = line.trim_start_matches(' ');
    let column = line.len() - rest.len();
    let (token, content) = if let Some(content) = rest.strip_prefix("* ") {
        ("*", content)
    } else if let Some(content) = rest.strip_prefix("- ") {
        ("-", content)
    } else {
        let (token, content) = rest.split_once(". ")?;
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        (token, content)
    };
    let content = content.trim_start();
    if content.is_empty() {
        return None;
    }
    let item = ListItem {
        column,
        token,
        content,
    };
    item.kind(None).map(|_| item)
}

#[derive(Debug, Clone)]
struct Frame {
    column: usize,
    kind: MarkerKind,
    counter: usize,
    marker_indent: usize,
    content_indent: usize,
}

/// Stack of open lists, innermost last.
#[derive(Debug, Default)]
pub(crate) struct ListRenumberer {
    frames: Vec<Frame>,
}

impl ListRenumberer {
    pub(crate) fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.frames.clear();
    }

    /// Render the marker prefix (indentation included) for a list item.
    pub(crate) fn item(&mut self, item: &ListItem<'_>) -> String {
        self.pop_deeper_than(item.column);
        let previous = self
            .frames
            .last()
            .filter(|frame| frame.column == item.column)
            .map(|frame| frame.kind);
        let kind = item.kind(previous).unwrap_or(MarkerKind::Bullet);

        match previous {
            Some(open) if open == kind => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.counter += 1;
                }
            }
            Some(open) => {
                tracing::trace!(column = item.column, ?open, ?kind, "list kind changed");
                let marker_indent = self.frames.pop().map_or(0, |frame| frame.marker_indent);
                self.frames.push(Frame::new(item.column, kind, marker_indent));
            }
            None => {
                let marker_indent = self.frames.last().map_or(0, |frame| frame.content_indent);
                self.frames.push(Frame::new(item.column, kind, marker_indent));
            }
        }
        let Some(frame) = self.frames.last_mut() else {
            return String::new();
        };
        let marker = render_marker(frame.kind, frame.counter);
        frame.content_indent = frame.marker_indent + marker.len() + 1;
        format!("{}{marker} ", " ".repeat(frame.marker_indent))
    }

    /// Content column for a non-marker line at `column`, or `None` once the
    /// line has left every open list.
    pub(crate) fn continuation(&mut self, column: usize) -> Option<usize> {
        self.pop_deeper_than(column);
        self.frames.last().map(|frame| frame.content_indent)
    }

    fn pop_deeper_than(&mut self, column: usize) {
        while self.frames.last().is_some_and(|frame| frame.column > column) {
            self.frames.pop();
        }
    }
}

impl Frame {
    fn new(column: usize, kind: MarkerKind, marker_indent: usize) -> Self {
        Self {
            column,
            kind,
            counter: 1,
            marker_indent,
            content_indent: marker_indent + 2,
        }
    }
}

fn render_marker(kind: MarkerKind, counter: usize) -> String {
    match kind {
        MarkerKind::Bullet => "-".to_string(),
        MarkerKind::Numeric => format!("{counter}."),
        MarkerKind::Alpha { upper } => {
            let letters = to_alpha(counter);
            if upper {
                format!("{}.", letters.to_uppercase())
            } else {
                format!("{letters}.")
            }
        }
        MarkerKind::Roman { upper } => {
            let numeral = to_roman(counter);
            if upper {
                format!("{}.", numeral.to_ascii_uppercase())
            } else {
                format!("{numeral}.")
            }
        }
    }
}

/// `1 -> a`, `26 -> z`, `27 -> aa`.
fn to_alpha(mut n: usize) -> String {
    const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        if let Some(&letter) = LETTERS.get(n % 26) {
            letters.push(char::from(letter));
        }
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Lowercase roman numeral, built one decimal place at a time.
fn to_roman(n: usize) -> String {
    const PLACES: [(usize, char, char, char); 3] =
        [(100, 'c', 'd', 'm'), (10, 'x', 'l', 'c'), (1, 'i', 'v', 'x')];
    let mut numeral: String = std::iter::repeat_n('m', n / 1000).collect();
    let mut rest = n % 1000;
    for (place, one, five, ten) in PLACES {
        let digit = rest / place;
        rest %= place;
        match digit {
            4 => numeral.extend([one, five]),
            9 => numeral.extend([one, ten]),
            5..=8 => {
                numeral.push(five);
                numeral.extend(std::iter::repeat_n(one, digit - 5));
            }
            _ => numeral.extend(std::iter::repeat_n(one, digit)),
        }
    }
    numeral
}
