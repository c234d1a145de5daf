//! Table assembly and final line rendering.
//!
//! Runs of `||` rows, `|----` row breaks and `{{{#!td` / `{{{#!th` cell blocks
//! are collected into a table and flushed when any other line arrives. A table
//! of plain rows becomes a GFM pipe table; once a cell block is involved the
//! table is written as HTML so the cells can hold block content.
use trac2md_core::Context;

use crate::{
    PIPE_PLACEHOLDER, render,
    scanner::{Part, Region, TaggedLine},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Default,
    Left,
    Right,
    Center,
}

impl Align {
    fn separator(self) -> &'static str {
        match self {
            Self::Default => "---",
            Self::Left => ":---",
            Self::Right => "---:",
            Self::Center => ":---:",
        }
    }

    fn attribute(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Left => r#" align="left""#,
            Self::Right => r#" align="right""#,
            Self::Center => r#" align="center""#,
        }
    }

    /// Alignment written in a supplied separator cell such as `:---:`.
    fn from_separator(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Self::Center,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (false, false) => Self::Default,
        }
    }
}

#[derive(Debug)]
enum Content {
    Inline(String),
    Block(Vec<String>),
}

#[derive(Debug)]
struct Cell {
    content: Content,
    header: bool,
    align: Align,
}

impl Cell {
    fn parse(raw: &str) -> Self {
        let left = raw.len() - raw.trim_start().len();
        let right = raw.len() - raw.trim_end().len();
        let trimmed = raw.trim();
        let (header, content) = match trimmed
            .strip_prefix('=')
            .and_then(|rest| rest.strip_suffix('='))
        {
            Some(inner) => (true, inner.trim()),
            None => (false, trimmed),
        };
        let align = if header {
            Align::Center
        } else if left > 0 && right == 0 {
            Align::Right
        } else if left == 0 && right > 0 {
            Align::Left
        } else {
            Align::Default
        };
        Self {
            content: Content::Inline(content.to_string()),
            header,
            align,
        }
    }

    /// Cell text for a pipe table: pipes, including protected ones, escaped.
    fn pipe_text(&self) -> String {
        match &self.content {
            Content::Inline(text) => text
                .replace('|', "\\|")
                .replace(PIPE_PLACEHOLDER, "\\|"),
            Content::Block(lines) => lines.join(" "),
        }
    }
}

#[derive(Debug, Default)]
struct Row {
    cells: Vec<Cell>,
    /// Alignments of a supplied separator row (`||:---||---:||`).
    separator: Option<Vec<Align>>,
}

/// Cell blocks nested deeper than this are kept as literal code.
const MAX_CELL_NESTING: usize = 32;

#[derive(Debug)]
struct Table {
    quote_depth: usize,
    /// How many cell blocks enclose this table.
    nesting: usize,
    rows: Vec<Row>,
    has_blocks: bool,
    /// Cell blocks append to the last row until a row break or a `||` row.
    block_row_open: bool,
    cell: Option<(bool, Vec<String>)>,
}

impl Table {
    fn new(quote_depth: usize, nesting: usize) -> Self {
        Self {
            quote_depth,
            nesting,
            rows: Vec::new(),
            has_blocks: false,
            block_row_open: false,
            cell: None,
        }
    }

    fn push_row(&mut self, row: &str) {
        self.block_row_open = false;
        let row = row.trim().trim_end_matches('\\').trim_end();
        let inner = row.strip_prefix("||").unwrap_or(row);
        let inner = inner.strip_suffix("||").unwrap_or(inner);
        let cells: Vec<&str> = inner.split("||").collect();
        if is_separator(&cells) {
            self.rows.push(Row {
                cells: Vec::new(),
                separator: Some(cells.into_iter().map(Align::from_separator).collect()),
            });
            return;
        }
        self.rows.push(Row {
            cells: cells.into_iter().map(Cell::parse).collect(),
            separator: None,
        });
    }

    fn open_cell(&mut self, header: bool) {
        if !self.block_row_open {
            self.rows.push(Row::default());
            self.block_row_open = true;
        }
        self.has_blocks = true;
        self.cell = Some((header, Vec::new()));
    }

    fn cell_line(&mut self, text: String) {
        if let Some((_, lines)) = &mut self.cell {
            lines.push(text);
        }
    }

    fn close_cell(&mut self, context: &Context) {
        let Some((header, lines)) = self.cell.take() else {
            return;
        };
        let mut content = if self.nesting < MAX_CELL_NESTING {
            render(&lines.join("\n"), context, self.nesting + 1)
        } else {
            tracing::warn!(
                nesting = self.nesting,
                "cell blocks nested too deeply, keeping the cell as code"
            );
            literal_block(lines)
        };
        while content.last().is_some_and(|line| line.trim().is_empty()) {
            content.pop();
        }
        let leading = content
            .iter()
            .take_while(|line| line.trim().is_empty())
            .count();
        content.drain(..leading);
        if let Some(row) = self.rows.last_mut() {
            row.cells.push(Cell {
                content: Content::Block(content),
                header,
                align: Align::Default,
            });
        }
    }

    fn end_block_row(&mut self) {
        self.block_row_open = false;
    }

    fn render(mut self, context: &Context) -> Vec<String> {
        if self.cell.is_some() {
            self.close_cell(context);
        }
        let quote_depth = self.quote_depth;
        let lines = if self.has_blocks {
            self.render_html()
        } else {
            self.render_pipe()
        };
        tracing::trace!(lines = lines.len(), "flushed table");
        lines
            .into_iter()
            .map(|line| quote(quote_depth, &line))
            .collect()
    }

    fn render_pipe(self) -> Vec<String> {
        let supplied = self.rows.get(1).and_then(|row| row.separator.clone());
        let rows: Vec<Row> = self
            .rows
            .into_iter()
            .filter(|row| row.separator.is_none())
            .collect();
        let Some((header, body)) = rows.split_first() else {
            return Vec::new();
        };
        let columns = rows
            .iter()
            .map(|row| row.cells.len())
            .max()
            .unwrap_or_default()
            .max(1);
        let aligns: Vec<Align> = (0..columns)
            .map(|index| {
                supplied
                    .as_ref()
                    .and_then(|aligns| aligns.get(index).copied())
                    .or_else(|| header.cells.get(index).map(|cell| cell.align))
                    .unwrap_or(Align::Default)
            })
            .collect();

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(pipe_row(header, columns));
        lines.push(format!(
            "| {} |",
            aligns
                .iter()
                .map(|align| align.separator())
                .collect::<Vec<_>>()
                .join(" | ")
        ));
        lines.extend(body.iter().map(|row| pipe_row(row, columns)));
        lines
    }

    fn render_html(self) -> Vec<String> {
        let mut lines = vec!["<table>".to_string()];
        for row in self.rows.into_iter().filter(|row| row.separator.is_none()) {
            lines.push("<tr>".to_string());
            for cell in row.cells {
                let tag = if cell.header { "th" } else { "td" };
                let attribute = if cell.header {
                    ""
                } else {
                    cell.align.attribute()
                };
                let content = match cell.content {
                    Content::Inline(text) if text.is_empty() => Vec::new(),
                    Content::Inline(text) => vec![text],
                    Content::Block(content) => content,
                };
                if content.is_empty() {
                    lines.push(format!("<{tag}{attribute}></{tag}>"));
                    continue;
                }
                lines.push(format!("<{tag}{attribute}>"));
                lines.push(String::new());
                lines.extend(content);
                lines.push(String::new());
                lines.push(format!("</{tag}>"));
            }
            lines.push("</tr>".to_string());
        }
        lines.push("</table>".to_string());
        lines
    }
}

/// Raw lines in a code fence longer than any backtick run they contain.
fn literal_block(lines: Vec<String>) -> Vec<String> {
    let longest = lines
        .iter()
        .flat_map(|line| line.split(|c: char| c != '`'))
        .map(str::len)
        .max()
        .unwrap_or_default();
    let fence = "`".repeat((longest + 1).max(3));
    let mut block = Vec::with_capacity(lines.len() + 2);
    block.push(fence.clone());
    block.extend(lines);
    block.push(fence);
    block
}

fn pipe_row(row: &Row, columns: usize) -> String {
    let cells: Vec<String> = (0..columns)
        .map(|index| row.cells.get(index).map(Cell::pipe_text).unwrap_or_default())
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn is_separator(cells: &[&str]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let cell = cell.trim();
            cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':'))
        })
}

pub(crate) fn quote(depth: usize, text: &str) -> String {
    if depth == 0 {
        return text.to_string();
    }
    let prefix = "> ".repeat(depth);
    if text.is_empty() {
        prefix.trim_end().to_string()
    } else {
        format!("{prefix}{text}")
    }
}

/// Group table lines and render every line with its quote prefix.
///
/// `nesting` counts the cell blocks around `lines`. A flushed table is
/// always followed by a blank line before further text, so Markdown never
/// reads that text as another row.
pub(crate) fn assemble(
    lines: Vec<TaggedLine>,
    context: &Context,
    nesting: usize,
) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut table: Option<Table> = None;
    // Quote depth of a table just flushed, until the next output line.
    let mut gap: Option<usize> = None;

    for line in lines {
        if table
            .as_ref()
            .is_some_and(|table| table.quote_depth != line.quote_depth)
            && let Some(done) = table.take()
        {
            gap = Some(done.quote_depth);
            out.extend(done.render(context));
        }

        if let Region::CellBlock { header } = line.region {
            let table = table.get_or_insert_with(|| {
                separate(&mut out, gap.take());
                Table::new(line.quote_depth, nesting)
            });
            match line.part {
                Part::Open => table.open_cell(header),
                Part::Body => table.cell_line(line.text),
                Part::Close => table.close_cell(context),
            }
            continue;
        }

        if line.region == Region::Plain {
            let trimmed = line.text.trim();
            if trimmed.starts_with("||") {
                table
                    .get_or_insert_with(|| {
                        separate(&mut out, gap.take());
                        Table::new(line.quote_depth, nesting)
                    })
                    .push_row(trimmed);
                continue;
            }
            if trimmed.starts_with("|-")
                && let Some(table) = table.as_mut()
            {
                table.end_block_row();
                continue;
            }
        }

        if let Some(done) = table.take() {
            gap = Some(done.quote_depth);
            out.extend(done.render(context));
        }
        if line.text.trim().is_empty() {
            gap = None;
        } else {
            separate(&mut out, gap.take());
        }
        out.push(quote(line.quote_depth, &line.text));
    }
    if let Some(done) = table.take() {
        out.extend(done.render(context));
    }
    out
}

/// Blank line after a flushed table, in that table's quote.
fn separate(out: &mut Vec<String>, gap: Option<usize>) {
    if let Some(depth) = gap {
        out.push(quote(depth, ""));
    }
}
