use std::sync::LazyLock;

use regex::Regex;
use trac2md_core::LinkRegistry;

use crate::{fence::FenceDepth, pattern};

/// `={1,6} title [=...] [#anchor]`. The greedy marker run gives longer runs
/// priority: `=== x ===` is a level 3 heading, never level 1 or 2.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^\s*(={1,6})\s+(.+?)\s*=*\s*(?:#([A-Za-z_][\w:.-]*))?\s*$")
});

/// Whether [`extract_headings`] also records anchors.
#[derive(Debug)]
pub enum RegistryMode<'r> {
    /// Rewrite headings only.
    Read,
    /// Rewrite headings and record every heading of `page`.
    Build {
        registry: &'r mut LinkRegistry,
        page: &'r str,
    },
}

/// Rewrite Trac headings to ATX headings.
///
/// Lines inside `{{{ }}}` fences are left alone.
#[must_use]
#[tracing::instrument(skip_all)]
pub fn extract_headings(text: &str, mut mode: RegistryMode<'_>) -> String {
    let mut fences = FenceDepth::default();
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let heading = if fences.is_open_text(line) {
            parse_heading(line)
        } else {
            None
        };
        let Some(heading) = heading else {
            lines.push(line.to_string());
            continue;
        };
        if let RegistryMode::Build { registry, page } = &mut mode {
            registry.record_heading(page, heading.title, heading.anchor);
        }
        lines.push(format!("{} {}", "#".repeat(heading.level), heading.title));
    }
    lines.join("\n")
}

#[derive(Debug, PartialEq, Eq)]
struct Heading<'a> {
    level: usize,
    title: &'a str,
    anchor: Option<&'a str>,
}

fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let caps = HEADING.captures(line)?;
    Some(Heading {
        level: caps.get(1)?.len(),
        title: caps.get(2)?.as_str(),
        anchor: caps.get(3).map(|m| m.as_str()),
    })
}
