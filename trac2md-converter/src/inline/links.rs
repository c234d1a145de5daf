//! Link, image, file and ticket rules.
use std::sync::LazyLock;

use regex::{Captures, Regex};
use trac2md_core::{Context, Options, TicketPolicy, github_slug, page_target_name};

use super::{Segment, Segments, code_span, group, literal, text};
use crate::pattern;

static IMAGE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\[\[Image\(([^)]*)\)\]\]"));

static DOUBLE_BRACKET_URL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\[\[((?:https?|ftp|mailto):[^\s|\]]+)\s*\|?\s*([^\]]*)\]\]")
});

static BRACKET_URL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[((?:https?|ftp|mailto):[^\s|\]]+)\s*\|?\s*([^\]]*)\]"));

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?:https?|ftp)://[^\s<>\[\]"'|]+"#));

static DOUBLE_BRACKET_WIKI: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[\[wiki:([^\]|\s]+)\s*\|?\s*([^\]]*)\]\]"));

static WIKI: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"\[wiki:("[^"\]]+"|[^\s\[\]]+)\s*([^\[\]]*)\]"#));

static WIKI_PATH: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[/wiki/([^\s\[\]]+)\s*([^\[\]]*)\]"));

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[#([A-Za-z_][\w:.-]*)\s*([^\[\]]*)\]"));

/// `[[Name]]`, `[[Name|label]]` or a macro call `[[Name(args)]]`.
static DOUBLE_BRACKET: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\[\[([^\[\]|(]+?)\s*(\([^\]]*\))?\s*(?:\|([^\]]*))?\]\]")
});

static SOURCE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[source:([^\s\[\]@]+)(?:@(\w+))?\s*([^\[\]]*)\]"));

static BARE_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(^|[\s(])source:([\w./-]*[\w/])"));

static ATTACHMENT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\[attachment:([^\s\[\]:]+)[^\s\[\]]*\s*([^\[\]]*)\]"));

static BARE_ATTACHMENT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(^|[\s(])attachment:([\w.-]*\w)"));

static CHANGESET: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"\[changeset:"?(\w+)(?:/[^\s"\]]*)?"?\s*([^\[\]]*)\]"#)
});

static BARE_CHANGESET: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(^|[\s(])changeset:"?(\w+)"?"#));

static BRACKET_REVISION: LazyLock<Regex> = LazyLock::new(|| pattern(r"\[(\d+)\]"));

static BARE_REVISION: LazyLock<Regex> = LazyLock::new(|| pattern(r"(^|[^\w/])r(\d+)\b"));

static TICKET: LazyLock<Regex> = LazyLock::new(|| pattern(r"\[ticket:(\d+)\s*([^\[\]]*)\]"));

static TICKET_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bcomment:(\d+):ticket:(\d+)\b"));

static BARE_TICKET: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bticket:(\d+)\b"));

static TICKET_HASH: LazyLock<Regex> = LazyLock::new(|| pattern(r"(^|[^\w&/#\[])#(\d+)\b"));

/// Trac link schemes that a `[[scheme:x|label]]` may carry; they are rewritten
/// to the single bracket form so the file and ticket rules pick them up.
const SCHEMES: [&str; 7] = [
    "ticket:",
    "source:",
    "attachment:",
    "changeset:",
    "comment:",
    "report:",
    "milestone:",
];

fn markdown_link(label: &str, url: &str) -> Segment {
    literal(format!("[{label}]({url})"))
}

/// Computes link targets for the document described by a [`Context`].
#[derive(Debug)]
pub(super) struct Linker<'c, 'a> {
    context: &'c Context<'a>,
}

impl<'c, 'a> Linker<'c, 'a> {
    pub(super) fn new(context: &'c Context<'a>) -> Self {
        Self { context }
    }

    fn options(&self) -> &'c Options {
        &self.context.options
    }

    pub(super) fn is_known_page(&self, name: &str) -> bool {
        self.context.pages().contains(name)
    }

    /// `root/path` as seen from the document being converted.
    fn site(&self, root: &str, path: &str) -> String {
        let target = format!(
            "{}/{}",
            root.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if root.contains("://") || !target.starts_with('/') {
            return target;
        }
        pathdiff::diff_paths(&target, &self.options().base_path)
            .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            .filter(|relative| !relative.is_empty())
            .unwrap_or(target)
    }

    fn attachment(&self, file: &str) -> String {
        match &self.options().attachment_path {
            Some(directory) => self.site(directory, file),
            None => file.to_string(),
        }
    }

    /// GitHub slug for `anchor` on `page`, through the registry when possible.
    fn anchor_slug(&self, page: &str, anchor: &str) -> String {
        let registry = self.context.registry();
        registry
            .resolve(page, anchor)
            .or_else(|| registry.resolve(page_target_name(page), anchor))
            .and_then(|path| path.split_once('#'))
            .map_or_else(
                || {
                    tracing::debug!(page, anchor, "unresolved anchor");
                    github_slug(anchor)
                },
                |(_, slug)| slug.to_string(),
            )
    }

    /// URL for `Page`, `Page#anchor` or `#anchor`.
    fn wiki_url(&self, name: &str) -> String {
        let (page, anchor) = match name.split_once('#') {
            Some((page, anchor)) => (page, Some(anchor)),
            None => (name, None),
        };
        let mut url = if page.is_empty() {
            String::new()
        } else {
            if !self.is_known_page(page) {
                tracing::debug!(page, "link to unknown wiki page");
            }
            let target = page_target_name(page).replace(' ', "-");
            self.site(&self.options().wiki_root, &target)
        };
        if let Some(anchor) = anchor.filter(|anchor| !anchor.is_empty()) {
            let scope = if page.is_empty() {
                self.options().page.as_deref().unwrap_or_default()
            } else {
                page
            };
            url.push('#');
            url.push_str(&self.anchor_slug(scope, anchor));
        }
        url
    }

    pub(super) fn wiki_link(&self, name: &str, label: &str) -> Segment {
        let label = label.trim();
        let label = if label.is_empty() {
            name.trim_start_matches('#')
        } else {
            label
        };
        markdown_link(label, &self.wiki_url(name))
    }

    fn image(&self, args: &str) -> Segment {
        let mut args = args.split(',').map(str::trim);
        let target = args.next().unwrap_or_default();
        let width = args.find_map(|arg| {
            let value = arg.strip_prefix("width=").unwrap_or(arg);
            let digits = value.trim_end_matches(['%', 'p', 'x']);
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(value)
        });
        let url = if target.contains("://") {
            target.to_string()
        } else if let Some(path) = target.strip_prefix("source:") {
            self.site(&self.options().source_root, path)
        } else {
            self.attachment(target.rsplit(':').next().unwrap_or(target))
        };
        let alt = target.rsplit(['/', ':']).next().unwrap_or(target);
        match width {
            Some(width) => literal(format!(
                r#"<img src="{url}" alt="{alt}" width="{width}">"#
            )),
            None => literal(format!("![{alt}]({url})")),
        }
    }

    fn double_bracket(&self, caps: &Captures<'_>) -> Segment {
        let whole = group(caps, 0);
        let name = group(caps, 1).trim();
        let label = group(caps, 3).trim();
        if caps.get(2).is_none() {
            if SCHEMES.iter().any(|scheme| name.starts_with(scheme)) {
                return if label.is_empty() {
                    text(format!("[{name}]"))
                } else {
                    text(format!("[{name} {label}]"))
                };
            }
            let page = name.split_once('#').map_or(name, |(page, _)| page);
            if page.is_empty() || self.is_known_page(page) {
                return self.wiki_link(name, label);
            }
        }
        tracing::debug!(construct = whole, "unknown macro or page kept as code");
        literal(code_span(whole))
    }

    /// Abbreviated git commit for an svn revision or a git hash.
    fn commit(&self, revision: &str) -> Option<String> {
        if let Some(hash) = self.context.commits().resolve(revision) {
            return Some(hash.to_string());
        }
        let is_hash = revision.len() >= 7
            && revision.bytes().all(|b| b.is_ascii_hexdigit())
            && !revision.bytes().all(|b| b.is_ascii_digit());
        is_hash.then(|| revision.get(..10).unwrap_or(revision).to_string())
    }

    fn changeset(&self, revision: &str, label: &str) -> Segment {
        let label = label.trim();
        match (self.commit(revision), label.is_empty()) {
            (Some(hash), true) => literal(hash),
            (Some(hash), false) => literal(format!("{label} ({hash})")),
            (None, true) => literal(format!("changeset {revision}")),
            (None, false) => literal(label),
        }
    }

    fn ticket(&self, number: &str, label: &str, comment: Option<&str>) -> Segment {
        let label = label.trim();
        match &self.options().ticket_policy {
            TicketPolicy::KeepReference => match (label.is_empty(), comment) {
                (true, None) => literal(format!("#{number}")),
                (true, Some(comment)) => literal(format!("#{number} (comment {comment})")),
                (false, _) => literal(format!("{label} (#{number})")),
            },
            TicketPolicy::RewriteTo { url_prefix } => {
                let mut url = format!("{}/{number}", url_prefix.trim_end_matches('/'));
                if let Some(comment) = comment {
                    url.push_str("#comment:");
                    url.push_str(comment);
                }
                let label = match (label.is_empty(), comment) {
                    (false, _) => label.to_string(),
                    (true, Some(comment)) => format!("comment {comment} of #{number}"),
                    (true, None) => format!("#{number}"),
                };
                markdown_link(&label, &url)
            }
        }
    }

    /// External links and images; remaining bare URLs become literals.
    pub(super) fn external(&self, segments: &mut Segments) {
        segments.apply(&IMAGE, |caps| Some(vec![self.image(group(caps, 1))]));
        let external = |caps: &Captures<'_>| {
            let url = group(caps, 1);
            let label = group(caps, 2).trim();
            Some(vec![if label.is_empty() {
                literal(format!("<{url}>"))
            } else {
                markdown_link(label, url)
            }])
        };
        segments.apply(&DOUBLE_BRACKET_URL, external);
        segments.apply(&BRACKET_URL, external);
        segments.apply(&BARE_URL, |caps| {
            let url = group(caps, 0);
            let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
            Some(vec![
                literal(trimmed),
                text(url.get(trimmed.len()..).unwrap_or_default()),
            ])
        });
    }

    pub(super) fn internal(&self, segments: &mut Segments) {
        segments.apply(&DOUBLE_BRACKET_WIKI, |caps| {
            Some(vec![self.wiki_link(group(caps, 1), group(caps, 2))])
        });
        segments.apply(&WIKI, |caps| {
            Some(vec![
                self.wiki_link(group(caps, 1).trim_matches('"'), group(caps, 2)),
            ])
        });
        segments.apply(&WIKI_PATH, |caps| {
            Some(vec![self.wiki_link(group(caps, 1), group(caps, 2))])
        });
        segments.apply(&ANCHOR, |caps| {
            let name = format!("#{}", group(caps, 1));
            Some(vec![self.wiki_link(&name, group(caps, 2))])
        });
        segments.apply(&DOUBLE_BRACKET, |caps| Some(vec![self.double_bracket(caps)]));
    }

    pub(super) fn files(&self, segments: &mut Segments) {
        let source_root = &self.options().source_root;
        segments.apply(&SOURCE, |caps| {
            let path = group(caps, 1);
            let label = group(caps, 3).trim();
            let label = match (label.is_empty(), caps.get(2)) {
                (false, _) => label.to_string(),
                (true, Some(revision)) => format!("{path}@{}", revision.as_str()),
                (true, None) => path.to_string(),
            };
            Some(vec![markdown_link(&label, &self.site(source_root, path))])
        });
        segments.apply(&BARE_SOURCE, |caps| {
            let path = group(caps, 2);
            Some(vec![
                text(group(caps, 1)),
                markdown_link(path, &self.site(source_root, path)),
            ])
        });
        segments.apply(&ATTACHMENT, |caps| {
            let file = group(caps, 1);
            let label = group(caps, 2).trim();
            let label = if label.is_empty() { file } else { label };
            Some(vec![markdown_link(label, &self.attachment(file))])
        });
        segments.apply(&BARE_ATTACHMENT, |caps| {
            let file = group(caps, 2);
            Some(vec![
                text(group(caps, 1)),
                markdown_link(file, &self.attachment(file)),
            ])
        });
        segments.apply(&CHANGESET, |caps| {
            Some(vec![self.changeset(group(caps, 1), group(caps, 2))])
        });
        segments.apply(&BARE_CHANGESET, |caps| {
            Some(vec![
                text(group(caps, 1)),
                self.changeset(group(caps, 2), ""),
            ])
        });
        let commits = self.context.commits();
        segments.apply(&BRACKET_REVISION, |caps| {
            let hash = commits.resolve(group(caps, 1))?;
            Some(vec![literal(hash)])
        });
        segments.apply(&BARE_REVISION, |caps| {
            let hash = commits.resolve(group(caps, 2))?;
            Some(vec![text(group(caps, 1)), literal(hash)])
        });
    }

    pub(super) fn tickets(&self, segments: &mut Segments) {
        segments.apply(&TICKET, |caps| {
            Some(vec![self.ticket(group(caps, 1), group(caps, 2), None)])
        });
        segments.apply(&TICKET_COMMENT, |caps| {
            Some(vec![self.ticket(group(caps, 2), "", Some(group(caps, 1)))])
        });
        segments.apply(&BARE_TICKET, |caps| {
            Some(vec![self.ticket(group(caps, 1), "", None)])
        });
        segments.apply(&TICKET_HASH, |caps| {
            Some(vec![
                text(group(caps, 1)),
                self.ticket(group(caps, 2), "", None),
            ])
        });
    }
}
