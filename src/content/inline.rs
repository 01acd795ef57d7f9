//! Inline stages applied to runs of plain text: URL auto-linking, then function
//! and constant highlighting on the text between links. Everything else is escaped.

use std::sync::OnceLock;

use html_escape::{encode_double_quoted_attribute, encode_text};
use linkify::{LinkFinder, LinkKind};
use regex::Regex;

use super::vocabulary::Vocabulary;

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches `name()` calls and ALL_CAPS_WITH_UNDERSCORES identifiers.
fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"(?P<function>\b[A-Za-z_][A-Za-z0-9_]*)\(\)|(?P<constant>\b[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+\b)")
            .expect("Invalid token regex")
    })
}

#[derive(Debug, Clone)]
pub struct InlineRenderer {
    vocabulary: Vocabulary,
}

impl InlineRenderer {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Render one run of plain text as HTML.
    pub fn render(&self, text: &str) -> String {
        let mut finder = LinkFinder::new();
        finder.kinds(&[LinkKind::Url]);

        let mut html = String::with_capacity(text.len());
        for span in finder.spans(text) {
            match span.kind() {
                Some(LinkKind::Url) if is_web_url(span.as_str()) => push_link(&mut html, span.as_str()),
                _ => self.push_text(&mut html, span.as_str()),
            }
        }
        html
    }

    fn push_text(&self, html: &mut String, text: &str) {
        let mut last = 0;

        for captures in token_regex().captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };

            let highlighted = if let Some(name) = captures.name("function") {
                self.vocabulary
                    .is_function(name.as_str())
                    .then(|| format!("<code>{}()</code>", name.as_str()))
            } else if let Some(name) = captures.name("constant") {
                self.vocabulary
                    .is_constant(name.as_str())
                    .then(|| format!("<code>{}</code>", name.as_str()))
            } else {
                None
            };

            if let Some(code) = highlighted {
                html.push_str(&encode_text(&text[last..whole.start()]));
                html.push_str(&code);
                last = whole.end();
            }
        }

        html.push_str(&encode_text(&text[last..]));
    }
}

pub(super) fn is_web_url(candidate: &str) -> bool {
    let lowered = candidate.get(..8).unwrap_or(candidate).to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

fn push_link(html: &mut String, url: &str) {
    push_anchor(html, url, url);
}

pub(super) fn push_anchor(html: &mut String, href: &str, label: &str) {
    html.push_str("<a href=\"");
    html.push_str(&encode_double_quoted_attribute(href));
    html.push_str("\" rel=\"nofollow\">");
    html.push_str(&encode_text(label));
    html.push_str("</a>");
}
