//! Markdown structure of message bodies.
//!
//! Bodies are parsed with comrak and written out by a small formatter instead of
//! comrak's own HTML renderer: every line break inside a paragraph is kept as
//! `<br>`, raw HTML in a message is shown as text, and the inline stages only see
//! plain text runs. Code spans, code blocks and link labels are escaped verbatim.

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{Arena, Options, parse_document};
use html_escape::encode_text;

use super::inline::{InlineRenderer, is_web_url, push_anchor};

const LINE_BREAK: &str = " <br>\n";

/// Render a markdown body, already cut and trimmed, to HTML.
pub fn render_markdown(body: &str, inline: &InlineRenderer) -> String {
    let arena = Arena::new();
    let options = Options::default();
    let root = parse_document(&arena, body, &options);

    HtmlFormatter { inline }.blocks(root, false)
}

struct HtmlFormatter<'r> {
    inline: &'r InlineRenderer,
}

impl HtmlFormatter<'_> {
    /// Block children of `node`, one per line.
    fn blocks<'a>(&self, node: &'a AstNode<'a>, tight: bool) -> String {
        node.children()
            .map(|child| self.block(child, tight))
            .filter(|html| !html.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn block<'a>(&self, node: &'a AstNode<'a>, tight: bool) -> String {
        let ast = node.data.borrow();
        match &ast.value {
            NodeValue::Paragraph if tight => self.inlines(node),
            NodeValue::Paragraph => format!("<p>{}</p>", self.inlines(node)),
            NodeValue::Heading(heading) => {
                format!("<h{0}>{1}</h{0}>", heading.level, self.inlines(node))
            }
            NodeValue::CodeBlock(code) => {
                format!("<pre><code>{}</code></pre>", encode_text(&code.literal))
            }
            NodeValue::HtmlBlock(html) => {
                let lines: Vec<String> = html
                    .literal
                    .trim_end()
                    .lines()
                    .map(|line| self.inline.render(line.trim()))
                    .collect();
                format!("<p>{}</p>", lines.join(LINE_BREAK))
            }
            NodeValue::BlockQuote => wrap("blockquote", &self.blocks(node, false)),
            NodeValue::List(list) => {
                let items = self.blocks(node, list.tight);
                match list.list_type {
                    ListType::Bullet => wrap("ul", &items),
                    ListType::Ordered if list.start == 1 => wrap("ol", &items),
                    ListType::Ordered => format!("<ol start=\"{}\">\n{}\n</ol>", list.start, items),
                }
            }
            NodeValue::Item(_) if tight => format!("<li>{}</li>", self.blocks(node, true)),
            NodeValue::Item(_) => wrap("li", &self.blocks(node, false)),
            NodeValue::ThematicBreak => "<hr>".to_string(),
            _ => self.blocks(node, tight),
        }
    }

    /// Inline children of `node`. Adjacent text nodes are joined so that links and
    /// tokens split by the parser are still recognised.
    fn inlines<'a>(&self, node: &'a AstNode<'a>) -> String {
        let mut html = String::new();
        let mut text = String::new();
        for child in node.children() {
            self.inline_node(child, &mut html, &mut text);
        }
        self.flush(&mut html, &mut text);
        html
    }

    fn inline_node<'a>(&self, node: &'a AstNode<'a>, html: &mut String, text: &mut String) {
        let ast = node.data.borrow();
        match &ast.value {
            NodeValue::Text(literal) => text.push_str(literal),
            NodeValue::HtmlInline(raw) => text.push_str(raw),
            NodeValue::SoftBreak | NodeValue::LineBreak => {
                self.flush(html, text);
                html.push_str(LINE_BREAK);
            }
            NodeValue::Code(code) => {
                self.flush(html, text);
                html.push_str("<code>");
                html.push_str(&encode_text(&code.literal));
                html.push_str("</code>");
            }
            NodeValue::Emph => self.wrap_inline("em", node, html, text),
            NodeValue::Strong => self.wrap_inline("strong", node, html, text),
            NodeValue::Link(link) => {
                let label = plain_text(node);
                if is_autolink(&link.url, &label) {
                    // `<url>` in a mail body reads as text around a link
                    text.push('<');
                    text.push_str(&label);
                    text.push('>');
                } else if is_web_url(&link.url) {
                    self.flush(html, text);
                    push_anchor(html, &link.url, &label);
                } else {
                    for child in node.children() {
                        self.inline_node(child, html, text);
                    }
                }
            }
            NodeValue::Image(_) => text.push_str(&plain_text(node)),
            _ => {
                for child in node.children() {
                    self.inline_node(child, html, text);
                }
            }
        }
    }

    fn wrap_inline<'a>(&self, tag: &str, node: &'a AstNode<'a>, html: &mut String, text: &mut String) {
        self.flush(html, text);
        html.push_str(&format!("<{}>{}</{}>", tag, self.inlines(node), tag));
    }

    fn flush(&self, html: &mut String, text: &mut String) {
        if !text.is_empty() {
            html.push_str(&self.inline.render(text));
            text.clear();
        }
    }
}

fn wrap(tag: &str, content: &str) -> String {
    if content.is_empty() {
        format!("<{0}>\n</{0}>", tag)
    } else {
        format!("<{0}>\n{1}\n</{0}>", tag, content)
    }
}

fn is_autolink(url: &str, label: &str) -> bool {
    url == label || url.strip_prefix("mailto:") == Some(label)
}

fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    collect_plain(node, &mut out);
    out
}

fn collect_plain<'a>(node: &'a AstNode<'a>, out: &mut String) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(literal) => out.push_str(literal),
            NodeValue::Code(code) => out.push_str(&code.literal),
            NodeValue::HtmlInline(raw) => out.push_str(raw),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => collect_plain(child, out),
        }
    }
}
