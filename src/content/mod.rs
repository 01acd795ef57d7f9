//! Message body rendering
//!
//! Plain-text message bodies are turned into display HTML at ingestion time and
//! again whenever the archive is re-rendered. The pipeline is deterministic and
//! only depends on the raw text, the signature markers and the vocabulary.
//!
//! ## Stages
//!
//! 1. Normalize line endings
//! 2. Cut the list footer at the first signature marker line
//! 3. Trim trailing whitespace
//! 4. Parse the remainder as markdown and write paragraphs, code, quotes and
//!    lists (`markdown`)
//! 5. Auto-link URLs and highlight known functions and constants in plain text,
//!    escaping everything else (`inline`)

pub mod inline;
pub mod markdown;
pub mod signature;
pub mod vocabulary;

use std::io;

use crate::config::ArchiveConfig;
use inline::InlineRenderer;
use markdown::render_markdown;
use signature::strip_signature;
pub use vocabulary::Vocabulary;

/// Renders raw message text to HTML.
#[derive(Debug, Clone)]
pub struct ContentRenderer {
    signature_markers: Vec<String>,
    inline: InlineRenderer,
}

impl ContentRenderer {
    pub fn new(signature_markers: Vec<String>, vocabulary: Vocabulary) -> Self {
        Self {
            signature_markers,
            inline: InlineRenderer::new(vocabulary),
        }
    }

    /// Build a renderer from configuration, loading the extra vocabulary file if set.
    pub fn from_config(config: &ArchiveConfig) -> io::Result<Self> {
        let mut vocabulary = Vocabulary::builtin();
        if let Some(path) = &config.vocabulary_path {
            vocabulary.extend_from_file(path)?;
        }
        Ok(Self::new(config.signature_markers.clone(), vocabulary))
    }

    pub fn render(&self, raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n");
        let body = strip_signature(&normalized, &self.signature_markers).trim_end();
        if body.is_empty() {
            return String::new();
        }

        render_markdown(body, &self.inline)
    }
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new(
            ArchiveConfig::default().signature_markers,
            Vocabulary::builtin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(raw: &str) -> String {
        ContentRenderer::default().render(raw)
    }

    #[test]
    fn renders_paragraph_code_and_quote() {
        let raw = "This is a paragraph.\n\n    echo 'code';\n\n> Take that!";
        assert_eq!(
            render(raw),
            "<p>This is a paragraph.</p>\n<pre><code>echo 'code';\n</code></pre>\n<blockquote>\n<p>Take that!</p>\n</blockquote>"
        );
    }

    #[test]
    fn keeps_line_breaks() {
        let raw = "This is a paragraph\nthat spans on 2 lines:\n\necho 'code';\necho 'another code;";
        assert_eq!(
            render(raw),
            "<p>This is a paragraph <br>\nthat spans on 2 lines:</p>\n<p>echo 'code'; <br>\necho 'another code;</p>"
        );
    }

    #[test]
    fn strips_list_signature() {
        let raw = "Hello\n\n---\nPHP Internals - PHP Runtime Development Mailing List\nTo unsubscribe, visit: http://www.php.net/unsub.php";
        assert_eq!(render(raw), "<p>Hello</p>");
    }

    #[test]
    fn strips_trailing_line_breaks() {
        assert_eq!(render("Hello\n\n\n"), "<p>Hello</p>");
    }

    #[test]
    fn links_urls() {
        assert_eq!(
            render("Hello http://google.com"),
            "<p>Hello <a href=\"http://google.com\" rel=\"nofollow\">http://google.com</a></p>"
        );
    }

    #[test]
    fn highlights_functions() {
        assert_eq!(
            render("Try to call preg_match() without parameters."),
            "<p>Try to call <code>preg_match()</code> without parameters.</p>"
        );
    }

    #[test]
    fn highlights_constants() {
        assert_eq!(
            render("Try to use PHP_INT_MAX and you will see."),
            "<p>Try to use <code>PHP_INT_MAX</code> and you will see.</p>"
        );
    }

    #[test]
    fn escapes_html() {
        assert_eq!(
            render("<script>alert(1)</script>\n\n    if ($a < $b) {}"),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>\n<pre><code>if ($a &lt; $b) {}\n</code></pre>"
        );
    }

    #[test]
    fn code_is_not_linked_or_highlighted() {
        assert_eq!(
            render("    strlen() http://php.net"),
            "<pre><code>strlen() http://php.net\n</code></pre>"
        );
    }

    #[test]
    fn windows_line_endings() {
        assert_eq!(render("one\r\ntwo\r\n"), "<p>one <br>\ntwo</p>");
    }

    #[test]
    fn empty_and_signature_only() {
        assert_eq!(render(""), "");
        assert_eq!(render("  \n\n"), "");
        assert_eq!(render("---\nfooter"), "");
    }

    #[test]
    fn rendering_is_deterministic() {
        let raw = "> quoted PHP_EOL\n\nreply with https://3v4l.org/abc";
        assert_eq!(render(raw), render(raw));
    }

    #[test]
    fn markdown_structure_survives() {
        assert_eq!(
            render("Steps:\n\n- call `strlen()`\n- see *PHP_EOL*\n\n```\n$a = 1;\n```\n\n---\nfooter"),
            "<p>Steps:</p>\n<ul>\n<li>call <code>strlen()</code></li>\n<li>see <em><code>PHP_EOL</code></em></li>\n</ul>\n<pre><code>$a = 1;\n</code></pre>"
        );
    }

    #[test]
    fn custom_markers() {
        let renderer = ContentRenderer::new(vec!["-- ".to_string(), "--".to_string()], Vocabulary::default());
        assert_eq!(renderer.render("Hi\n-- \nJane"), "<p>Hi</p>");
    }
}
