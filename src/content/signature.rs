//! List footer removal.

/// Cut `text` at the first line equal to one of `markers`.
///
/// Trailing whitespace on the delimiter line is ignored, leading whitespace is not.
pub fn strip_signature<'a>(text: &'a str, markers: &[String]) -> &'a str {
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end();
        if markers.iter().any(|marker| marker == content) {
            return &text[..offset];
        }
        offset += line.len();
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["---".to_string()]
    }

    #[test]
    fn signature_cut_at_first_marker() {
        let text = "Hello\n\n---\nPHP Internals\n---\nmore";
        assert_eq!(strip_signature(text, &markers()), "Hello\n\n");
    }

    #[test]
    fn signature_marker_must_fill_the_line() {
        let text = "a --- b\n----\n ---\n";
        assert_eq!(strip_signature(text, &markers()), text);
        assert_eq!(strip_signature("x\n---   \ny", &markers()), "x\n");
    }

    #[test]
    fn no_marker_keeps_everything() {
        assert_eq!(strip_signature("just text", &markers()), "just text");
        assert_eq!(strip_signature("", &markers()), "");
    }
}
