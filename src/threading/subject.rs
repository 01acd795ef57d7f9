//! Subject normalization for thread matching
//!
//! Messages belong to the same thread when their subjects normalize to the same
//! string. Normalization removes the reply and forward markers that mail clients
//! add and the bracketed tags that the list server adds, then collapses whitespace.

/// Reply/forward markers, matched case-insensitively.
const REPLY_PREFIXES: &[&str] = &["re:", "fwd:", "fw:", "aw:"];

/// Canonicalizes subject lines into thread keys.
///
/// Bracketed tags are only removed when their content is in the configured
/// allow-list (`[PHP-DEV]` with the tag `php-dev`); any other bracketed text is
/// part of the subject.
#[derive(Debug, Clone, Default)]
pub struct SubjectNormalizer {
    list_tags: Vec<String>,
}

impl SubjectNormalizer {
    pub fn new<I, S>(list_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list_tags = list_tags
            .into_iter()
            .map(|tag| {
                tag.as_ref()
                    .trim()
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .trim()
                    .to_lowercase()
            })
            .filter(|tag| !tag.is_empty())
            .collect();
        Self { list_tags }
    }

    /// Normalize a subject line for thread matching.
    ///
    /// ```text
    /// "Re: Foo"             -> "Foo"
    /// "RE: re: Foo"         -> "Foo"
    /// "Re: [PHP-DEV] Foo"   -> "Foo"    (with `PHP-DEV` in the allow-list)
    /// "  Foo   bar  "       -> "Foo bar"
    /// ```
    pub fn normalize(&self, subject: &str) -> String {
        let mut normalized = subject.trim();

        // Keep removing decorations until none match
        loop {
            let before = normalized;

            for prefix in REPLY_PREFIXES {
                if let Some(rest) = strip_prefix_ignore_case(normalized, prefix) {
                    normalized = rest.trim_start();
                }
            }

            if let Some(rest) = self.strip_leading_tag(normalized) {
                normalized = rest.trim_start();
            }

            if let Some(rest) = self.strip_trailing_tag(normalized) {
                normalized = rest.trim_end();
            }

            if before == normalized {
                break;
            }
        }

        // Collapse multiple spaces into one
        normalized.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn strip_leading_tag<'a>(&self, subject: &'a str) -> Option<&'a str> {
        let inner = subject.strip_prefix('[')?;
        let end = inner.find(']')?;
        self.is_list_tag(&inner[..end]).then(|| &inner[end + 1..])
    }

    fn strip_trailing_tag<'a>(&self, subject: &'a str) -> Option<&'a str> {
        let inner = subject.strip_suffix(']')?;
        let start = inner.rfind('[')?;
        self.is_list_tag(&inner[start + 1..]).then(|| &inner[..start])
    }

    fn is_list_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.list_tags.iter().any(|known| *known == tag)
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_variants_share_a_key() {
        let normalizer = SubjectNormalizer::default();
        let expected = normalizer.normalize("Foo");
        assert_eq!(normalizer.normalize("Re: Foo"), expected);
        assert_eq!(normalizer.normalize("RE: re: Foo"), expected);
        assert_eq!(expected, "Foo");
    }

    #[test]
    fn test_forward_markers() {
        let normalizer = SubjectNormalizer::default();
        assert_eq!(normalizer.normalize("Fwd: FW: Aw: RFC: Enums"), "RFC: Enums");
        assert_eq!(normalizer.normalize("Re:Re:Foo"), "Foo");
    }

    #[test]
    fn test_list_tags_need_allow_list() {
        let plain = SubjectNormalizer::default();
        assert_eq!(plain.normalize("Re: [PHP-DEV] Foo"), "[PHP-DEV] Foo");

        let tagged = SubjectNormalizer::new(["PHP-DEV"]);
        assert_eq!(tagged.normalize("Re: [PHP-DEV] Foo"), "Foo");
        assert_eq!(tagged.normalize("[php-dev] Re: Foo"), "Foo");
        assert_eq!(tagged.normalize("Foo [PHP-DEV]"), "Foo");
        assert_eq!(tagged.normalize("[RFC] Foo"), "[RFC] Foo");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let normalizer = SubjectNormalizer::default();
        assert_eq!(normalizer.normalize("  Re:   Multiple    spaces  "), "Multiple spaces");
        assert_eq!(normalizer.normalize("   "), "");
    }

    #[test]
    fn test_subject_case_is_kept() {
        let normalizer = SubjectNormalizer::default();
        assert_eq!(normalizer.normalize("re: Named Arguments"), "Named Arguments");
    }

    #[test]
    fn test_non_ascii_subject() {
        let normalizer = SubjectNormalizer::default();
        assert_eq!(normalizer.normalize("Ré: été"), "Ré: été");
        assert_eq!(normalizer.normalize("Re: été"), "été");
    }
}
