//! URL slugification.
//!
//! Converts arbitrary text to a URL-safe slug. Handed to callback
//! reducers as a helper so user code never reimplements it.

use deunicode::deunicode;

/// Convert text to a URL-safe slug: ASCII transliteration, lowercased,
/// runs of non-alphanumerics collapsed to single hyphens, no leading or
/// trailing hyphen.
pub fn slugify(text: &str) -> String {
    let transliterated = deunicode(text);
    let mut slug = String::with_capacity(transliterated.len());
    let mut pending_hyphen = false;

    for ch in transliterated.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_punctuation_collapses() {
        assert_eq!(slugify("What's new?! (2024)"), "what-s-new-2024");
    }

    #[test]
    fn test_unicode_transliteration() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
    }

    #[test]
    fn test_no_leading_or_trailing_hyphen() {
        assert_eq!(slugify("  --spaced--  "), "spaced");
        assert_eq!(slugify(""), "");
    }
}
