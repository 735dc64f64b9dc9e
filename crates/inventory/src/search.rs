//! Case- and diacritic-insensitive text matching.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold `text` for comparison: lowercase, decompose (NFD), drop combining
/// marks, trim and collapse inner whitespace.
///
/// `normalize("  Ångström  Radio ")` == `"angstrom radio"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sort key used for alphabetical ordering of group names.
///
/// Folded text first so "émetteur" sorts with "emetteur", then the raw text
/// to keep the order total and stable.
pub fn collation_key(text: &str) -> (String, String) {
    (normalize(text), text.to_string())
}

/// A normalized, non-empty free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Returns `None` when the query is blank after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the folded `haystack` contains this query.
    pub fn matches(&self, haystack: &str) -> bool {
        normalize(haystack).contains(&self.0)
    }
}
