//! Text normalisation and keyword extraction shared by the scoring rules.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "you", "your", "you're", "that", "that's", "this", "these", "those", "are",
        "for", "not", "don't", "doesn't", "with", "what", "have", "has", "had", "just", "too",
        "can", "can't", "i'm", "it's", "was", "were", "all", "but", "they", "them", "their",
        "there", "about", "like", "more", "much", "really", "want", "need", "going", "will",
        "would", "could", "should", "know", "think", "see", "get", "how", "why", "who", "our",
        "out", "any", "its", "been", "into", "than", "then", "only", "very", "also", "well",
        "make", "feel", "from", "here", "where", "when", "which", "some", "even", "still", "yet",
        "did", "does", "doing", "one", "way", "let", "now", "right", "sure", "yes", "okay",
        "i've", "we're", "they're", "won't", "isn't", "aren't", "there's", "every", "other",
    ]
    .into_iter()
    .collect()
});

/// Lowercase and fold typographic apostrophes so patterns see one form
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Every token of the text, normalised
pub fn tokens(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Content-bearing tokens: no stopwords, no fragments shorter than three
/// characters (two when the token carries a digit)
pub fn keywords(text: &str) -> BTreeSet<String> {
    tokens(text)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(t.as_str()))
        .filter(|t| {
            let len = t.chars().count();
            len >= 3 || (len >= 2 && t.chars().any(|c| c.is_ascii_digit()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_drop_stopwords_and_fragments() {
        let kws = keywords("The cap rate is too low, numbers don't work");
        assert_eq!(
            kws,
            BTreeSet::from(
                ["cap", "rate", "low", "numbers", "work"].map(String::from)
            )
        );
    }

    #[test]
    fn test_tokens_fold_curly_apostrophes() {
        let t = tokens("You\u{2019}re RIGHT");
        assert!(t.contains("you're"));
        assert!(t.contains("right"));
    }

    #[test]
    fn test_numeric_keywords_kept() {
        assert!(keywords("Rents grew 6% in 2023").contains("2023"));
        assert!(!keywords("a 6% bump").contains("6"));
    }
}
