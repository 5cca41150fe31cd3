//! Title normalization and token-set math.
//!
//! Two views of a title are used throughout matching and auditing:
//! - [`words`]: the normalized word sequence with stop words kept, used
//!   for whole-word and phrase containment checks;
//! - [`token_set`]: the stop-word-free set, used for overlap math.

use std::collections::BTreeSet;

/// Words that carry no identity: grammar fillers plus the set-name words
/// sellers pad every title with.
pub const STOP_WORDS: &[&str] = &[
    "the",
    "of",
    "a",
    "an",
    "in",
    "on",
    "at",
    "for",
    "to",
    "with",
    "by",
    "and",
    "or",
    "wonders",
    "first",
    "existence",
];

#[inline]
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Normalized word sequence: lower-cased, every non-alphanumeric character
/// treated as a separator, stop words kept. Empty input yields an empty
/// sequence.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Stop-word-free token set of a title or name.
pub fn token_set(text: &str) -> BTreeSet<String> {
    words(text).into_iter().filter(|w| !is_stop_word(w)).collect()
}

/// Whole-word containment over a normalized word sequence.
#[inline]
pub fn contains_word(haystack: &[String], word: &str) -> bool {
    haystack.iter().any(|w| w == word)
}

/// Whole-phrase containment: `phrase` must appear as a contiguous run of
/// whole words in `haystack`.
pub fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > haystack.len() {
        return false;
    }
    haystack.windows(phrase.len()).any(|window| window == phrase)
}

/// Jaccard ratio |a ∩ b| / |a ∪ b|; 0.0 when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_normalizes_case_and_punctuation() {
        let w = words("Plant Terror of Ethereal Grove — Mythic, NM!");
        assert_eq!(w, vec!["plant", "terror", "of", "ethereal", "grove", "mythic", "nm"]);
    }

    #[test]
    fn test_words_empty_and_blank() {
        assert!(words("").is_empty());
        assert!(words("   \t ").is_empty());
        assert!(words("—!?").is_empty());
    }

    #[test]
    fn test_token_set_drops_stop_words() {
        let tokens = token_set("Ethereal Grove Wonders of the First");
        assert!(tokens.contains("ethereal"));
        assert!(tokens.contains("grove"));
        assert!(!tokens.contains("wonders"));
        assert!(!tokens.contains("first"));
        assert!(!tokens.contains("of"));
        assert!(!tokens.contains("the"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_contains_word_is_whole_word() {
        let title = words("Sandura of Heliosynth graded");
        assert!(contains_word(&title, "sandura"));
        assert!(!contains_word(&title, "sand"));
        assert!(!contains_word(&title, "grade"));
    }

    #[test]
    fn test_contains_phrase_contiguous_whole_words() {
        let title = words("NM Plant Terror of Ethereal Grove 2024");
        assert!(contains_phrase(&title, &words("ethereal grove")));
        assert!(contains_phrase(&title, &words("plant terror")));
        assert!(!contains_phrase(&title, &words("terror ethereal")));
        assert!(!contains_phrase(&title, &words("grove 2025")));
        assert!(!contains_phrase(&title, &[]));
    }

    #[test]
    fn test_jaccard() {
        use approx::assert_relative_eq;

        let a = token_set("ethereal grove");
        let b = token_set("plant terror of ethereal grove");
        assert_relative_eq!(jaccard(&a, &a), 1.0);
        // shared {ethereal, grove}, union {plant, terror, ethereal, grove}
        assert_relative_eq!(jaccard(&a, &b), 0.5);
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }
}
