//! Text normalization shared by keyword overlap and the local TF-IDF scorer.

use std::collections::HashSet;

/// Word characters: letters, digits and underscore. Everything else separates tokens.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lower-cases `text` and splits it on runs of non-word characters.
/// Empty tokens are dropped; duplicates are kept in stream order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct tokens of `text`.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Rust, Python/Go -- and C++!"),
            vec!["rust", "python", "go", "and", "c"]
        );
    }

    #[test]
    fn test_underscore_and_digits_are_word_chars() {
        assert_eq!(tokenize("snake_case k8s"), vec!["snake_case", "k8s"]);
    }

    #[test]
    fn test_empty_and_separator_only_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ,;  -- ").is_empty());
    }

    #[test]
    fn test_token_set_collapses_duplicates() {
        let set = token_set("Cloud cloud CLOUD engineer");
        assert_eq!(set.len(), 2);
        assert!(set.contains("cloud"));
        assert!(set.contains("engineer"));
    }
}
