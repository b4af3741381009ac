use regex::Regex;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Counts maximal runs of word characters, so `don't` is two words and
/// punctuation on its own is none.
pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contractions_split_at_apostrophe() {
        assert_eq!(word_count("don't stop"), 3);
    }

    #[test]
    fn punctuation_is_not_counted() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("-- ... !!"), 0);
        assert_eq!(word_count("[Source 1] says: growth."), 4);
    }

    #[test]
    fn unicode_and_underscores_are_word_characters() {
        assert_eq!(word_count("café naïve snake_case 2024"), 4);
    }
}
