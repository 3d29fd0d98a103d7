//! French stop words removed before prefix generation.

/// Stop words for the default French tokenizer.
///
/// Matching happens on the lowercased, untrimmed word, so `"nous,"` is not
/// removed while `"nous"` is.
pub const FRENCH_STOP_WORDS: &[&str] = &[
    "alors", "ainsi", "au", "aux", "avant", "après", "aussi", "avec", "avoir", "ce", "ces",
    "cette", "comme", "contre", "dans", "de", "depuis", "des", "dessus", "dessous", "donc", "du",
    "elle", "elles", "en", "encore", "entre", "est", "et", "était", "étant", "être", "faire",
    "il", "ils", "je", "jusqu", "la", "le", "les", "leur", "leurs", "lors", "mais", "moins",
    "moment", "même", "ne", "nous", "ou", "où", "par", "parce", "pas", "pendant", "peut",
    "pour", "puisque", "quand", "que", "quelque", "qui", "sans", "serait", "seront", "son",
    "souvent", "sur", "toute", "tous", "très", "un", "une", "vers", "voici", "voilà", "vous",
];

/// Characters trimmed from both ends of every word.
pub const FRENCH_TRIM_CHARS: &str = ".,!?;:()\"'«»“”‘’";

/// Elision markers stripped from the start of a word when followed by an
/// apostrophe. Longer markers come first so `qu'` wins over `q'`.
pub const FRENCH_ELISIONS: &[&str] = &["qu", "d", "l", "m", "c", "t", "j", "q", "s"];

/// Apostrophes accepted after an elision marker.
pub const APOSTROPHES: &str = "'’";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words_are_lowercase_and_unique() {
        let mut seen = ahash::AHashSet::new();
        for word in FRENCH_STOP_WORDS {
            assert_eq!(*word, word.to_lowercase());
            assert!(seen.insert(*word), "duplicate stop word {word}");
        }
    }

    #[test]
    fn test_elisions_longest_first() {
        let qu = FRENCH_ELISIONS.iter().position(|e| *e == "qu").unwrap();
        let q = FRENCH_ELISIONS.iter().position(|e| *e == "q").unwrap();
        assert!(qu < q);
    }
}
