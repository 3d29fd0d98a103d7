//! Entry points for the default French prefix tokenizer.

use lazy_static::lazy_static;
use serde_json::Value;

use crate::analysis::program::TokenizerProgram;

lazy_static! {
    static ref FRENCH: TokenizerProgram = TokenizerProgram::french();
}

/// Tokenize `text` with the default French program.
///
/// Returns the de-duplicated proper prefixes (3 characters or more) of every
/// non stop word, joined by single spaces. Empty and whitespace-only input
/// yields an empty string.
pub fn tokenize(text: &str) -> String {
    FRENCH.evaluate(text)
}

/// Tokenize a document value. Anything but a string yields an empty string,
/// since source fields may legitimately be null or absent.
pub fn tokenize_value(value: Option<&Value>) -> String {
    evaluate_value(&FRENCH, value)
}

/// Run `program` on a document value, with the same non-string rule as
/// [`tokenize_value`].
pub fn evaluate_value(program: &TokenizerProgram, value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => program.evaluate(text),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stopwords::FRENCH_STOP_WORDS;
    use serde_json::json;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
    }

    #[test]
    fn test_tokenize_sentence() {
        let out = tokens("Le Système Répond Rapidement.");
        assert!(out.contains(&"sys".to_string()));
        assert!(out.contains(&"syst".to_string()));
        assert!(out.contains(&"systèm".to_string()));
        assert!(!out.contains(&"système".to_string()));
        assert!(!out.contains(&"le".to_string()));
        // trailing period is trimmed before prefixes are taken
        assert!(out.contains(&"rapidemen".to_string()));
        assert!(!out.contains(&"rapidement".to_string()));
    }

    #[test]
    fn test_tokenize_empty_inputs() {
        assert_eq!(tokenize(""), "");
        assert_eq!(tokenize("   \t\n "), "");
        assert_eq!(tokenize_value(None), "");
        assert_eq!(tokenize_value(Some(&json!(null))), "");
        assert_eq!(tokenize_value(Some(&json!(42))), "");
        assert_eq!(tokenize_value(Some(&json!(["texte"]))), "");
    }

    #[test]
    fn test_three_letter_words_contribute_nothing() {
        assert_eq!(tokenize("clé usb"), "");
        assert_eq!(tokenize("abcd"), "abc");
    }

    #[test]
    fn test_elision_and_quotes() {
        assert_eq!(tokenize("L'interface"), tokenize("interface"));
        assert_eq!(tokenize("d’extension"), tokenize("extension"));
        assert_eq!(tokenize("«réseau»"), tokenize("réseau"));
        assert_eq!(tokenize("\"temporairement\""), tokenize("temporairement"));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        assert_eq!(tokenize("test tester"), "tes test teste");
        assert_eq!(tokenize("tester test"), "tes test teste");
    }

    #[test]
    fn test_whitespace_normalization() {
        let a = "Composant   utilisé\tpour\n établir  des connexions";
        let b = a.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(tokenize(a), tokenize(&b));
    }

    #[test]
    fn test_no_stop_word_token() {
        assert_eq!(tokenize("nous encore très souvent avec vous dans cette"), "");
        let text = "nous avons encore très souvent travaillé avec vous dans ce bureau";
        for token in tokens(text) {
            assert!(!FRENCH_STOP_WORDS.contains(&token.as_str()), "{token}");
        }
    }

    #[test]
    fn test_prefix_law() {
        let text = "Adaptateur HDMI vers VGA – avec audio intégré";
        let words: Vec<String> = text.to_lowercase().split_whitespace().map(str::to_string).collect();
        for token in tokens(text) {
            let n = token.chars().count();
            assert!(n >= 3);
            assert!(
                words
                    .iter()
                    .any(|w| w.starts_with(&token) && w.chars().count() > n),
                "{token} is not a proper prefix"
            );
        }
    }
}
