//! Declarative tokenizer programs.
//!
//! A [`TokenizerProgram`] is an ordered list of [`Step`]s. Each step either
//! works on the whole text or on the list of words produced by
//! [`Step::SplitWhitespace`]. Programs are checked when built so that an
//! interpreter or a store-side compiler never sees an ill-typed sequence.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::analysis::stopwords::{APOSTROPHES, FRENCH_ELISIONS, FRENCH_STOP_WORDS, FRENCH_TRIM_CHARS};
use crate::error::{Result, ShadowError};

/// Smallest prefix generated by the default program.
pub const DEFAULT_MIN_PREFIX_LEN: usize = 3;

/// One transformation in a tokenizer program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Lowercase the whole text.
    Lowercase,
    /// Split the text on runs of whitespace.
    SplitWhitespace,
    /// Drop words equal to one of `words`.
    RemoveStopwords { words: Vec<String> },
    /// Trim any of `chars` from both ends of every word.
    TrimChars { chars: String },
    /// Strip a leading elision marker followed by an apostrophe and any
    /// whitespace. Markers are tried in order and compared case-insensitively.
    StripElision {
        prefixes: Vec<String>,
        apostrophes: String,
    },
    /// Replace every word by its proper prefixes of at least `min_len`
    /// characters.
    Prefixes { min_len: usize },
    /// Remove repeated words, keeping the first occurrence.
    Dedupe,
    /// Join the words back into a text.
    Join { separator: String },
}

/// Shape of the value flowing between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    Words,
}

impl Step {
    /// Input and output shapes of this step.
    pub fn signature(&self) -> (Shape, Shape) {
        match self {
            Step::Lowercase => (Shape::Text, Shape::Text),
            Step::SplitWhitespace => (Shape::Text, Shape::Words),
            Step::Join { .. } => (Shape::Words, Shape::Text),
            Step::RemoveStopwords { .. }
            | Step::TrimChars { .. }
            | Step::StripElision { .. }
            | Step::Prefixes { .. }
            | Step::Dedupe => (Shape::Words, Shape::Words),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::Lowercase => "lowercase",
            Step::SplitWhitespace => "split_whitespace",
            Step::RemoveStopwords { .. } => "remove_stopwords",
            Step::TrimChars { .. } => "trim_chars",
            Step::StripElision { .. } => "strip_elision",
            Step::Prefixes { .. } => "prefixes",
            Step::Dedupe => "dedupe",
            Step::Join { .. } => "join",
        }
    }
}

/// A type-checked sequence of tokenizer steps, text in and text out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct TokenizerProgram {
    steps: Vec<Step>,
}

impl TokenizerProgram {
    /// Build a program, checking that every step receives the shape it
    /// expects and that the program ends with text.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        let mut shape = Shape::Text;
        for (i, step) in steps.iter().enumerate() {
            let (input, output) = step.signature();
            if input != shape {
                return Err(ShadowError::invalid_config(format!(
                    "tokenizer step {i} ({}) expects {input:?} but receives {shape:?}",
                    step.name()
                )));
            }
            if let Step::Prefixes { min_len } = step {
                if *min_len == 0 {
                    return Err(ShadowError::invalid_config(
                        "prefix length must be at least 1",
                    ));
                }
            }
            shape = output;
        }
        if shape != Shape::Text {
            return Err(ShadowError::invalid_config(
                "tokenizer program must end with a join step",
            ));
        }
        Ok(Self { steps })
    }

    /// The French prefix tokenizer used for derived fields by default.
    pub fn french() -> Self {
        Self {
            steps: vec![
                Step::Lowercase,
                Step::SplitWhitespace,
                Step::RemoveStopwords {
                    words: FRENCH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
                },
                Step::TrimChars {
                    chars: FRENCH_TRIM_CHARS.to_string(),
                },
                Step::StripElision {
                    prefixes: FRENCH_ELISIONS.iter().map(|p| p.to_string()).collect(),
                    apostrophes: APOSTROPHES.to_string(),
                },
                Step::Prefixes {
                    min_len: DEFAULT_MIN_PREFIX_LEN,
                },
                Step::Dedupe,
                Step::Join {
                    separator: " ".to_string(),
                },
            ],
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run the program on `text`.
    pub fn evaluate(&self, text: &str) -> String {
        let mut state = State::Text(text.to_string());
        for step in &self.steps {
            state = state.apply(step);
        }
        match state {
            State::Text(text) => text,
            // unreachable for checked programs
            State::Words(words) => words.join(" "),
        }
    }
}

impl Default for TokenizerProgram {
    fn default() -> Self {
        Self::french()
    }
}

impl TryFrom<Vec<Step>> for TokenizerProgram {
    type Error = ShadowError;

    fn try_from(steps: Vec<Step>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<TokenizerProgram> for Vec<Step> {
    fn from(program: TokenizerProgram) -> Self {
        program.steps
    }
}

enum State {
    Text(String),
    Words(Vec<String>),
}

impl State {
    fn apply(self, step: &Step) -> State {
        match (self, step) {
            (State::Text(text), Step::Lowercase) => State::Text(text.to_lowercase()),
            (State::Text(text), Step::SplitWhitespace) => {
                State::Words(text.split_whitespace().map(str::to_string).collect())
            }
            (State::Words(words), Step::Join { separator }) => State::Text(words.join(separator)),
            (State::Words(words), Step::RemoveStopwords { words: stop }) => {
                let stop: AHashSet<&str> = stop.iter().map(String::as_str).collect();
                State::Words(
                    words
                        .into_iter()
                        .filter(|w| !stop.contains(w.as_str()))
                        .collect(),
                )
            }
            (State::Words(words), Step::TrimChars { chars }) => State::Words(
                words
                    .iter()
                    .map(|w| w.trim_matches(|c| chars.contains(c)).to_string())
                    .collect(),
            ),
            (State::Words(words), Step::StripElision {
                prefixes,
                apostrophes,
            }) => State::Words(
                words
                    .iter()
                    .map(|w| strip_elision(w, prefixes, apostrophes).to_string())
                    .collect(),
            ),
            (State::Words(words), Step::Prefixes { min_len }) => {
                State::Words(words.iter().flat_map(|w| proper_prefixes(w, *min_len)).collect())
            }
            (State::Words(words), Step::Dedupe) => {
                let mut seen = AHashSet::with_capacity(words.len());
                State::Words(
                    words
                        .into_iter()
                        .filter(|w| seen.insert(w.clone()))
                        .collect(),
                )
            }
            // shape mismatches are rejected by TokenizerProgram::new
            (state, _) => state,
        }
    }
}

fn strip_elision<'a>(word: &'a str, prefixes: &[String], apostrophes: &str) -> &'a str {
    for prefix in prefixes {
        let Some(head) = word.get(..prefix.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            continue;
        }
        let mut rest = word[prefix.len()..].chars();
        if let Some(c) = rest.next() {
            if apostrophes.contains(c) {
                return rest.as_str().trim_start();
            }
        }
    }
    word
}

/// Prefixes of `word` from `min_len` characters up to one character short
/// of the full word.
fn proper_prefixes(word: &str, min_len: usize) -> Vec<String> {
    let ends: Vec<usize> = word.char_indices().map(|(i, _)| i).collect();
    (min_len..ends.len())
        .map(|len| word[..ends[len]].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proper_prefixes_counts_chars() {
        assert_eq!(
            proper_prefixes("système", 3),
            vec!["sys", "syst", "systè", "systèm"]
        );
        assert!(proper_prefixes("clé", 3).is_empty());
        assert!(proper_prefixes("go", 3).is_empty());
        assert_eq!(proper_prefixes("abcd", 3), vec!["abc"]);
    }

    #[test]
    fn test_strip_elision() {
        let prefixes: Vec<String> = FRENCH_ELISIONS.iter().map(|p| p.to_string()).collect();
        assert_eq!(strip_elision("l'interface", &prefixes, APOSTROPHES), "interface");
        assert_eq!(strip_elision("d’extension", &prefixes, APOSTROPHES), "extension");
        assert_eq!(strip_elision("qu'il", &prefixes, APOSTROPHES), "il");
        assert_eq!(strip_elision("L'Etat", &prefixes, APOSTROPHES), "Etat");
        assert_eq!(strip_elision("aujourd'hui", &prefixes, APOSTROPHES), "aujourd'hui");
        assert_eq!(strip_elision("lorsque", &prefixes, APOSTROPHES), "lorsque");
    }

    #[test]
    fn test_program_rejects_ill_typed_steps() {
        assert!(TokenizerProgram::new(vec![Step::Dedupe]).is_err());
        assert!(TokenizerProgram::new(vec![Step::SplitWhitespace]).is_err());
        assert!(
            TokenizerProgram::new(vec![
                Step::SplitWhitespace,
                Step::Prefixes { min_len: 0 },
                Step::Join {
                    separator: " ".into()
                },
            ])
            .is_err()
        );
        assert!(TokenizerProgram::new(vec![Step::Lowercase]).is_ok());
        assert!(TokenizerProgram::new(vec![]).is_ok());
    }

    #[test]
    fn test_program_serde_roundtrip_is_checked() {
        let json = serde_json::to_value(TokenizerProgram::french()).unwrap();
        assert_eq!(json[0]["op"], "lowercase");
        let back: TokenizerProgram = serde_json::from_value(json).unwrap();
        assert_eq!(back, TokenizerProgram::french());

        let bad = serde_json::json!([{ "op": "dedupe" }]);
        assert!(serde_json::from_value::<TokenizerProgram>(bad).is_err());
    }

    #[test]
    fn test_custom_program() {
        let program = TokenizerProgram::new(vec![
            Step::SplitWhitespace,
            Step::Dedupe,
            Step::Join {
                separator: "|".into(),
            },
        ])
        .unwrap();
        assert_eq!(program.evaluate("a b a  c"), "a|b|c");
    }
}
