use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Which splitting rule a call site uses before words are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tokenization {
    /// Split on runs of non-word characters. Used when rebuilding the whole table.
    #[default]
    NonWord,
    /// Split on whitespace only. Used when adding a single source incrementally.
    Whitespace,
}

impl Tokenization {
    pub fn tokenize(self, text: &str) -> Vec<String> {
        match self {
            Tokenization::NonWord => tokenize_non_word(text),
            Tokenization::Whitespace => tokenize_whitespace(text),
        }
    }
}

impl std::str::FromStr for Tokenization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "non_word" | "non-word" | "nonword" => Ok(Tokenization::NonWord),
            "whitespace" => Ok(Tokenization::Whitespace),
            other => Err(format!("unknown tokenization '{other}'")),
        }
    }
}

/// NFKC-normalize, lowercase and keep only letters and digits.
pub fn normalize_word(raw: &str) -> String {
    raw.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Tokenize on `\W+` runs; empty tokens are dropped.
pub fn tokenize_non_word(text: &str) -> Vec<String> {
    split_with(&NON_WORD, text)
}

/// Tokenize on `\s+` runs; tokens that normalize to nothing are dropped.
pub fn tokenize_whitespace(text: &str) -> Vec<String> {
    split_with(&WHITESPACE, text)
}

fn split_with(re: &Regex, text: &str) -> Vec<String> {
    re.split(text)
        .filter(|t| !t.is_empty())
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_keeps_punctuated_words_together() {
        let t = tokenize_whitespace("don't stop-me now!");
        assert_eq!(t, vec!["dont", "stopme", "now"]);
    }

    #[test]
    fn non_word_splits_on_punctuation() {
        let t = tokenize_non_word("don't stop-me now!");
        assert_eq!(t, vec!["don", "t", "stop", "me", "now"]);
    }
}
