use crate::error::{Result, SimError};
use crate::tokenizer::normalize_word;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Word-frequency model of one document.
///
/// Keys are normalized words (lowercase letters and digits, never empty).
/// Counts only grow through [`add_word`](Self::add_word) and
/// [`merge`](Self::merge); [`divide`](Self::divide) is the one operation that
/// shrinks them and it truncates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyVector {
    counts: HashMap<String, u32>,
}

impl FrequencyVector {
    pub fn new() -> Self { Self::default() }

    /// Build a vector counting every word once per occurrence.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut v = Self::new();
        for w in words {
            v.add_word(w.as_ref(), 1);
        }
        v
    }

    /// Normalize `word` and add `count` to its entry. Words that normalize to
    /// nothing are ignored.
    pub fn add_word(&mut self, word: &str, count: u32) {
        let word = normalize_word(word);
        if word.is_empty() { return; }
        let slot = self.counts.entry(word).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Add every count of `other` into `self`.
    pub fn merge(&mut self, other: &FrequencyVector) {
        for (word, count) in &other.counts {
            let slot = self.counts.entry(word.clone()).or_insert(0);
            *slot = slot.saturating_add(*count);
        }
    }

    /// Integer-divide every count by `divisor`, truncating toward zero.
    /// Words whose count drops to zero keep their (zero) entry.
    pub fn divide(&mut self, divisor: u32) -> Result<()> {
        if divisor == 0 {
            return Err(SimError::invalid("divisor cannot be zero"));
        }
        for count in self.counts.values_mut() {
            *count /= divisor;
        }
        Ok(())
    }

    /// Count for `word` after normalization, 0 when absent.
    pub fn frequency(&self, word: &str) -> u32 {
        self.counts.get(&normalize_word(word)).copied().unwrap_or(0)
    }

    pub(crate) fn get(&self, normalized: &str) -> u32 {
        self.counts.get(normalized).copied().unwrap_or(0)
    }

    pub fn total_count(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize { self.counts.len() }

    pub fn is_empty(&self) -> bool { self.counts.is_empty() }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(w, &c)| (w.as_str(), c))
    }
}
