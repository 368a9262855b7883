use crate::error::{Result, SimError};
use crate::vector::FrequencyVector;
use std::collections::HashMap;

/// Cosine similarity over the union of both vocabularies.
///
/// A word missing from one side contributes 0 to the dot product and to that
/// side's norm. Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &FrequencyVector, b: &FrequencyVector) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    for (word, fa) in a.iter() {
        let fa = fa as f64;
        norm_a += fa * fa;
        dot += fa * b.get(word) as f64;
    }
    let norm_b: f64 = b.iter().map(|(_, fb)| (fb as f64) * (fb as f64)).sum();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // single sqrt keeps self-similarity at exactly 1.0
    dot / (norm_a * norm_b).sqrt()
}

/// Similarity between two documents looked up by id. A missing vector is an
/// invalid argument, not a zero score.
pub fn similarity_by_id(vectors: &HashMap<String, FrequencyVector>, a: &str, b: &str) -> Result<f64> {
    let va = vectors.get(a).ok_or_else(|| SimError::invalid(format!("no frequency vector for {a}")))?;
    let vb = vectors.get(b).ok_or_else(|| SimError::invalid(format!("no frequency vector for {b}")))?;
    Ok(cosine_similarity(va, vb))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(pairs: &[(&str, u32)]) -> FrequencyVector {
        let mut v = FrequencyVector::new();
        for (w, c) in pairs {
            v.add_word(w, *c);
        }
        v
    }

    #[test]
    fn shared_word_example() {
        let a = fv(&[("the", 2), ("cat", 1)]);
        let b = fv(&[("the", 2), ("dog", 1)]);
        assert!((cosine_similarity(&a, &b) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn zero_magnitude_is_zero_not_nan() {
        let a = fv(&[("x", 3)]);
        let mut zero = fv(&[("x", 1)]);
        zero.divide(2).unwrap();
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&FrequencyVector::new(), &FrequencyVector::new()), 0.0);
    }

    #[test]
    fn missing_id_is_invalid_argument() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), fv(&[("x", 1)]));
        assert!(matches!(similarity_by_id(&map, "a", "b"), Err(SimError::InvalidArgument(_))));
        assert_eq!(similarity_by_id(&map, "a", "a").unwrap(), 1.0);
    }
}
