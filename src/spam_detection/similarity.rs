//! Cosine-similarity matching of a message against the stored spam samples.

use std::collections::HashMap;

use crate::spam_detection::models::CheckResult;

/// Cosine similarity between two token-frequency maps, treating missing keys
/// as zero. Returns 0 when either map is empty or has a zero norm.
pub(crate) fn cosine_similarity(a: &HashMap<String, usize>, b: &HashMap<String, usize>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0usize;
    let mut norm_a = 0usize;
    let mut norm_b = 0usize;

    for (key, val) in a {
        dot_product += val * b.get(key).copied().unwrap_or(0);
        norm_a += val * val;
    }
    for val in b.values() {
        norm_b += val * val;
    }

    if norm_a == 0 || norm_b == 0 {
        return 0.0;
    }

    dot_product as f64 / ((norm_a as f64).sqrt() * (norm_b as f64).sqrt())
}

/// Compare a tokenized message with every stored spam sample, stopping early
/// on the first similarity at or above the threshold.
pub(crate) fn similarity_check(
    message: &HashMap<String, usize>,
    spam_samples: &[HashMap<String, usize>],
    threshold: f64,
) -> CheckResult {
    let mut max_similarity = 0.0f64;
    for sample in spam_samples {
        let similarity = cosine_similarity(message, sample);
        if similarity > max_similarity {
            max_similarity = similarity;
        }
        if similarity >= threshold {
            return CheckResult {
                name: "similarity".to_string(),
                spam: true,
                details: format!("{:.2}/{:.2}", max_similarity, threshold),
            };
        }
    }
    CheckResult {
        name: "similarity".to_string(),
        spam: false,
        details: format!("{:.2}/{:.2}", max_similarity, threshold),
    }
}
