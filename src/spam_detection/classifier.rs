//! Incremental multinomial naive-Bayes classifier over the spam/ham classes.
//!
//! The classifier keeps aggregate counts only, so learning a document is O(its
//! tokens) and the model never stores the corpus itself. Additive (add-one)
//! smoothing keeps unseen tokens from zeroing a class out.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Class label for a training document or a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamClass {
    Spam,
    Ham,
}

impl fmt::Display for SpamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpamClass::Spam => write!(f, "spam"),
            SpamClass::Ham => write!(f, "ham"),
        }
    }
}

/// A labeled training document with its distinct tokens.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub class: SpamClass,
    pub tokens: Vec<String>,
}

impl Document {
    /// Build a document from a token-frequency map; map keys are already
    /// distinct, which is what the learner expects.
    pub fn from_freq(class: SpamClass, freq: &HashMap<String, usize>) -> Self {
        Self {
            class,
            tokens: freq.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Classifier {
    docs_per_class: HashMap<SpamClass, usize>,
    token_count: HashMap<SpamClass, HashMap<String, usize>>,
    total_tokens: HashMap<SpamClass, usize>,
    total_docs: usize,
    vocabulary: HashSet<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents learned so far. The facade must not consult
    /// `classify` while this is zero.
    pub fn total_docs(&self) -> usize {
        self.total_docs
    }

    /// Learn a batch of documents, updating the aggregate counts.
    ///
    /// Each distinct token of a document contributes exactly one count to its
    /// class, regardless of how often it occurred in the source message.
    pub fn learn(&mut self, docs: &[Document]) {
        for doc in docs {
            *self.docs_per_class.entry(doc.class).or_insert(0) += 1;
            self.total_docs += 1;

            let class_counts = self.token_count.entry(doc.class).or_default();
            for token in &doc.tokens {
                *class_counts.entry(token.clone()).or_insert(0) += 1;
                *self.total_tokens.entry(doc.class).or_insert(0) += 1;
                self.vocabulary.insert(token.clone());
            }
        }
    }

    /// Classify a set of tokens.
    ///
    /// Returns the winning class, its posterior probability in percent, and
    /// whether the verdict is certain (the two log-scores differ). An empty
    /// model yields `(Ham, 0.0, false)`.
    pub fn classify(&self, tokens: &[String]) -> (SpamClass, f64, bool) {
        if self.total_docs == 0 || self.vocabulary.is_empty() {
            return (SpamClass::Ham, 0.0, false);
        }

        let spam_score = self.log_score(SpamClass::Spam, tokens);
        let ham_score = self.log_score(SpamClass::Ham, tokens);

        let certain = spam_score != ham_score;
        let (class, winner, loser) = if spam_score >= ham_score {
            (SpamClass::Spam, spam_score, ham_score)
        } else {
            (SpamClass::Ham, ham_score, spam_score)
        };

        // softmax over two scores, rescaled by the winner for stability
        let probability = 100.0 / (1.0 + (loser - winner).exp());
        (class, probability, certain)
    }

    /// Zero every counter and clear the vocabulary.
    pub fn reset(&mut self) {
        self.docs_per_class.clear();
        self.token_count.clear();
        self.total_tokens.clear();
        self.total_docs = 0;
        self.vocabulary.clear();
    }

    /// Log prior plus smoothed log likelihood of the tokens under a class.
    fn log_score(&self, class: SpamClass, tokens: &[String]) -> f64 {
        let docs = self.docs_per_class.get(&class).copied().unwrap_or(0);
        let mut score = (docs as f64 / self.total_docs as f64).ln();

        let denominator = (self.total_tokens.get(&class).copied().unwrap_or(0)
            + self.vocabulary.len()) as f64;
        let class_counts = self.token_count.get(&class);
        for token in tokens {
            let count = class_counts
                .and_then(|counts| counts.get(token))
                .copied()
                .unwrap_or(0);
            score += ((count as f64 + 1.0) / denominator).ln();
        }
        score
    }
}
