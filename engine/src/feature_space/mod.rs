//! Feature Space
//!
//! Turns free text into sparse TF-IDF vectors over a vocabulary frozen at fit
//! time. The vocabulary is built once from every known phrasing in the graph;
//! words never seen during fit are ignored when transforming user input.
//!
//! Weighting:
//! - tokens are lowercase runs of two or more word characters
//! - term frequency is the raw count of a token in the text
//! - idf(t) = ln((1 + n) / (1 + df(t))) + 1, with n documents in the corpus
//! - the weighted vector is L2-normalised
//!
//! # Example
//!
//! ```
//! use parley_engine::feature_space::{cosine_similarity, FeatureSpace};
//!
//! let space = FeatureSpace::fit(["show me all files", "plot the data"]).unwrap();
//! let a = space.transform("show files");
//! let b = space.transform("show me all files");
//! assert!(cosine_similarity(&a, &b) > 0.5);
//! assert!(space.transform("xyzzy").is_zero());
//! ```

use regex::Regex;
use sdk::errors::{EngineError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Default token pattern: two or more word characters between word boundaries
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Sparse vector over a feature space vocabulary
///
/// Entries are sorted by vocabulary index and only non-zero weights are stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// The zero vector
    pub fn zero() -> Self {
        Self::default()
    }

    /// Non-zero `(index, weight)` pairs in index order
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every weight is zero
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dot product (merge over the two sorted index lists)
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ai, aw) = self.entries[i];
            let (bi, bw) = other.entries[j];
            match ai.cmp(&bi) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += aw * bw;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Cosine similarity between two vectors
///
/// A zero vector on either side scores 0. Weights are non-negative, so the
/// result is clamped to `[0, 1]` to absorb rounding above 1.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

/// Fixed vocabulary with inverse-document-frequency weights
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    token_pattern: Regex,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: usize,
}

impl FeatureSpace {
    /// Fit a feature space over a corpus with the default token pattern
    pub fn fit<I, S>(corpus: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::fit_with_pattern(corpus, DEFAULT_TOKEN_PATTERN)
    }

    /// Fit a feature space over a corpus, tokenising with `token_pattern`
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the token pattern is not a valid regex.
    pub fn fit_with_pattern<I, S>(corpus: I, token_pattern: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let token_pattern = Regex::new(token_pattern).map_err(|e| {
            EngineError::Config(format!("Invalid token pattern '{}': {}", token_pattern, e))
        })?;

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut documents = 0usize;

        for doc in corpus {
            let terms: BTreeSet<String> = tokenize_with(&token_pattern, doc.as_ref())
                .into_iter()
                .collect();
            for term in terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
            documents += 1;
        }

        // BTreeMap iteration is sorted, so indices follow term order
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1 + documents) as f64 / (1 + df) as f64).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        debug!(
            "Feature space fitted: {} documents, {} terms",
            documents,
            vocabulary.len()
        );

        Ok(Self {
            token_pattern,
            vocabulary,
            idf,
            documents,
        })
    }

    /// Map text to an L2-normalised TF-IDF vector
    ///
    /// Out-of-vocabulary tokens are dropped; text with no known tokens maps to
    /// the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in self.tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut entries {
                *weight /= norm;
            }
        }

        SparseVector { entries }
    }

    /// Split text into lowercase tokens
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize_with(&self.token_pattern, text)
    }

    /// Number of distinct terms in the vocabulary
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of documents the space was fitted on
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Vocabulary index of a term, if known
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Inverse document frequency of a term, if known
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.index_of(term).map(|index| self.idf[index])
    }
}

fn tokenize_with(pattern: &Regex, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    pattern
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
