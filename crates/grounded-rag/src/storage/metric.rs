//! Distance metrics and top-k ranking

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{Document, RetrievedMatch};

/// Vector closeness metric, fixed per store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity, higher is better
    #[default]
    Cosine,
    /// L2 distance, lower is better
    Euclidean,
}

impl DistanceMetric {
    /// Score `candidate` against `query`
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(query, candidate),
            DistanceMetric::Euclidean => euclidean_distance(query, candidate),
        }
    }

    /// Order two scores best-first. NaN sorts last.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                DistanceMetric::Cosine => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
                DistanceMetric::Euclidean => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            },
        }
    }

    /// Score every document and keep the `k` best, ties broken by id
    pub fn rank<'a, I>(&self, query: &[f32], documents: I, k: usize) -> Result<Vec<RetrievedMatch>>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let expected = query.len();
        let mut scored = Vec::new();
        for doc in documents {
            if doc.embedding.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: doc.embedding.len(),
                });
            }
            scored.push((self.score(query, &doc.embedding), doc));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        scored.sort_by(|(sa, da), (sb, db)| self.compare(*sa, *sb).then_with(|| da.id.cmp(&db.id)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, doc)| doc.to_match(score))
            .collect())
    }

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            other => Err(Error::Config(format!("Unknown distance metric '{}'", other))),
        }
    }
}

/// Cosine similarity; zero-norm vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// L2 distance
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
