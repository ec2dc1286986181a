//! Loaded classifiers answering `classify` and `score` queries.
//!
//! A classifier owns everything it needs (frozen encoders, raw model(s) and
//! calibration) and holds no mutable state, so it can be shared across threads.

pub mod maxent;
pub mod one_vs_all;
pub mod svmlight;

pub use maxent::MaxentClassifier;
pub use one_vs_all::OneVsAllClassifier;
pub use svmlight::SvmLightClassifier;

use crate::error::Result;
use crate::types::{Feature, Outcome, ScoredOutcome};

/// A trained classifier.
pub trait Classifier: Send + Sync {
    /// Returns the single best outcome for `features`.
    fn classify(&self, features: &[Feature]) -> Result<Outcome>;

    /// Returns up to `max_results` outcomes ranked by descending probability.
    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome>>;

    /// Classifies a batch of feature lists.
    fn classify_all(&self, batch: &[Vec<Feature>]) -> Result<Vec<Outcome>> {
        batch.iter().map(|features| self.classify(features)).collect()
    }
}

/// Stable descending sort by score, then truncation.
pub(crate) fn rank(mut scored: Vec<ScoredOutcome>, max_results: usize) -> Vec<ScoredOutcome> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(max_results);
    scored
}
