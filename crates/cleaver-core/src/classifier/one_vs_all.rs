use std::collections::BTreeMap;

use crate::encoder::{EncodedOutcome, FrozenFeatureEncoder, OutcomeEncoder};
use crate::error::{CleaverError, Result};
use crate::model::SvmLightModel;
use crate::sigmoid::Sigmoid;
use crate::types::{Feature, Outcome, ScoredOutcome};

use super::{Classifier, rank};

/// Multiclass classifier made of one calibrated binary model per class.
#[derive(Debug, Clone)]
pub struct OneVsAllClassifier {
    features: FrozenFeatureEncoder,
    outcomes: OutcomeEncoder,
    models: BTreeMap<u32, (SvmLightModel, Sigmoid)>,
}

impl OneVsAllClassifier {
    /// # Errors
    ///
    /// [`CleaverError::Configuration`] if `models` is empty.
    pub fn new(
        features: FrozenFeatureEncoder,
        outcomes: OutcomeEncoder,
        models: BTreeMap<u32, (SvmLightModel, Sigmoid)>,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(CleaverError::Configuration(
                "one-vs-all classifier needs at least one model".into(),
            ));
        }
        Ok(Self {
            features,
            outcomes,
            models,
        })
    }

    pub fn class_count(&self) -> usize {
        self.models.len()
    }

    /// Calibrated score per class id, in increasing id order.
    fn class_scores(&self, features: &[Feature]) -> Result<Vec<(u32, f64)>> {
        let x = self.features.encode_all(features)?.to_sparse();
        Ok(self
            .models
            .iter()
            .map(|(&id, (model, sigmoid))| (id, sigmoid.evaluate(model.evaluate(&x))))
            .collect())
    }
}

impl Classifier for OneVsAllClassifier {
    fn classify(&self, features: &[Feature]) -> Result<Outcome> {
        let mut best: Option<(u32, f64)> = None;
        for (id, score) in self.class_scores(features)? {
            // ties keep the lowest id
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((id, score));
            }
        }
        let (id, _) = best.ok_or_else(|| CleaverError::Configuration("no class models".into()))?;
        self.outcomes.decode(&EncodedOutcome::ClassId(id))
    }

    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome>> {
        let scored = self
            .class_scores(features)?
            .into_iter()
            .map(|(id, score)| {
                let outcome = self.outcomes.decode(&EncodedOutcome::ClassId(id))?;
                Ok(ScoredOutcome::new(outcome, score))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(rank(scored, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{ClassIds, FeatureEncoder};

    fn linear_model(weights: &[(u32, f64)]) -> SvmLightModel {
        let support: Vec<String> = weights.iter().map(|(i, w)| format!("{w} {i}:1 #")).collect();
        let text = format!(
            "SVM-light Version V6.02\n0\n3\n1\n1\n1\nempty\n3\n3\n{}\n0\n{}\n",
            support.len() + 1,
            support.join("\n")
        );
        SvmLightModel::read(text.as_bytes()).unwrap()
    }

    fn classifier(flat: bool) -> OneVsAllClassifier {
        let mut features = FeatureEncoder::new(1);
        features
            .encode_all(&[
                Feature::new("w", "a"),
                Feature::new("w", "b"),
                Feature::new("w", "c"),
            ])
            .unwrap();
        let mut outcomes = OutcomeEncoder::ClassIds(ClassIds::default());
        for label in ["A", "B", "C"] {
            outcomes.encode(&label.into()).unwrap();
        }

        let sigmoid = Sigmoid::new(-1.0, 0.0);
        let mut models = BTreeMap::new();
        for id in 1..=3u32 {
            let weight = if flat { 0.0 } else { 1.0 };
            models.insert(id, (linear_model(&[(id, weight)]), sigmoid));
        }
        OneVsAllClassifier::new(features.finalize_feature_set(), outcomes, models).unwrap()
    }

    #[test]
    fn test_classify_picks_best_class() {
        let classifier = classifier(false);
        assert_eq!(classifier.class_count(), 3);
        assert_eq!(
            classifier.classify(&[Feature::new("w", "b")]).unwrap(),
            Outcome::from("B")
        );
        assert_eq!(
            classifier.classify(&[Feature::new("w", "c")]).unwrap(),
            Outcome::from("C")
        );
    }

    #[test]
    fn test_ties_keep_lowest_id() {
        let classifier = classifier(true);
        assert_eq!(
            classifier.classify(&[Feature::new("w", "c")]).unwrap(),
            Outcome::from("A")
        );
        let scored = classifier.score(&[], 3).unwrap();
        let labels: Vec<String> = scored.iter().map(|s| s.outcome.to_string()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_score_ranks_and_truncates() {
        let classifier = classifier(false);
        let scored = classifier.score(&[Feature::new("w", "c")], 2).unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].outcome, Outcome::from("C"));
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn test_requires_models() {
        let features = FeatureEncoder::new(1).finalize_feature_set();
        let err = OneVsAllClassifier::new(
            features,
            OutcomeEncoder::ClassIds(ClassIds::default()),
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CleaverError::Configuration(_)));
    }
}
