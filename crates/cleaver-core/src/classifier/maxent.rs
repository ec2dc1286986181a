use crate::encoder::{EncodedOutcome, FrozenFeatureEncoder, KeyStyle, OutcomeEncoder};
use crate::error::{CleaverError, Result};
use crate::model::GisModel;
use crate::types::{Feature, Outcome, ScoredOutcome};

use super::{Classifier, rank};

/// Classifier over a GIS maxent model. Probabilities come from the model
/// itself, so no sigmoid is involved.
#[derive(Debug, Clone)]
pub struct MaxentClassifier {
    features: FrozenFeatureEncoder,
    outcomes: OutcomeEncoder,
    keys: KeyStyle,
    model: GisModel,
}

impl MaxentClassifier {
    pub fn new(
        features: FrozenFeatureEncoder,
        outcomes: OutcomeEncoder,
        keys: KeyStyle,
        model: GisModel,
    ) -> Self {
        Self {
            features,
            outcomes,
            keys,
            model,
        }
    }

    /// Model outcome labels paired with their probabilities.
    fn probabilities(&self, features: &[Feature]) -> Result<Vec<(&str, f64)>> {
        let encoded = self.features.encode_all(features)?;
        let context: Vec<(String, f64)> = encoded
            .entries()
            .iter()
            .filter_map(|entry| {
                let index = entry.index?;
                let key = match self.keys {
                    KeyStyle::Names => entry.name.clone(),
                    KeyStyle::Indices => index.to_string(),
                };
                Some((key, entry.value.as_f64()))
            })
            .collect();

        let probs = self
            .model
            .eval(context.iter().map(|(key, value)| (key.as_str(), *value)));
        Ok(self
            .model
            .outcomes()
            .iter()
            .map(String::as_str)
            .zip(probs)
            .collect())
    }

    fn decode(&self, label: &str) -> Result<Outcome> {
        self.outcomes
            .decode(&EncodedOutcome::Literal(label.to_owned()))
    }
}

impl Classifier for MaxentClassifier {
    fn classify(&self, features: &[Feature]) -> Result<Outcome> {
        let mut best: Option<(&str, f64)> = None;
        for (label, p) in self.probabilities(features)? {
            if best.is_none_or(|(_, top)| p > top) {
                best = Some((label, p));
            }
        }
        let (label, _) =
            best.ok_or_else(|| CleaverError::Configuration("maxent model has no outcomes".into()))?;
        self.decode(label)
    }

    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome>> {
        let scored = self
            .probabilities(features)?
            .into_iter()
            .map(|(label, p)| Ok(ScoredOutcome::new(self.decode(label)?, p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(rank(scored, max_results))
    }
}
