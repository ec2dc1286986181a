use crate::encoder::{EncodedOutcome, FrozenFeatureEncoder, OutcomeEncoder};
use crate::error::Result;
use crate::model::SvmLightModel;
use crate::sigmoid::Sigmoid;
use crate::types::{Feature, Outcome, ScoredOutcome};

use super::{Classifier, rank};

/// Binary classifier over one svm_light model.
///
/// `classify` follows the sign of the raw margin; `score` ranks by the
/// calibrated probability of the positive outcome.
#[derive(Debug, Clone)]
pub struct SvmLightClassifier {
    features: FrozenFeatureEncoder,
    outcomes: OutcomeEncoder,
    model: SvmLightModel,
    sigmoid: Sigmoid,
}

impl SvmLightClassifier {
    pub fn new(
        features: FrozenFeatureEncoder,
        outcomes: OutcomeEncoder,
        model: SvmLightModel,
        sigmoid: Sigmoid,
    ) -> Self {
        Self {
            features,
            outcomes,
            model,
            sigmoid,
        }
    }

    /// Raw margin for `features`.
    pub fn decision_value(&self, features: &[Feature]) -> Result<f64> {
        let encoded = self.features.encode_all(features)?;
        Ok(self.model.evaluate(&encoded.to_sparse()))
    }

    pub fn sigmoid(&self) -> &Sigmoid {
        &self.sigmoid
    }
}

impl Classifier for SvmLightClassifier {
    fn classify(&self, features: &[Feature]) -> Result<Outcome> {
        let d = self.decision_value(features)?;
        self.outcomes
            .decode(&EncodedOutcome::Signed(if d > 0.0 { 1 } else { -1 }))
    }

    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome>> {
        let p = self.sigmoid.evaluate(self.decision_value(features)?);
        let positive = self.outcomes.decode(&EncodedOutcome::Signed(1))?;
        let negative = self.outcomes.decode(&EncodedOutcome::Signed(-1))?;
        Ok(rank(
            vec![
                ScoredOutcome::new(positive, p),
                ScoredOutcome::new(negative, 1.0 - p),
            ],
            max_results,
        ))
    }
}
