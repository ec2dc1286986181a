pub mod features;
pub mod outcome;

use serde::{Deserialize, Serialize};

pub use features::{
    EncodedFeature, EncodedFeatureVector, FeatureEncoder, FrozenFeatureEncoder, KeyStyle,
    LookupOrder, Number, Vocabulary, VocabularyBuilder,
};
pub use outcome::{ClassIds, EncodedOutcome, OutcomeEncoder};

/// The encoders persisted alongside a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSet {
    pub features: FrozenFeatureEncoder,
    pub outcomes: OutcomeEncoder,
    /// Key style the name-value training lines were written with.
    #[serde(default)]
    pub keys: KeyStyle,
}
