//! # Cleaver Core
//!
//! Everything needed to turn labeled features into trainer input and to
//! evaluate what the trainer produced: feature and outcome encoding, the
//! training-data line formats, raw model evaluators, Platt-style sigmoid
//! calibration and the loaded [`Classifier`] implementations.
//!
//! ## Quick Start
//!
//! ```rust
//! use cleaver_core::encoder::{FeatureEncoder, OutcomeEncoder};
//! use cleaver_core::format::write_indexed_line;
//! use cleaver_core::{Feature, Outcome};
//!
//! let mut features = FeatureEncoder::new(1);
//! let mut outcomes = OutcomeEncoder::SignedBoolean;
//!
//! let encoded = features.encode_all(&[Feature::new("pos", "NN"), Feature::new("distance", 3.0)]).unwrap();
//! let outcome = outcomes.encode(&Outcome::Bool(true)).unwrap();
//!
//! let mut line = Vec::new();
//! write_indexed_line(&mut line, &outcome, &encoded).unwrap();
//! assert_eq!(String::from_utf8(line).unwrap(), "+1 1:1.0000000 2:3.0000000\n");
//! ```
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod format;
pub mod model;
pub mod sigmoid;
pub mod types;
pub mod vector;

// Re-export primary API
pub use classifier::{Classifier, MaxentClassifier, OneVsAllClassifier, SvmLightClassifier};
pub use encoder::{
    EncodedFeatureVector, EncodedOutcome, EncoderSet, FeatureEncoder, FrozenFeatureEncoder,
    KeyStyle, LookupOrder, OutcomeEncoder, Vocabulary,
};
pub use error::{CleaverError, Result};
pub use sigmoid::{Sigmoid, SigmoidConfig};
pub use types::{Feature, FeatureValue, Instance, Outcome, ScoredOutcome};
pub use vector::SparseVector;
