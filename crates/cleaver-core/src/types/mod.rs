pub mod feature;
pub mod instance;

pub use feature::{Feature, FeatureValue};
pub use instance::{Instance, Outcome, ScoredOutcome};
