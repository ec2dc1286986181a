use std::fmt;

use serde::{Deserialize, Serialize};

use super::feature::Feature;

/// A domain outcome: either a boolean decision or a string label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Bool(bool),
    Label(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Self::Label(value.to_owned())
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        Self::Label(value)
    }
}

/// One observation: an ordered feature list plus an optional outcome.
///
/// The outcome may be absent at classification time; training requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub features: Vec<Feature>,
    pub outcome: Option<Outcome>,
}

impl Instance {
    /// Creates an unlabeled instance.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            outcome: None,
        }
    }

    /// Creates a labeled instance.
    #[must_use]
    pub fn labeled(features: Vec<Feature>, outcome: impl Into<Outcome>) -> Self {
        Self {
            features,
            outcome: Some(outcome.into()),
        }
    }
}

/// An outcome paired with its calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOutcome {
    pub outcome: Outcome,
    pub score: f64,
}

impl ScoredOutcome {
    #[must_use]
    pub fn new(outcome: Outcome, score: f64) -> Self {
        Self { outcome, score }
    }
}

impl fmt::Display for ScoredOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4})", self.outcome, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Bool(true).to_string(), "true");
        assert_eq!(Outcome::from("NN").to_string(), "NN");
    }

    #[test]
    fn test_labeled_instance() {
        let instance = Instance::labeled(vec![Feature::new("pos", "NN")], true);
        assert_eq!(instance.outcome, Some(Outcome::Bool(true)));
        assert!(Instance::default().outcome.is_none());
    }
}
