//! Evaluation of plain-text GIS maximum entropy models.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{CleaverError, Result};

/// A trained GIS model.
///
/// Layout: `GIS`, the correction constant, the correction parameter, the
/// outcome count and labels, the outcome pattern count and patterns
/// (`<predicates sharing it> <outcome id>...`), the predicate count and
/// labels, then one parameter per (predicate, pattern outcome) pair.
#[derive(Debug, Clone)]
pub struct GisModel {
    outcomes: Vec<String>,
    predicates: HashMap<String, Vec<(usize, f64)>>,
    correction_constant: f64,
    correction_param: f64,
}

impl GisModel {
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let mut next = |what: &str| -> Result<String> {
            lines
                .next()
                .transpose()?
                .map(|line| line.trim().to_owned())
                .ok_or_else(|| malformed(format!("missing {what}")))
        };

        let kind = next("model type")?;
        if kind != "GIS" {
            return Err(malformed(format!("expected GIS model, found {kind:?}")));
        }
        let correction_constant: f64 = parse(&next("correction constant")?, "correction constant")?;
        let correction_param: f64 = parse(&next("correction parameter")?, "correction parameter")?;

        let outcome_count: usize = parse(&next("outcome count")?, "outcome count")?;
        let outcomes = (0..outcome_count)
            .map(|_| next("outcome label"))
            .collect::<Result<Vec<_>>>()?;

        let pattern_count: usize = parse(&next("pattern count")?, "pattern count")?;
        let mut patterns = Vec::with_capacity(pattern_count);
        for _ in 0..pattern_count {
            let line = next("outcome pattern")?;
            let mut numbers = line.split_whitespace().map(|n| parse::<usize>(n, "outcome pattern"));
            let shared = numbers
                .next()
                .ok_or_else(|| malformed("empty outcome pattern".into()))??;
            let outcome_ids = numbers.collect::<Result<Vec<_>>>()?;
            if let Some(&bad) = outcome_ids.iter().find(|&&id| id >= outcome_count) {
                return Err(malformed(format!("outcome id {bad} out of range")));
            }
            patterns.push((shared, outcome_ids));
        }

        let predicate_count: usize = parse(&next("predicate count")?, "predicate count")?;
        let labels = (0..predicate_count)
            .map(|_| next("predicate label"))
            .collect::<Result<Vec<_>>>()?;

        let mut predicates = HashMap::with_capacity(predicate_count);
        let mut labels = labels.into_iter();
        for (shared, outcome_ids) in &patterns {
            for _ in 0..*shared {
                let label = labels
                    .next()
                    .ok_or_else(|| malformed("more pattern slots than predicates".into()))?;
                let mut params = Vec::with_capacity(outcome_ids.len());
                for &oid in outcome_ids {
                    params.push((oid, parse(&next("parameter")?, "parameter")?));
                }
                predicates.insert(label, params);
            }
        }
        if correction_constant <= 0.0 {
            return Err(malformed("correction constant must be positive".into()));
        }

        Ok(Self {
            outcomes,
            predicates,
            correction_constant,
            correction_param,
        })
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    /// Probability of each outcome, in [`GisModel::outcomes`] order.
    pub fn eval<'a, I>(&self, context: I) -> Vec<f64>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut sums = vec![0.0; self.outcomes.len()];
        let mut active = vec![0usize; self.outcomes.len()];
        for (predicate, value) in context {
            if let Some(params) = self.predicates.get(predicate) {
                for &(oid, param) in params {
                    sums[oid] += param * value;
                    active[oid] += 1;
                }
            }
        }

        let inverse = 1.0 / self.correction_constant;
        let mut total = 0.0;
        for (sum, &count) in sums.iter_mut().zip(&active) {
            let mut exponent = *sum * inverse;
            if self.correction_param != 0.0 {
                exponent += (1.0 - count as f64 / self.correction_constant) * self.correction_param;
            }
            *sum = exponent.exp();
            total += *sum;
        }
        if total > 0.0 {
            for p in &mut sums {
                *p /= total;
            }
        }
        sums
    }
}

fn malformed(reason: String) -> CleaverError {
    CleaverError::Configuration(format!("malformed GIS model: {reason}"))
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| malformed(format!("bad {what}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "GIS\n1\n0.0\n2\ntrue\nfalse\n2\n1 0 1\n1 0\n2\nhot\ncold\n1.0\n-1.0\n0.5\n";

    #[test]
    fn test_read_and_eval() {
        let model = GisModel::read(MODEL.as_bytes()).unwrap();
        assert_eq!(model.outcomes(), &["true", "false"]);

        let probs = model.eval([("hot", 1.0)]);
        let e2 = 2.0f64.exp();
        assert!((probs[0] - e2 / (e2 + 1.0)).abs() < 1e-12);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        let probs = model.eval([("unknown", 1.0)]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_correction_parameter() {
        let text = MODEL.replacen("0.0", "0.5", 1);
        let model = GisModel::read(text.as_bytes()).unwrap();
        // hot fires on both outcomes, so the correction term cancels out
        let probs = model.eval([("hot", 1.0)]);
        let e2 = 2.0f64.exp();
        assert!((probs[0] - e2 / (e2 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_header() {
        assert!(GisModel::read("QN\n".as_bytes()).is_err());
        assert!(GisModel::read("GIS\n1\n0.0\n2\ntrue\n".as_bytes()).is_err());
    }
}
