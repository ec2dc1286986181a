//! Evaluation of svm_light text models.
//!
//! The model layout is a version header, nine parameter lines (kernel type,
//! `-d`, `-g`, `-s`, `-r`, `-u`, highest feature index, training document
//! count, support vector count plus one), the threshold `b`, and then one
//! support vector per line as `alpha*y index:value ... #comment`.

use std::io::BufRead;

use crate::error::{CleaverError, Result};
use crate::vector::SparseVector;

/// Kernel function of a trained model.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    Linear,
    /// `(s·<x,z> + r)^degree`
    Polynomial { degree: i32, s: f64, r: f64 },
    /// `exp(-gamma·|x-z|²)`
    Rbf { gamma: f64 },
    /// `tanh(s·<x,z> + r)`
    Sigmoid { s: f64, r: f64 },
}

impl Kernel {
    pub fn evaluate(&self, x: &SparseVector, z: &SparseVector) -> f64 {
        match *self {
            Self::Linear => x.dot(z),
            Self::Polynomial { degree, s, r } => (s * x.dot(z) + r).powi(degree),
            Self::Rbf { gamma } => (-gamma * x.squared_distance(z)).exp(),
            Self::Sigmoid { s, r } => (s * x.dot(z) + r).tanh(),
        }
    }
}

/// A trained svm_light model.
#[derive(Debug, Clone)]
pub struct SvmLightModel {
    kernel: Kernel,
    threshold: f64,
    support_vectors: Vec<(f64, SparseVector)>,
    /// Folded weights for linear models.
    weights: Option<SparseVector>,
}

impl SvmLightModel {
    /// Parses an svm_light model file.
    ///
    /// # Errors
    ///
    /// Returns [`CleaverError::Configuration`] for a truncated or malformed
    /// model, or one using a custom (type 4) kernel.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let mut next_value = |what: &str| -> Result<String> {
            let line = lines
                .next()
                .transpose()?
                .ok_or_else(|| malformed(format!("missing {what}")))?;
            Ok(line.split('#').next().unwrap_or_default().trim().to_owned())
        };

        next_value("version header")?;
        let kernel_type: i32 = parse(&next_value("kernel type")?, "kernel type")?;
        let degree: i32 = parse(&next_value("kernel parameter -d")?, "-d")?;
        let gamma: f64 = parse(&next_value("kernel parameter -g")?, "-g")?;
        let s: f64 = parse(&next_value("kernel parameter -s")?, "-s")?;
        let r: f64 = parse(&next_value("kernel parameter -r")?, "-r")?;
        next_value("kernel parameter -u")?;
        parse::<u64>(&next_value("highest feature index")?, "highest feature index")?;
        next_value("number of training documents")?;
        let declared: usize = parse(&next_value("support vector count")?, "support vector count")?;
        let threshold: f64 = parse(&next_value("threshold")?, "threshold")?;

        let kernel = match kernel_type {
            0 => Kernel::Linear,
            1 => Kernel::Polynomial { degree, s, r },
            2 => Kernel::Rbf { gamma },
            3 => Kernel::Sigmoid { s, r },
            4 => return Err(malformed("custom kernels are not supported".into())),
            other => return Err(malformed(format!("unknown kernel type {other}"))),
        };

        let mut support_vectors = Vec::new();
        for line in lines {
            let line = line?;
            let content = line.split('#').next().unwrap_or_default();
            let mut tokens = content.split_whitespace();
            let Some(alpha) = tokens.next() else {
                continue;
            };
            let alpha: f64 = parse(alpha, "support vector weight")?;
            let mut pairs = Vec::new();
            for token in tokens {
                let (index, value) = token
                    .split_once(':')
                    .ok_or_else(|| malformed(format!("bad support vector entry {token:?}")))?;
                pairs.push((parse(index, "feature index")?, parse(value, "feature value")?));
            }
            support_vectors.push((alpha, SparseVector::from_pairs(pairs)));
        }
        if support_vectors.len() + 1 < declared {
            return Err(malformed(format!(
                "expected {} support vectors, found {}",
                declared - 1,
                support_vectors.len()
            )));
        }

        let weights = (kernel == Kernel::Linear).then(|| {
            SparseVector::from_pairs(support_vectors.iter().flat_map(|(alpha, sv)| {
                sv.entries().iter().map(move |&(index, value)| (index, alpha * value))
            }))
        });

        Ok(Self {
            kernel,
            threshold,
            support_vectors,
            weights,
        })
    }

    /// Raw decision value `Σ alpha_i·y_i·K(sv_i, x) - b`.
    pub fn evaluate(&self, x: &SparseVector) -> f64 {
        let sum = match &self.weights {
            Some(weights) => x.dot(weights),
            None => self
                .support_vectors
                .iter()
                .map(|(alpha, sv)| alpha * self.kernel.evaluate(sv, x))
                .sum(),
        };
        sum - self.threshold
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.len()
    }
}

fn malformed(reason: String) -> CleaverError {
    CleaverError::Configuration(format!("malformed svm_light model: {reason}"))
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| malformed(format!("bad {what}: {value:?}")))
}
