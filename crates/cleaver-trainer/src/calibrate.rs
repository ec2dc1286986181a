//! Sigmoid calibration from a persisted training file and a freshly trained model.
//!
//! Decision values are re-derived by parsing the training file again and
//! evaluating the model on every labeled row. Unlabeled (`0`) rows are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cleaver_core::format::parse_indexed_line;
use cleaver_core::model::SvmLightModel;
use cleaver_core::{CleaverError, Result, Sigmoid, SigmoidConfig};
use tracing::info;

/// Reads an svm_light model file.
pub fn read_model(path: &Path) -> Result<SvmLightModel> {
    let file = File::open(path).map_err(|e| {
        CleaverError::Configuration(format!("cannot read model {}: {e}", path.display()))
    })?;
    SvmLightModel::read(BufReader::new(file))
}

/// Evaluates `model` on each labeled row of `training_file`.
pub fn decision_values(training_file: &Path, model: &SvmLightModel) -> Result<(Vec<f64>, Vec<bool>)> {
    let file = File::open(training_file).map_err(|e| {
        CleaverError::Configuration(format!(
            "cannot read training data {}: {e}",
            training_file.display()
        ))
    })?;

    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let parsed = parse_indexed_line(&line).map_err(|e| {
            CleaverError::Configuration(format!(
                "{}:{}: {e}",
                training_file.display(),
                number + 1
            ))
        })?;
        if let Some(label) = parsed.label {
            values.push(model.evaluate(&parsed.vector));
            labels.push(label);
        }
    }
    Ok((values, labels))
}

/// Fits a sigmoid for the model at `model_file` trained on `training_file`.
pub fn fit_sigmoid(training_file: &Path, model_file: &Path, config: &SigmoidConfig) -> Result<Sigmoid> {
    let model = read_model(model_file)?;
    let (values, labels) = decision_values(training_file, &model)?;
    let sigmoid = Sigmoid::fit(&values, &labels, config)?;
    info!(
        training_file = %training_file.display(),
        examples = values.len(),
        a = sigmoid.a,
        b = sigmoid.b,
        "fitted sigmoid"
    );
    Ok(sigmoid)
}

pub fn write_sigmoid(path: &Path, sigmoid: &Sigmoid) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, sigmoid)?;
    out.flush()?;
    Ok(())
}

pub fn read_sigmoid(bytes: &[u8]) -> Result<Sigmoid> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "SVM-light Version V6.02\n0\n3\n1\n1\n1\nempty\n2\n4\n3\n0\n1 1:1 #\n-1 2:1 #\n";

    #[test]
    fn test_decision_values_skip_unlabeled_rows() {
        let dir = tempfile::tempdir().unwrap();
        let training = dir.path().join("training-data.svmlight");
        std::fs::write(&training, "+1 1:2.0000000\n0 1:5.0\n-1 2:1.5000000\n-1\n").unwrap();
        let model = SvmLightModel::read(MODEL.as_bytes()).unwrap();

        let (values, labels) = decision_values(&training, &model).unwrap();
        assert_eq!(labels, vec![true, false, false]);
        assert_eq!(values, vec![2.0, -1.5, 0.0]);
    }

    #[test]
    fn test_malformed_line_names_location() {
        let dir = tempfile::tempdir().unwrap();
        let training = dir.path().join("training-data.svmlight");
        std::fs::write(&training, "+1 1:1\nmaybe 2:1\n").unwrap();
        let model = SvmLightModel::read(MODEL.as_bytes()).unwrap();

        let err = decision_values(&training, &model).unwrap_err();
        assert!(err.to_string().contains("training-data.svmlight:2"));
    }

    #[test]
    fn test_fit_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let training = dir.path().join("training-data.svmlight");
        let model = dir.path().join("training-data.svmlight.model");
        let mut rows = String::new();
        for i in 0..10 {
            let x = 0.5 + i as f64 * 0.25;
            rows.push_str(&format!("+1 1:{x:.7}\n-1 2:{x:.7}\n"));
        }
        std::fs::write(&training, rows).unwrap();
        std::fs::write(&model, MODEL).unwrap();

        let sigmoid = fit_sigmoid(&training, &model, &SigmoidConfig::default()).unwrap();
        assert!(sigmoid.a < 0.0);

        let path = dir.path().join("training-data.svmlight.sigmoid");
        write_sigmoid(&path, &sigmoid).unwrap();
        let back = read_sigmoid(&std::fs::read(&path).unwrap()).unwrap();
        assert!((back.a - sigmoid.a).abs() < 1e-12);
        assert!((back.b - sigmoid.b).abs() < 1e-12);
    }
}
