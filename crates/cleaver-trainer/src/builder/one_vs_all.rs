//! One-vs-all svm_light builder.
//!
//! Archive entries after the encoders: `model-1`, `sigmoid-1`, `model-2`,
//! `sigmoid-2`, ... with no gaps, one pair per class id in increasing order.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cleaver_core::encoder::EncoderSet;
use cleaver_core::encoder::outcome::FIRST_CLASS_ID;
use cleaver_core::model::SvmLightModel;
use cleaver_core::{
    Classifier, CleaverError, OneVsAllClassifier, Result, Sigmoid, SigmoidConfig,
};
use tracing::info;

use super::{BuilderKind, ClassifierBuilder, model_file, require_file, sigmoid_file};
use crate::archive::ArchiveReader;
use crate::calibrate::{fit_sigmoid, read_sigmoid, write_sigmoid};
use crate::one_vs_all::class_file_name;
use crate::process::{TrainerCommand, TrainerRun};
use crate::writer::TrainingDirectory;

pub fn model_entry(class_id: u32) -> String {
    format!("model-{class_id}")
}

pub fn sigmoid_entry(class_id: u32) -> String {
    format!("sigmoid-{class_id}")
}

/// Class ids recorded in the directory's encoders, in increasing order.
fn encoded_class_ids(dir: &TrainingDirectory) -> Result<Vec<u32>> {
    let encoders = dir.load_encoders()?;
    let ids = encoders.outcomes.class_ids().ok_or_else(|| {
        CleaverError::Configuration(format!(
            "{} does not hold one-vs-all encoders",
            dir.path().display()
        ))
    })?;
    if ids.is_empty() {
        return Err(CleaverError::Configuration(format!(
            "no classes recorded in {}",
            dir.path().display()
        )));
    }
    Ok(ids.iter().map(|(id, _)| id).collect())
}

#[derive(Debug, Default)]
pub struct OneVsAllSvmLightBuilder {
    sigmoid_config: SigmoidConfig,
    loaded: BTreeMap<u32, (SvmLightModel, Sigmoid)>,
}

impl OneVsAllSvmLightBuilder {
    pub fn new(sigmoid_config: SigmoidConfig) -> Self {
        Self {
            sigmoid_config,
            loaded: BTreeMap::new(),
        }
    }
}

impl ClassifierBuilder for OneVsAllSvmLightBuilder {
    fn kind(&self) -> BuilderKind {
        BuilderKind::OneVsAllSvmlight
    }

    fn train_classifier(&self, dir: &TrainingDirectory, args: &[String]) -> Result<Vec<TrainerRun>> {
        let command = TrainerCommand::from_args(self.kind().default_executable(), args)?;
        let classes = encoded_class_ids(dir)?;

        let mut runs = Vec::with_capacity(classes.len());
        for class_id in classes {
            let training = dir.file(&class_file_name(class_id));
            require_file(&training, "training data")?;
            info!(class_id, "training one-vs-all model");
            let model = model_file(&training);
            runs.push(command.run(&training, &model)?);
            let sigmoid = fit_sigmoid(&training, &model, &self.sigmoid_config)?;
            write_sigmoid(&sigmoid_file(&training), &sigmoid)?;
        }
        Ok(runs)
    }

    fn archive_entries(&self, dir: &TrainingDirectory) -> Result<Vec<(String, PathBuf)>> {
        let classes = encoded_class_ids(dir)?;
        let mut entries = Vec::with_capacity(classes.len() * 2);
        for class_id in classes {
            let training = dir.file(&class_file_name(class_id));
            let model = model_file(&training);
            let sigmoid = sigmoid_file(&training);
            require_file(&model, "model")?;
            require_file(&sigmoid, "sigmoid")?;
            entries.push((model_entry(class_id), model));
            entries.push((sigmoid_entry(class_id), sigmoid));
        }
        Ok(entries)
    }

    fn unpackage_classifier(&mut self, reader: &mut ArchiveReader) -> Result<()> {
        let mut class_id = FIRST_CLASS_ID;
        while reader.peek_name().is_some() {
            let model = SvmLightModel::read(reader.next_entry(&model_entry(class_id))?.as_slice())?;
            let sigmoid = read_sigmoid(&reader.next_entry(&sigmoid_entry(class_id))?)?;
            self.loaded.insert(class_id, (model, sigmoid));
            class_id += 1;
        }
        if self.loaded.is_empty() {
            return Err(CleaverError::ArchiveFormat(
                "archive contains no one-vs-all models".into(),
            ));
        }
        Ok(())
    }

    fn new_classifier(self: Box<Self>, encoders: EncoderSet) -> Result<Box<dyn Classifier>> {
        if let Some(ids) = encoders.outcomes.class_ids() {
            if ids.len() != self.loaded.len() {
                return Err(CleaverError::ArchiveFormat(format!(
                    "{} classes encoded but {} models archived",
                    ids.len(),
                    self.loaded.len()
                )));
            }
        }
        Ok(Box::new(OneVsAllClassifier::new(
            encoders.features,
            encoders.outcomes,
            self.loaded,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &[u8] = b"SVM-light Version V6.02\n0\n3\n1\n1\n1\nempty\n1\n2\n2\n0\n1 1:1 #\n";
    const SIGMOID: &[u8] = br#"{"a":-1.0,"b":0.0}"#;

    fn entry(name: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        (name.to_owned(), bytes.to_vec())
    }

    #[test]
    fn test_unpackage_in_order() {
        let mut builder = OneVsAllSvmLightBuilder::default();
        let mut reader = ArchiveReader::from_entries(vec![
            entry("model-1", MODEL),
            entry("sigmoid-1", SIGMOID),
            entry("model-2", MODEL),
            entry("sigmoid-2", SIGMOID),
        ]);
        builder.unpackage_classifier(&mut reader).unwrap();
        assert_eq!(builder.loaded.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_unpackage_rejects_gap() {
        let mut builder = OneVsAllSvmLightBuilder::default();
        let mut reader = ArchiveReader::from_entries(vec![
            entry("model-1", MODEL),
            entry("sigmoid-1", SIGMOID),
            entry("model-3", MODEL),
            entry("sigmoid-3", SIGMOID),
        ]);
        let err = builder.unpackage_classifier(&mut reader).unwrap_err();
        assert_eq!(
            err.to_string(),
            "archive format error: expected next entry to be model-2, found model-3"
        );
    }

    #[test]
    fn test_unpackage_rejects_empty_model_set() {
        let mut builder = OneVsAllSvmLightBuilder::default();
        let err = builder
            .unpackage_classifier(&mut ArchiveReader::default())
            .unwrap_err();
        assert!(matches!(err, CleaverError::ArchiveFormat(_)));
    }
}
