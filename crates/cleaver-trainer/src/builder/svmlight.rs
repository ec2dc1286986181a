//! Binary svm_light builder.
//!
//! Archive entries after the encoders: `model` (the svm_light model) and
//! `sigmoid` (the calibration pair as JSON).

use std::path::PathBuf;

use cleaver_core::encoder::EncoderSet;
use cleaver_core::model::SvmLightModel;
use cleaver_core::{Classifier, CleaverError, Result, Sigmoid, SigmoidConfig, SvmLightClassifier};

use super::{BuilderKind, ClassifierBuilder, model_file, require_file, sigmoid_file};
use crate::archive::ArchiveReader;
use crate::calibrate::{fit_sigmoid, read_sigmoid, write_sigmoid};
use crate::process::{TrainerCommand, TrainerRun};
use crate::writer::TrainingDirectory;

pub const TRAINING_FILE: &str = "training-data.svmlight";
pub const MODEL_ENTRY: &str = "model";
pub const SIGMOID_ENTRY: &str = "sigmoid";

#[derive(Debug, Default)]
pub struct SvmLightBuilder {
    sigmoid_config: SigmoidConfig,
    loaded: Option<(SvmLightModel, Sigmoid)>,
}

impl SvmLightBuilder {
    pub fn new(sigmoid_config: SigmoidConfig) -> Self {
        Self {
            sigmoid_config,
            loaded: None,
        }
    }
}

impl ClassifierBuilder for SvmLightBuilder {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Svmlight
    }

    fn train_classifier(&self, dir: &TrainingDirectory, args: &[String]) -> Result<Vec<TrainerRun>> {
        let command = TrainerCommand::from_args(self.kind().default_executable(), args)?;
        let training = dir.file(TRAINING_FILE);
        require_file(&training, "training data")?;

        let model = model_file(&training);
        let run = command.run(&training, &model)?;
        let sigmoid = fit_sigmoid(&training, &model, &self.sigmoid_config)?;
        write_sigmoid(&sigmoid_file(&training), &sigmoid)?;
        Ok(vec![run])
    }

    fn archive_entries(&self, dir: &TrainingDirectory) -> Result<Vec<(String, PathBuf)>> {
        let training = dir.file(TRAINING_FILE);
        let model = model_file(&training);
        let sigmoid = sigmoid_file(&training);
        require_file(&model, "model")?;
        require_file(&sigmoid, "sigmoid")?;
        Ok(vec![
            (MODEL_ENTRY.to_owned(), model),
            (SIGMOID_ENTRY.to_owned(), sigmoid),
        ])
    }

    fn unpackage_classifier(&mut self, reader: &mut ArchiveReader) -> Result<()> {
        let model = SvmLightModel::read(reader.next_entry(MODEL_ENTRY)?.as_slice())?;
        let sigmoid = read_sigmoid(&reader.next_entry(SIGMOID_ENTRY)?)?;
        self.loaded = Some((model, sigmoid));
        Ok(())
    }

    fn new_classifier(self: Box<Self>, encoders: EncoderSet) -> Result<Box<dyn Classifier>> {
        let (model, sigmoid) = self.loaded.ok_or_else(|| {
            CleaverError::ArchiveFormat("svm_light classifier was not unpackaged".into())
        })?;
        Ok(Box::new(SvmLightClassifier::new(
            encoders.features,
            encoders.outcomes,
            model,
            sigmoid,
        )))
    }
}
