//! GIS maxent builders, boolean and string outcome.
//!
//! Training lines use the name-value format with the outcome token last. The
//! trainer writes a plain-text GIS model, which carries its own probabilities,
//! so there is no calibration step. Archive entry after the encoders: `model`.

use std::path::PathBuf;

use cleaver_core::encoder::EncoderSet;
use cleaver_core::model::GisModel;
use cleaver_core::{Classifier, CleaverError, MaxentClassifier, Result};

use super::{BuilderKind, ClassifierBuilder, model_file, require_file};
use crate::archive::ArchiveReader;
use crate::process::{TrainerCommand, TrainerRun};
use crate::writer::TrainingDirectory;

pub const TRAINING_FILE: &str = "training-data.maxent";
pub const MODEL_ENTRY: &str = "model";

#[derive(Debug)]
pub struct MaxentBuilder {
    kind: BuilderKind,
    loaded: Option<GisModel>,
}

impl MaxentBuilder {
    pub fn new(kind: BuilderKind) -> Self {
        Self { kind, loaded: None }
    }
}

impl ClassifierBuilder for MaxentBuilder {
    fn kind(&self) -> BuilderKind {
        self.kind
    }

    fn train_classifier(&self, dir: &TrainingDirectory, args: &[String]) -> Result<Vec<TrainerRun>> {
        let command = TrainerCommand::from_args(self.kind.default_executable(), args)?;
        let training = dir.file(TRAINING_FILE);
        require_file(&training, "training data")?;
        Ok(vec![command.run(&training, &model_file(&training))?])
    }

    fn archive_entries(&self, dir: &TrainingDirectory) -> Result<Vec<(String, PathBuf)>> {
        let model = model_file(&dir.file(TRAINING_FILE));
        require_file(&model, "model")?;
        Ok(vec![(MODEL_ENTRY.to_owned(), model)])
    }

    fn unpackage_classifier(&mut self, reader: &mut ArchiveReader) -> Result<()> {
        self.loaded = Some(GisModel::read(reader.next_entry(MODEL_ENTRY)?.as_slice())?);
        Ok(())
    }

    fn new_classifier(self: Box<Self>, encoders: EncoderSet) -> Result<Box<dyn Classifier>> {
        let model = self.loaded.ok_or_else(|| {
            CleaverError::ArchiveFormat("maxent classifier was not unpackaged".into())
        })?;
        Ok(Box::new(MaxentClassifier::new(
            encoders.features,
            encoders.outcomes,
            encoders.keys,
            model,
        )))
    }
}
