//! # Cleaver Trainer
//!
//! The training half of Cleaver: writes encoded instances in the formats the
//! external trainers read, runs those trainers, calibrates their margins and
//! packages the result into a self-describing model archive that
//! [`load_classifier`] turns back into a [`cleaver_core::Classifier`].
//!
//! ```no_run
//! use cleaver_core::{Feature, Instance};
//! use cleaver_trainer::{BuilderKind, DataWriter, WriterConfig};
//!
//! # fn main() -> cleaver_core::Result<()> {
//! let mut writer = DataWriter::create("out", BuilderKind::Svmlight, WriterConfig::default())?;
//! writer.write(&Instance::labeled(vec![Feature::new("pos", "NN")], true))?;
//! writer.write(&Instance::labeled(vec![Feature::new("pos", "VB")], false))?;
//! let dir = writer.finish()?;
//!
//! cleaver_trainer::train_classifier(&dir, &[], &Default::default())?;
//! let archive = cleaver_trainer::package_classifier(&dir)?;
//! let classifier = cleaver_trainer::load_classifier_from_path(&archive)?;
//! let outcome = classifier.classify(&[Feature::new("pos", "NN")])?;
//! # Ok(())
//! # }
//! ```
pub mod archive;
pub mod builder;
pub mod calibrate;
pub mod manifest;
pub mod one_vs_all;
pub mod process;
pub mod writer;

pub use archive::{ArchiveReader, ArchiveWriter};
pub use builder::{
    BuilderKind, ClassifierBuilder, load_classifier, load_classifier_from_path,
    package_classifier, train_classifier,
};
pub use manifest::Manifest;
pub use process::{TrainerCommand, TrainerRun};
pub use writer::{DataWriter, TrainingDirectory, WriterConfig};
