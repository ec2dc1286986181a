//! # Cleaver
//!
//! Train, calibrate and package classifiers whose learning is done by
//! external tools (svm_light and GIS maxent trainers).
//!
//! [`cleaver_core`] holds the encoders, training-line formats, sigmoid
//! calibration and the loaded classifiers. [`cleaver_trainer`] writes
//! training directories, runs the trainers and reads and writes model
//! archives. This crate re-exports both.

pub use cleaver_core::*;
pub use cleaver_trainer::{
    ArchiveReader, ArchiveWriter, BuilderKind, ClassifierBuilder, DataWriter, Manifest,
    TrainerCommand, TrainerRun, TrainingDirectory, WriterConfig, load_classifier,
    load_classifier_from_path, package_classifier, train_classifier,
};

/// Re-export of the trainer crate for its submodules.
pub use cleaver_trainer as trainer;
