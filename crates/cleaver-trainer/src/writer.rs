//! Writing labeled instances as trainer input.
//!
//! A [`DataWriter`] owns its output files and encoders for one training pass.
//! [`DataWriter::finish`] consumes it, so nothing can be packaged while its
//! files are still open.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cleaver_core::encoder::{EncoderSet, FeatureEncoder, KeyStyle, LookupOrder, OutcomeEncoder};
use cleaver_core::format::{indexed_body, write_indexed_line, write_name_value_line};
use cleaver_core::{CleaverError, EncodedOutcome, Instance, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::builder::BuilderKind;
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::one_vs_all::{OneVsAllLog, remove_class_files};

/// Persisted feature and outcome encoders.
pub const ENCODERS_FILE: &str = "encoders.json";
/// Persisted vocabulary lookup.
pub const LOOKUP_FILE: &str = "features-lookup.txt";

/// Options for a [`DataWriter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Key name-value lines by vocabulary index instead of feature name.
    /// Indexed formats always use indices.
    pub compress: bool,
    /// Line order of the lookup file.
    pub lookup_order: LookupOrder,
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_lookup_order(mut self, lookup_order: LookupOrder) -> Self {
        self.lookup_order = lookup_order;
        self
    }

    fn keys(&self) -> KeyStyle {
        if self.compress {
            KeyStyle::Indices
        } else {
            KeyStyle::Names
        }
    }
}

enum Sink {
    Indexed(BufWriter<File>),
    NameValue(BufWriter<File>),
    OneVsAll(OneVsAllLog),
}

/// Encodes instances and appends them to the training file(s) of one builder kind.
pub struct DataWriter {
    dir: PathBuf,
    kind: BuilderKind,
    config: WriterConfig,
    features: FeatureEncoder,
    outcomes: OutcomeEncoder,
    sink: Sink,
    written: usize,
}

impl DataWriter {
    /// Creates `dir` if needed and opens the training output for `kind`.
    pub fn create<P: AsRef<Path>>(dir: P, kind: BuilderKind, config: WriterConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            CleaverError::Configuration(format!("cannot create {}: {e}", dir.display()))
        })?;

        let sink = match kind.training_file() {
            None => {
                let removed = remove_class_files(&dir)?;
                if removed > 0 {
                    info!(dir = %dir.display(), removed, "removed per-class files from an earlier pass");
                }
                Sink::OneVsAll(OneVsAllLog::new())
            }
            Some(name) => {
                let file = BufWriter::new(File::create(dir.join(name))?);
                if kind.is_indexed() {
                    Sink::Indexed(file)
                } else {
                    Sink::NameValue(file)
                }
            }
        };

        Ok(Self {
            features: FeatureEncoder::new(kind.first_index()),
            outcomes: kind.outcome_encoder(),
            dir,
            kind,
            config,
            sink,
            written: 0,
        })
    }

    /// Encodes and appends one instance.
    ///
    /// # Errors
    ///
    /// [`CleaverError::Data`] naming the instance's zero-based ordinal if its
    /// outcome is missing or does not fit the kind, or a feature value is not finite.
    pub fn write(&mut self, instance: &Instance) -> Result<()> {
        let ordinal = self.written;
        let outcome = instance.outcome.as_ref().ok_or_else(|| CleaverError::Data {
            instance: ordinal,
            reason: "training instance has no outcome".into(),
        })?;
        // both checks run before either encoder grows
        self.outcomes
            .check(outcome)
            .map_err(|e| e.at_instance(ordinal))?;
        let vector = self
            .features
            .encode_all(&instance.features)
            .map_err(|e| e.at_instance(ordinal))?;
        let encoded = self
            .outcomes
            .encode(outcome)
            .map_err(|e| e.at_instance(ordinal))?;

        match &mut self.sink {
            Sink::Indexed(out) => write_indexed_line(out, &encoded, &vector)?,
            Sink::NameValue(out) => write_name_value_line(out, &encoded, &vector, self.config.keys())?,
            Sink::OneVsAll(log) => match encoded {
                EncodedOutcome::ClassId(id) => log.append(id, indexed_body(&vector)),
                other => {
                    return Err(CleaverError::Data {
                        instance: ordinal,
                        reason: format!("expected a class id, found {other}"),
                    });
                }
            },
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, instances: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        for instance in instances {
            self.write(instance)?;
        }
        Ok(())
    }

    /// Instances written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Closes the training files, freezes the vocabulary and persists the
    /// encoders, lookup and manifest, in that order.
    pub fn finish(self) -> Result<TrainingDirectory> {
        match self.sink {
            Sink::Indexed(mut out) | Sink::NameValue(mut out) => out.flush()?,
            Sink::OneVsAll(log) => {
                log.materialize(&self.dir)?;
            }
        }

        let features = self.features.finalize_feature_set();
        features
            .vocabulary()
            .write_lookup(BufWriter::new(File::create(self.dir.join(LOOKUP_FILE))?), self.config.lookup_order)?;

        let encoders = EncoderSet {
            features,
            outcomes: self.outcomes,
            keys: self.config.keys(),
        };
        let mut out = BufWriter::new(File::create(self.dir.join(ENCODERS_FILE))?);
        serde_json::to_writer_pretty(&mut out, &encoders)?;
        out.flush()?;

        Manifest::new(self.kind).write(BufWriter::new(File::create(self.dir.join(MANIFEST_FILE))?))?;

        info!(
            dir = %self.dir.display(),
            kind = %self.kind,
            instances = self.written,
            features = encoders.features.vocabulary().len(),
            "finished writing training data"
        );
        Ok(TrainingDirectory {
            path: self.dir,
            kind: self.kind,
        })
    }
}

/// A directory holding finished training data for one builder kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingDirectory {
    path: PathBuf,
    kind: BuilderKind,
}

impl TrainingDirectory {
    /// Reopens a directory written by [`DataWriter::finish`].
    ///
    /// # Errors
    ///
    /// [`CleaverError::Configuration`] if the directory has no manifest;
    /// [`CleaverError::ArchiveFormat`] if the manifest is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest_path = path.join(MANIFEST_FILE);
        let file = File::open(&manifest_path).map_err(|e| {
            CleaverError::Configuration(format!(
                "{} is not a training directory: {e}",
                path.display()
            ))
        })?;
        let manifest = Manifest::read(BufReader::new(file))?;
        Ok(Self {
            path,
            kind: manifest.builder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> BuilderKind {
        self.kind
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn load_encoders(&self) -> Result<EncoderSet> {
        let file = File::open(self.file(ENCODERS_FILE))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
