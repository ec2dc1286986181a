//! Classifier builders: train, package and reload each supported kind.
//!
//! The set of kinds is closed. An archive's manifest stores a kind's tag and
//! [`load_classifier`] maps it back to the builder that knows how to read the
//! rest of the archive.
//!
//! Archive layout, in order:
//!
//! 1. `META-INF/MANIFEST.MF`
//! 2. `encoders.json`
//! 3. the kind's own entries (see each builder)

pub mod maxent;
pub mod one_vs_all;
pub mod svmlight;

use std::fmt;
use std::path::{Path, PathBuf};

use cleaver_core::encoder::{ClassIds, EncoderSet, OutcomeEncoder};
use cleaver_core::{Classifier, CleaverError, Result, SigmoidConfig};
use tracing::info;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::manifest::{MANIFEST_ENTRY, Manifest};
use crate::process::TrainerRun;
use crate::writer::{ENCODERS_FILE, TrainingDirectory};

pub use maxent::MaxentBuilder;
pub use one_vs_all::OneVsAllSvmLightBuilder;
pub use svmlight::SvmLightBuilder;

/// Archive file written by [`package_classifier`].
pub const ARCHIVE_FILE: &str = "model.zip";

/// The supported classifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderKind {
    /// Binary svm_light with one sigmoid.
    Svmlight,
    /// One binary svm_light model and sigmoid per class.
    OneVsAllSvmlight,
    /// Binary GIS maxent over `true`/`false` tokens.
    MaxentBoolean,
    /// Multiclass GIS maxent over label tokens.
    MaxentString,
}

impl BuilderKind {
    pub const ALL: [BuilderKind; 4] = [
        Self::Svmlight,
        Self::OneVsAllSvmlight,
        Self::MaxentBoolean,
        Self::MaxentString,
    ];

    /// Tag stored in manifests.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Svmlight => "svmlight",
            Self::OneVsAllSvmlight => "ova-svmlight",
            Self::MaxentBoolean => "maxent-boolean",
            Self::MaxentString => "maxent-string",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Whether training lines use the indexed (svm_light) format.
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Svmlight | Self::OneVsAllSvmlight)
    }

    /// First vocabulary index. svm_light rejects index 0.
    pub fn first_index(self) -> u32 {
        if self.is_indexed() { 1 } else { 0 }
    }

    /// A fresh outcome encoder following this kind's convention.
    pub fn outcome_encoder(self) -> OutcomeEncoder {
        match self {
            Self::Svmlight => OutcomeEncoder::SignedBoolean,
            Self::OneVsAllSvmlight => OutcomeEncoder::ClassIds(ClassIds::default()),
            Self::MaxentBoolean => OutcomeEncoder::LiteralBoolean,
            Self::MaxentString => OutcomeEncoder::Verbatim,
        }
    }

    /// Training file for single-stream kinds.
    pub fn training_file(self) -> Option<&'static str> {
        match self {
            Self::Svmlight => Some(svmlight::TRAINING_FILE),
            Self::OneVsAllSvmlight => None,
            Self::MaxentBoolean | Self::MaxentString => Some(maxent::TRAINING_FILE),
        }
    }

    pub fn default_executable(self) -> &'static str {
        match self {
            Self::Svmlight | Self::OneVsAllSvmlight => "svm_learn",
            Self::MaxentBoolean | Self::MaxentString => "maxent_train",
        }
    }

    /// Whether `outcomes` follows this kind's convention.
    pub fn accepts(self, outcomes: &OutcomeEncoder) -> bool {
        matches!(
            (self, outcomes),
            (Self::Svmlight, OutcomeEncoder::SignedBoolean)
                | (Self::OneVsAllSvmlight, OutcomeEncoder::ClassIds(_))
                | (Self::MaxentBoolean, OutcomeEncoder::LiteralBoolean)
                | (Self::MaxentString, OutcomeEncoder::Verbatim)
        )
    }

    pub fn new_builder(self, sigmoid: SigmoidConfig) -> Box<dyn ClassifierBuilder> {
        match self {
            Self::Svmlight => Box::new(SvmLightBuilder::new(sigmoid)),
            Self::OneVsAllSvmlight => Box::new(OneVsAllSvmLightBuilder::new(sigmoid)),
            Self::MaxentBoolean | Self::MaxentString => Box::new(MaxentBuilder::new(self)),
        }
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Trains, packages and reconstructs one kind of classifier.
///
/// Training works on a finished [`TrainingDirectory`]. Loading reads the
/// kind's archive entries into the builder, which then assembles the
/// [`Classifier`].
pub trait ClassifierBuilder {
    fn kind(&self) -> BuilderKind;

    /// Runs the external trainer(s) and any calibration inside `dir`.
    fn train_classifier(&self, dir: &TrainingDirectory, args: &[String]) -> Result<Vec<TrainerRun>>;

    /// Kind-specific `(entry name, file)` pairs, in archive order.
    fn archive_entries(&self, dir: &TrainingDirectory) -> Result<Vec<(String, PathBuf)>>;

    /// Reads the kind-specific entries, in the order they were written.
    fn unpackage_classifier(&mut self, reader: &mut ArchiveReader) -> Result<()>;

    /// Wires the loaded pieces into a classifier.
    fn new_classifier(self: Box<Self>, encoders: EncoderSet) -> Result<Box<dyn Classifier>>;
}

/// Trains the classifier for `dir` with the builder named in its manifest.
pub fn train_classifier(
    dir: &TrainingDirectory,
    args: &[String],
    sigmoid: &SigmoidConfig,
) -> Result<Vec<TrainerRun>> {
    let builder = dir.kind().new_builder(sigmoid.clone());
    builder.train_classifier(dir, args)
}

/// Packages a trained directory into `<dir>/model.zip` and returns its path.
pub fn package_classifier(dir: &TrainingDirectory) -> Result<PathBuf> {
    let builder = dir.kind().new_builder(SigmoidConfig::default());
    let entries = builder.archive_entries(dir)?;
    let path = dir.file(ARCHIVE_FILE);

    let mut archive = ArchiveWriter::create(&path)?;
    archive.add_bytes(MANIFEST_ENTRY, &Manifest::new(dir.kind()).to_bytes()?)?;
    archive.add_file(ENCODERS_FILE, dir.file(ENCODERS_FILE))?;
    for (name, file) in &entries {
        archive.add_file(name, file)?;
    }
    archive.finish()?;

    info!(archive = %path.display(), kind = %dir.kind(), entries = entries.len() + 2, "packaged classifier");
    Ok(path)
}

/// Rebuilds a classifier from an archive, selecting the builder by manifest.
pub fn load_classifier(reader: &mut ArchiveReader) -> Result<Box<dyn Classifier>> {
    let manifest = Manifest::read(reader.next_entry(MANIFEST_ENTRY)?.as_slice())?;
    let encoders: EncoderSet = serde_json::from_slice(&reader.next_entry(ENCODERS_FILE)?)?;
    if !manifest.builder.accepts(&encoders.outcomes) {
        return Err(CleaverError::ArchiveFormat(format!(
            "{} archive holds a {}",
            manifest.builder,
            encoders.outcomes.name()
        )));
    }

    let mut builder = manifest.builder.new_builder(SigmoidConfig::default());
    builder.unpackage_classifier(reader)?;
    if let Some(extra) = reader.peek_name() {
        return Err(CleaverError::ArchiveFormat(format!(
            "unexpected entry {extra} after {} entries",
            manifest.builder
        )));
    }
    info!(kind = %manifest.builder, "loaded classifier");
    builder.new_classifier(encoders)
}

/// Opens the archive at `path` and loads it.
pub fn load_classifier_from_path<P: AsRef<Path>>(path: P) -> Result<Box<dyn Classifier>> {
    load_classifier(&mut ArchiveReader::open(path)?)
}

/// Model file the trainer writes next to `training_file`.
pub(crate) fn model_file(training_file: &Path) -> PathBuf {
    with_suffix(training_file, ".model")
}

/// Sigmoid file written next to `training_file` after calibration.
pub(crate) fn sigmoid_file(training_file: &Path) -> PathBuf {
    with_suffix(training_file, ".sigmoid")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub(crate) fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CleaverError::Configuration(format!(
            "missing {what} {}; was the classifier trained?",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleaver_core::encoder::{FeatureEncoder, KeyStyle};

    #[test]
    fn test_tags_roundtrip() {
        for kind in BuilderKind::ALL {
            assert_eq!(BuilderKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.new_builder(SigmoidConfig::default()).kind(), kind);
        }
        assert_eq!(BuilderKind::from_tag("liblinear"), None);
    }

    #[test]
    fn test_conventions_per_family() {
        assert_eq!(BuilderKind::Svmlight.outcome_encoder(), OutcomeEncoder::SignedBoolean);
        assert_eq!(BuilderKind::MaxentBoolean.outcome_encoder(), OutcomeEncoder::LiteralBoolean);
        assert_eq!(BuilderKind::Svmlight.first_index(), 1);
        assert_eq!(BuilderKind::MaxentString.first_index(), 0);
    }

    #[test]
    fn test_every_kind_accepts_its_own_encoder() {
        for kind in BuilderKind::ALL {
            assert!(kind.accepts(&kind.outcome_encoder()));
            for other in BuilderKind::ALL.into_iter().filter(|&k| k != kind) {
                assert!(!kind.accepts(&other.outcome_encoder()), "{kind} accepted {other}");
            }
        }
    }

    #[test]
    fn test_load_rejects_mismatched_encoders() {
        let encoders = EncoderSet {
            features: FeatureEncoder::new(1).finalize_feature_set(),
            outcomes: BuilderKind::MaxentString.outcome_encoder(),
            keys: KeyStyle::Names,
        };
        let mut reader = ArchiveReader::from_entries(vec![
            (
                MANIFEST_ENTRY.into(),
                Manifest::new(BuilderKind::Svmlight).to_bytes().unwrap(),
            ),
            (ENCODERS_FILE.into(), serde_json::to_vec(&encoders).unwrap()),
            ("model".into(), Vec::new()),
            ("sigmoid".into(), Vec::new()),
        ]);
        let err = load_classifier(&mut reader).err().unwrap();
        assert!(matches!(err, CleaverError::ArchiveFormat(_)));
        assert_eq!(
            err.to_string(),
            "archive format error: svmlight archive holds a verbatim encoder"
        );
    }

    #[test]
    fn test_file_suffixes() {
        let training = Path::new("/tmp/x/training-data-3.svmlight");
        assert_eq!(model_file(training), Path::new("/tmp/x/training-data-3.svmlight.model"));
        assert_eq!(sigmoid_file(training), Path::new("/tmp/x/training-data-3.svmlight.sigmoid"));
    }

    #[test]
    fn test_load_rejects_wrong_first_entry() {
        let mut reader = ArchiveReader::from_entries(vec![("encoders.json".into(), b"{}".to_vec())]);
        let err = load_classifier(&mut reader).err().unwrap();
        assert!(err.to_string().contains("expected next entry to be META-INF/MANIFEST.MF"));
    }
}
