//! Feature encoding: semantic features to sparse, vocabulary-indexed vectors.
//!
//! Encoding has two phases. While training, a [`FeatureEncoder`] grows its
//! [`VocabularyBuilder`] as new names appear. [`FeatureEncoder::finalize_feature_set`]
//! freezes it into a [`FrozenFeatureEncoder`], which ignores unseen names and
//! is what gets persisted next to the trained model.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::error::{CleaverError, Result};
use crate::types::{Feature, FeatureValue};
use crate::vector::SparseVector;

/// Name used for the entry emitted when an instance has no features.
pub const PLACEHOLDER_NAME: &str = "null";

/// A feature's numeric value, keeping whether it was integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(x) => x,
        }
    }
}

impl fmt::Display for Number {
    /// Integers print bare, floats always carry a fractional part (`3.0`, `1.234`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.fract() == 0.0 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Escapes characters that would break a whitespace/`:`/`=` delimited line.
pub fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_whitespace() || matches!(c, ':' | '=' | '%') {
            escaped.push_str(&format!("%U{:04X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Turns a feature into its encoded name and numeric value.
///
/// String and boolean values fold into the name with a value of `1.0`;
/// numeric values keep the feature name and carry the number.
///
/// # Errors
///
/// Returns [`CleaverError::NonFiniteValue`] for NaN or infinite floats.
pub fn name_number(feature: &Feature) -> Result<(String, Number)> {
    match &feature.value {
        FeatureValue::Str(s) => Ok((
            escape_name(&Feature::compose([feature.name.as_str(), s.as_str()])),
            Number::Float(1.0),
        )),
        FeatureValue::Bool(b) => Ok((
            escape_name(&Feature::compose([feature.name.as_str(), if *b { "true" } else { "false" }])),
            Number::Float(1.0),
        )),
        FeatureValue::Int(i) => Ok((escape_name(&feature.name), Number::Int(*i))),
        FeatureValue::Float(x) if x.is_finite() => Ok((escape_name(&feature.name), Number::Float(*x))),
        FeatureValue::Float(_) => Err(CleaverError::NonFiniteValue {
            feature: feature.name.clone(),
        }),
    }
}

/// Line order of a persisted lookup file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOrder {
    /// Order in which names were first seen.
    #[default]
    Insertion,
    /// Lexicographic by name.
    Sorted,
}

/// How features are keyed in name-value training lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStyle {
    /// Escaped feature names.
    #[default]
    Names,
    /// Vocabulary indices.
    Indices,
}

/// Mutable vocabulary grown during a training pass.
#[derive(Debug, Clone, Default)]
pub struct VocabularyBuilder {
    first_index: u32,
    indices: HashMap<String, u32>,
    names: Vec<String>,
}

impl VocabularyBuilder {
    /// Creates an empty builder whose first assigned index is `first_index`.
    pub fn new(first_index: u32) -> Self {
        Self {
            first_index,
            ..Self::default()
        }
    }

    /// Returns the index for `name`, assigning the next one if it is new.
    pub fn index_or_insert(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.first_index + self.names.len() as u32;
        self.indices.insert(name.to_owned(), index);
        self.names.push(name.to_owned());
        index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Freezes the builder. Indices are kept exactly as assigned.
    pub fn finish(self) -> Vocabulary {
        Vocabulary {
            first_index: self.first_index,
            indices: self.indices,
            names: self.names,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    first_index: u32,
    names: Vec<String>,
}

/// Immutable name to index bijection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct Vocabulary {
    first_index: u32,
    indices: HashMap<String, u32>,
    names: Vec<String>,
}

impl From<VocabularyRepr> for Vocabulary {
    fn from(repr: VocabularyRepr) -> Self {
        let indices = repr
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), repr.first_index + i as u32))
            .collect();
        Self {
            first_index: repr.first_index,
            indices,
            names: repr.names,
        }
    }
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(vocabulary: Vocabulary) -> Self {
        Self {
            first_index: vocabulary.first_index,
            names: vocabulary.names,
        }
    }
}

impl Vocabulary {
    pub fn index(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        let offset = index.checked_sub(self.first_index)?;
        self.names.get(offset as usize).map(String::as_str)
    }

    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates `(name, index)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), self.first_index + i as u32))
    }

    /// Writes the lookup file: a size header, then one `name\tindex` per line.
    ///
    /// `order` only changes line order; indices are the ones assigned during training.
    pub fn write_lookup<W: Write>(&self, mut writer: W, order: LookupOrder) -> Result<()> {
        let mut entries: Vec<(&str, u32)> = self.iter().collect();
        if order == LookupOrder::Sorted {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        writeln!(writer, "{}", entries.len())?;
        for (name, index) in entries {
            writeln!(writer, "{name}\t{index}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a lookup file written by [`Vocabulary::write_lookup`], in either order.
    ///
    /// # Errors
    ///
    /// Returns [`CleaverError::Configuration`] if the header is missing, the
    /// entry count disagrees with it, or the indices are not a contiguous run.
    pub fn read_lookup<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| CleaverError::Configuration("empty lookup file".into()))?;
        let expected: usize = header.trim().parse().map_err(|_| {
            CleaverError::Configuration(format!("bad lookup header: {header:?}"))
        })?;

        let mut entries = Vec::with_capacity(expected);
        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (name, index) = line.rsplit_once('\t').ok_or_else(|| {
                CleaverError::Configuration(format!("bad lookup line: {line:?}"))
            })?;
            let index: u32 = index.trim().parse().map_err(|_| {
                CleaverError::Configuration(format!("bad lookup index: {line:?}"))
            })?;
            entries.push((index, name.to_owned()));
        }
        if entries.len() != expected {
            return Err(CleaverError::Configuration(format!(
                "lookup header says {expected} entries, found {}",
                entries.len()
            )));
        }

        entries.sort_by_key(|(index, _)| *index);
        let first_index = entries.first().map_or(0, |(index, _)| *index);
        for (offset, (index, _)) in entries.iter().enumerate() {
            if *index != first_index + offset as u32 {
                return Err(CleaverError::Configuration(format!(
                    "lookup indices are not contiguous at {index}"
                )));
            }
        }
        Ok(VocabularyRepr {
            first_index,
            names: entries.into_iter().map(|(_, name)| name).collect(),
        }
        .into())
    }
}

/// One entry of an encoded vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeature {
    /// Vocabulary index; `None` only for the placeholder entry.
    pub index: Option<u32>,
    /// Escaped feature name.
    pub name: String,
    pub value: Number,
}

impl EncodedFeature {
    fn placeholder() -> Self {
        Self {
            index: None,
            name: PLACEHOLDER_NAME.to_owned(),
            value: Number::Int(0),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.index.is_none()
    }
}

/// The encoded form of one instance's features.
///
/// Duplicate names stay as separate entries in encounter order. An instance
/// with nothing to encode holds a single placeholder entry, so every instance
/// yields exactly one training line.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    entries: Vec<EncodedFeature>,
}

impl EncodedFeatureVector {
    fn from_entries(entries: Vec<EncodedFeature>) -> Self {
        if entries.is_empty() {
            Self {
                entries: vec![EncodedFeature::placeholder()],
            }
        } else {
            Self { entries }
        }
    }

    pub fn entries(&self) -> &[EncodedFeature] {
        &self.entries
    }

    pub fn is_placeholder(&self) -> bool {
        self.entries.iter().all(EncodedFeature::is_placeholder)
    }

    /// `(index, value)` pairs in encounter order, skipping the placeholder.
    pub fn indexed(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.index.map(|index| (index, e.value.as_f64())))
    }

    /// Collapses into a sparse vector, summing duplicate indices.
    pub fn to_sparse(&self) -> SparseVector {
        SparseVector::from_pairs(self.indexed())
    }
}

/// Growing encoder used while writing training data.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    vocabulary: VocabularyBuilder,
}

impl FeatureEncoder {
    /// Creates an encoder whose first vocabulary index is `first_index`.
    pub fn new(first_index: u32) -> Self {
        Self {
            vocabulary: VocabularyBuilder::new(first_index),
        }
    }

    /// Encodes `features`, adding unseen names to the vocabulary.
    ///
    /// Nothing is added to the vocabulary if any feature fails to encode.
    pub fn encode_all(&mut self, features: &[Feature]) -> Result<EncodedFeatureVector> {
        let pairs = features.iter().map(name_number).collect::<Result<Vec<_>>>()?;
        let entries = pairs
            .into_iter()
            .map(|(name, value)| EncodedFeature {
                index: Some(self.vocabulary.index_or_insert(&name)),
                name,
                value,
            })
            .collect();
        Ok(EncodedFeatureVector::from_entries(entries))
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Freezes the vocabulary. No name can be added afterwards.
    pub fn finalize_feature_set(self) -> FrozenFeatureEncoder {
        FrozenFeatureEncoder {
            vocabulary: self.vocabulary.finish(),
        }
    }
}

/// Read-only encoder used at classification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenFeatureEncoder {
    vocabulary: Vocabulary,
}

impl FrozenFeatureEncoder {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Encodes `features`; names outside the vocabulary are skipped.
    pub fn encode_all(&self, features: &[Feature]) -> Result<EncodedFeatureVector> {
        let mut entries = Vec::with_capacity(features.len());
        for feature in features {
            let (name, value) = name_number(feature)?;
            if let Some(index) = self.vocabulary.index(&name) {
                entries.push(EncodedFeature {
                    index: Some(index),
                    name,
                    value,
                });
            }
        }
        Ok(EncodedFeatureVector::from_entries(entries))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<Vec<Feature>> {
        vec![
            vec![
                Feature::new("pos", "NN"),
                Feature::new("distance", 3.0),
                Feature::new("precision", 1.234),
            ],
            vec![Feature::new("name", "2PO"), Feature::new("p's", 2)],
            vec![],
            vec![Feature::new("A_B", "AB")],
        ]
    }

    #[test]
    fn test_name_number() {
        let (name, value) = name_number(&Feature::new("pos", "NN")).unwrap();
        assert_eq!(name, "pos_NN");
        assert_eq!(value.to_string(), "1.0");

        let (name, value) = name_number(&Feature::new("p's", 2)).unwrap();
        assert_eq!(name, "p's");
        assert_eq!(value.to_string(), "2");

        let (name, value) = name_number(&Feature::new("precision", 1.234)).unwrap();
        assert_eq!(name, "precision");
        assert_eq!(value.to_string(), "1.234");

        let (name, _) = name_number(&Feature::new("cap", true)).unwrap();
        assert_eq!(name, "cap_true");

        let (name, _) = name_number(&Feature::new("", "hello")).unwrap();
        assert_eq!(name, "_hello");
    }

    #[test]
    fn test_large_integral_float_keeps_fraction() {
        assert_eq!(Number::Float(1e15).to_string(), "1000000000000000.0");
        assert_eq!(Number::Float(-2e16).to_string(), "-20000000000000000.0");
        assert_eq!(Number::Int(10_000_000_000_000_000).to_string(), "10000000000000000");
    }

    #[test]
    fn test_escaping() {
        let (name, _) = name_number(&Feature::new("word", "a b:c=d")).unwrap();
        assert_eq!(name, "word_a%U0020b%U003Ac%U003Dd");
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = name_number(&Feature::new("distance", f64::NAN)).unwrap_err();
        assert!(matches!(err, CleaverError::NonFiniteValue { .. }));

        let mut encoder = FeatureEncoder::new(1);
        let bad = [Feature::new("ok", "x"), Feature::new("inf", f64::INFINITY)];
        assert!(encoder.encode_all(&bad).is_err());
        assert_eq!(encoder.vocabulary_len(), 0);
    }

    #[test]
    fn test_growing_assigns_first_seen_indices() {
        let mut encoder = FeatureEncoder::new(1);
        for features in scenario() {
            encoder.encode_all(&features).unwrap();
        }
        let frozen = encoder.finalize_feature_set();
        let vocabulary = frozen.vocabulary();
        assert_eq!(vocabulary.len(), 6);
        assert_eq!(vocabulary.index("pos_NN"), Some(1));
        assert_eq!(vocabulary.index("A_B_AB"), Some(6));
        assert_eq!(vocabulary.name(3), Some("precision"));
        assert_eq!(vocabulary.name(0), None);
    }

    #[test]
    fn test_duplicates_are_appended() {
        let mut encoder = FeatureEncoder::new(0);
        let encoded = encoder
            .encode_all(&[Feature::new("w", 1.0), Feature::new("w", 2.0)])
            .unwrap();
        assert_eq!(encoded.entries().len(), 2);
        assert_eq!(encoder.vocabulary_len(), 1);
        assert_eq!(encoded.to_sparse().entries(), &[(0, 3.0)]);
    }

    #[test]
    fn test_empty_instance_yields_placeholder() {
        let mut encoder = FeatureEncoder::new(1);
        let encoded = encoder.encode_all(&[]).unwrap();
        assert!(encoded.is_placeholder());
        assert_eq!(encoded.entries()[0].name, PLACEHOLDER_NAME);
        assert_eq!(encoded.indexed().count(), 0);
    }

    #[test]
    fn test_freeze_invariant() {
        let mut encoder = FeatureEncoder::new(1);
        for features in scenario() {
            encoder.encode_all(&features).unwrap();
        }
        let frozen = encoder.finalize_feature_set();
        let before = frozen.vocabulary().len();

        let encoded = frozen
            .encode_all(&[Feature::new("pos", "VB"), Feature::new("distance", 1.5)])
            .unwrap();
        assert_eq!(frozen.vocabulary().len(), before);
        assert_eq!(encoded.entries().len(), 1);
        assert_eq!(encoded.entries()[0].index, Some(2));

        let unseen = frozen.encode_all(&[Feature::new("novel", "x")]).unwrap();
        assert!(unseen.is_placeholder());
    }

    #[test]
    fn test_lookup_sorted_order() {
        let mut encoder = FeatureEncoder::new(0);
        for features in scenario() {
            encoder.encode_all(&features).unwrap();
        }
        let vocabulary = encoder.finalize_feature_set().vocabulary().clone();

        let mut out = Vec::new();
        vocabulary.write_lookup(&mut out, LookupOrder::Sorted).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "6");
        assert_eq!(
            &lines[1..],
            &[
                "A_B_AB\t5",
                "distance\t1",
                "name_2PO\t3",
                "p's\t4",
                "pos_NN\t0",
                "precision\t2",
            ]
        );

        let back = Vocabulary::read_lookup(text.as_bytes()).unwrap();
        assert_eq!(back, vocabulary);
    }

    #[test]
    fn test_lookup_rejects_bad_header() {
        let err = Vocabulary::read_lookup("3\na\t0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CleaverError::Configuration(_)));
    }

    #[test]
    fn test_frozen_serde_roundtrip() {
        let mut encoder = FeatureEncoder::new(1);
        encoder.encode_all(&[Feature::new("pos", "NN")]).unwrap();
        let frozen = encoder.finalize_feature_set();
        let json = serde_json::to_string(&frozen).unwrap();
        let back: FrozenFeatureEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frozen);
        assert_eq!(back.vocabulary().index("pos_NN"), Some(1));
    }
}
