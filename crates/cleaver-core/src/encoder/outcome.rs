//! Outcome encoding: domain outcomes to the token a trainer family expects.
//!
//! Each trainer family has exactly one convention:
//!
//! | encoder | domain | encoded |
//! |---|---|---|
//! | [`OutcomeEncoder::SignedBoolean`] | `true` / `false` | `+1` / `-1` |
//! | [`OutcomeEncoder::LiteralBoolean`] | `true` / `false` | `"true"` / `"false"` |
//! | [`OutcomeEncoder::Verbatim`] | label | the same label |
//! | [`OutcomeEncoder::ClassIds`] | label | first-seen class id |

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CleaverError, Result};
use crate::types::Outcome;

/// First class id handed out by [`ClassIds`].
pub const FIRST_CLASS_ID: u32 = 1;

/// An outcome in a trainer's encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EncodedOutcome {
    /// `+1` or `-1`.
    Signed(i8),
    /// A bare token.
    Literal(String),
    /// A one-vs-all class id.
    ClassId(u32),
}

impl fmt::Display for EncodedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(s) if *s > 0 => f.write_str("+1"),
            Self::Signed(_) => f.write_str("-1"),
            Self::Literal(token) => f.write_str(token),
            Self::ClassId(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ClassIdsRepr {
    labels: Vec<String>,
}

/// First-seen label to class id bijection. Ids start at [`FIRST_CLASS_ID`],
/// grow by one per new label and are never compacted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ClassIdsRepr", into = "ClassIdsRepr")]
pub struct ClassIds {
    ids: HashMap<String, u32>,
    labels: Vec<String>,
}

impl From<ClassIdsRepr> for ClassIds {
    fn from(repr: ClassIdsRepr) -> Self {
        let ids = repr
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), FIRST_CLASS_ID + i as u32))
            .collect();
        Self {
            ids,
            labels: repr.labels,
        }
    }
}

impl From<ClassIds> for ClassIdsRepr {
    fn from(ids: ClassIds) -> Self {
        Self { labels: ids.labels }
    }
}

impl ClassIds {
    pub fn id_or_insert(&mut self, label: &str) -> u32 {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = FIRST_CLASS_ID + self.labels.len() as u32;
        self.ids.insert(label.to_owned(), id);
        self.labels.push(label.to_owned());
        id
    }

    pub fn id(&self, label: &str) -> Option<u32> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        let offset = id.checked_sub(FIRST_CLASS_ID)?;
        self.labels.get(offset as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates `(id, label)` in increasing id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (FIRST_CLASS_ID + i as u32, label.as_str()))
    }
}

/// Bijective mapping between domain outcomes and encoded outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeEncoder {
    /// Boolean outcomes as `+1`/`-1` (SVMlight family).
    SignedBoolean,
    /// Boolean outcomes as `true`/`false` tokens (maxent family).
    LiteralBoolean,
    /// Label outcomes written as themselves (maxent family).
    Verbatim,
    /// Label outcomes as first-seen class ids (one-vs-all family).
    ClassIds(ClassIds),
}

impl OutcomeEncoder {
    /// Encodes `outcome`, registering new labels for [`OutcomeEncoder::ClassIds`].
    ///
    /// # Errors
    ///
    /// Returns [`CleaverError::InvalidOutcome`] if the outcome does not fit the
    /// convention, e.g. a label for a boolean encoder or a label containing whitespace.
    pub fn encode(&mut self, outcome: &Outcome) -> Result<EncodedOutcome> {
        if let (Self::ClassIds(ids), Outcome::Label(label)) = (&mut *self, outcome) {
            check_token(label)?;
            return Ok(EncodedOutcome::ClassId(ids.id_or_insert(label)));
        }
        self.lookup(outcome)
    }

    /// Checks that [`OutcomeEncoder::encode`] would accept `outcome`, without
    /// registering it.
    pub fn check(&self, outcome: &Outcome) -> Result<()> {
        match (self, outcome) {
            (Self::ClassIds(_), Outcome::Label(label)) => check_token(label),
            _ => self.lookup(outcome).map(drop),
        }
    }

    /// Encodes `outcome` without registering anything new.
    pub fn lookup(&self, outcome: &Outcome) -> Result<EncodedOutcome> {
        match (self, outcome) {
            (Self::SignedBoolean, Outcome::Bool(b)) => {
                Ok(EncodedOutcome::Signed(if *b { 1 } else { -1 }))
            }
            (Self::LiteralBoolean, Outcome::Bool(b)) => Ok(EncodedOutcome::Literal(b.to_string())),
            (Self::Verbatim, Outcome::Label(label)) => {
                check_token(label)?;
                Ok(EncodedOutcome::Literal(label.clone()))
            }
            (Self::ClassIds(ids), Outcome::Label(label)) => ids
                .id(label)
                .map(EncodedOutcome::ClassId)
                .ok_or_else(|| CleaverError::InvalidOutcome(format!("unknown label {label:?}"))),
            (encoder, outcome) => Err(CleaverError::InvalidOutcome(format!(
                "{} cannot encode {outcome:?}",
                encoder.name()
            ))),
        }
    }

    /// Exact inverse of [`OutcomeEncoder::encode`].
    pub fn decode(&self, encoded: &EncodedOutcome) -> Result<Outcome> {
        match (self, encoded) {
            (Self::SignedBoolean, EncodedOutcome::Signed(s)) => Ok(Outcome::Bool(*s > 0)),
            (Self::LiteralBoolean, EncodedOutcome::Literal(token)) => match token.as_str() {
                "true" => Ok(Outcome::Bool(true)),
                "false" => Ok(Outcome::Bool(false)),
                other => Err(CleaverError::InvalidOutcome(format!(
                    "expected true or false, found {other:?}"
                ))),
            },
            (Self::Verbatim, EncodedOutcome::Literal(token)) => Ok(Outcome::Label(token.clone())),
            (Self::ClassIds(ids), EncodedOutcome::ClassId(id)) => ids
                .label(*id)
                .map(|label| Outcome::Label(label.to_owned()))
                .ok_or_else(|| CleaverError::InvalidOutcome(format!("unknown class id {id}"))),
            (encoder, encoded) => Err(CleaverError::InvalidOutcome(format!(
                "{} cannot decode {encoded:?}",
                encoder.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedBoolean => "signed boolean encoder",
            Self::LiteralBoolean => "literal boolean encoder",
            Self::Verbatim => "verbatim encoder",
            Self::ClassIds(_) => "class id encoder",
        }
    }

    /// The class table, for the one-vs-all encoder.
    pub fn class_ids(&self) -> Option<&ClassIds> {
        match self {
            Self::ClassIds(ids) => Some(ids),
            _ => None,
        }
    }
}

fn check_token(label: &str) -> Result<()> {
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return Err(CleaverError::InvalidOutcome(format!(
            "label {label:?} cannot be written as a single token"
        )));
    }
    Ok(())
}
