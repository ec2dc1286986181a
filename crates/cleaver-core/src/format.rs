//! Training-data line formats.
//!
//! Two textual families are supported:
//!
//! - **indexed** (SVMlight): `<outcome> <index>:<value> ...`, entries ordered
//!   by index, values printed with seven decimals.
//! - **name-value**: `<key>:<value> ... <outcome>`, entries in encounter
//!   order, outcome last, keys being names or indices.
//!
//! Both emit exactly one line per instance. The placeholder entry of a
//! feature-less instance renders as `null:0` in the name-value family and as a
//! bare outcome token in the indexed family.

use std::fmt::Write as _;
use std::io::Write;

use crate::encoder::{EncodedFeatureVector, EncodedOutcome, KeyStyle};
use crate::error::{CleaverError, Result};
use crate::vector::SparseVector;

/// Formats the feature part of an indexed line, each entry with a leading space.
///
/// Entries are stable-sorted by index so duplicates keep their relative order.
pub fn indexed_body(vector: &EncodedFeatureVector) -> String {
    let mut pairs: Vec<(u32, f64)> = vector.indexed().collect();
    pairs.sort_by_key(|&(index, _)| index);

    let mut body = String::with_capacity(pairs.len() * 12);
    for (index, value) in pairs {
        let _ = write!(body, " {index}:{value:.7}");
    }
    body
}

/// Writes `<outcome><body>` followed by a newline.
pub fn write_indexed_line<W: Write>(
    writer: &mut W,
    outcome: &EncodedOutcome,
    vector: &EncodedFeatureVector,
) -> Result<()> {
    writeln!(writer, "{outcome}{}", indexed_body(vector))?;
    Ok(())
}

/// Formats the feature part of a name-value line, space separated.
pub fn name_value_body(vector: &EncodedFeatureVector, keys: KeyStyle) -> String {
    let mut body = String::new();
    for (i, entry) in vector.entries().iter().enumerate() {
        if i > 0 {
            body.push(' ');
        }
        match (keys, entry.index) {
            (KeyStyle::Indices, Some(index)) => {
                let _ = write!(body, "{index}:{}", entry.value);
            }
            _ => {
                let _ = write!(body, "{}:{}", entry.name, entry.value);
            }
        }
    }
    body
}

/// Writes `<body> <outcome>` followed by a newline.
pub fn write_name_value_line<W: Write>(
    writer: &mut W,
    outcome: &EncodedOutcome,
    vector: &EncodedFeatureVector,
    keys: KeyStyle,
) -> Result<()> {
    writeln!(writer, "{} {outcome}", name_value_body(vector, keys))?;
    Ok(())
}

/// A parsed indexed training line.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedLine {
    /// `Some(true)` for `+1`, `Some(false)` for `-1`, `None` for an unlabeled `0`.
    pub label: Option<bool>,
    pub vector: SparseVector,
}

/// Parses one indexed line. Anything after `#` is ignored.
///
/// # Errors
///
/// Returns [`CleaverError::Configuration`] for an empty line, an unknown
/// label token or a malformed `index:value` pair.
pub fn parse_indexed_line(line: &str) -> Result<IndexedLine> {
    let content = line.split('#').next().unwrap_or_default();
    let mut tokens = content.split_whitespace();
    let label = match tokens.next() {
        Some("+1" | "1") => Some(true),
        Some("-1") => Some(false),
        Some("0") => None,
        Some(other) => {
            return Err(CleaverError::Configuration(format!(
                "unknown label token {other:?} in training line"
            )));
        }
        None => {
            return Err(CleaverError::Configuration("empty training line".into()));
        }
    };

    let mut pairs = Vec::new();
    for token in tokens {
        let pair = token.split_once(':').and_then(|(index, value)| {
            Some((index.parse::<u32>().ok()?, value.parse::<f64>().ok()?))
        });
        match pair {
            Some(pair) => pairs.push(pair),
            None => {
                return Err(CleaverError::Configuration(format!(
                    "malformed feature {token:?} in training line"
                )));
            }
        }
    }
    Ok(IndexedLine {
        label,
        vector: SparseVector::from_pairs(pairs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FeatureEncoder;
    use crate::types::Feature;

    fn encode(features: &[Feature]) -> EncodedFeatureVector {
        FeatureEncoder::new(1).encode_all(features).unwrap()
    }

    #[test]
    fn test_indexed_line() {
        let mut encoder = FeatureEncoder::new(1);
        encoder.encode_all(&[Feature::new("b", 1)]).unwrap();
        let vector = encoder
            .encode_all(&[Feature::new("a", 0.5), Feature::new("b", 2)])
            .unwrap();

        let mut out = Vec::new();
        write_indexed_line(&mut out, &EncodedOutcome::Signed(1), &vector).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+1 1:2.0000000 2:0.5000000\n"
        );
    }

    #[test]
    fn test_indexed_placeholder_is_bare_outcome() {
        let mut out = Vec::new();
        write_indexed_line(&mut out, &EncodedOutcome::Signed(-1), &encode(&[])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-1\n");
    }

    #[test]
    fn test_name_value_line() {
        let vector = encode(&[
            Feature::new("pos", "NN"),
            Feature::new("distance", 3.0),
            Feature::new("precision", 1.234),
        ]);
        let outcome = EncodedOutcome::Literal("true".into());

        let mut out = Vec::new();
        write_name_value_line(&mut out, &outcome, &vector, KeyStyle::Names).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "pos_NN:1.0 distance:3.0 precision:1.234 true\n"
        );

        let mut out = Vec::new();
        write_name_value_line(&mut out, &outcome, &vector, KeyStyle::Indices).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1:1.0 2:3.0 3:1.234 true\n");

        let mut out = Vec::new();
        write_name_value_line(&mut out, &outcome, &encode(&[]), KeyStyle::Indices).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "null:0 true\n");
    }

    #[test]
    fn test_parse_indexed_line() {
        let line = parse_indexed_line("+1 3:0.5000000 1:2.0 # comment").unwrap();
        assert_eq!(line.label, Some(true));
        assert_eq!(line.vector.entries(), &[(1, 2.0), (3, 0.5)]);

        assert_eq!(parse_indexed_line("-1").unwrap().label, Some(false));
        assert_eq!(parse_indexed_line("0 1:1").unwrap().label, None);
        assert!(parse_indexed_line("maybe 1:1").is_err());
        assert!(parse_indexed_line("+1 x:1").is_err());
        assert!(parse_indexed_line("").is_err());
    }
}
