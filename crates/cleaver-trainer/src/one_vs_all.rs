//! One-vs-all decomposition of a multiclass training stream.
//!
//! Rows are kept as `(class id, formatted features)` while instances arrive.
//! Classes are discovered from the label stream; nothing is written per class
//! until [`OneVsAllLog::materialize`], which emits one binary file per class
//! with `+1` for the class's own rows and `-1` for every other row, in the
//! original row order. Training and packaging then walk the class ids
//! recorded in the encoders, never a directory listing.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use cleaver_core::{CleaverError, Result};
use regex::Regex;

/// Per-class training file name.
pub fn class_file_name(class_id: u32) -> String {
    format!("training-data-{class_id}.svmlight")
}

/// Removes per-class training files, and the models and sigmoids trained
/// from them, left in `dir` by an earlier pass. Returns how many were removed.
pub fn remove_class_files(dir: &Path) -> Result<usize> {
    let pattern = Regex::new(r"^training-data-\d+\.svmlight(\.model|\.sigmoid)?$")
        .map_err(|e| CleaverError::Configuration(e.to_string()))?;
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| pattern.is_match(n)) && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Buffered rows awaiting per-class materialization.
#[derive(Debug, Default)]
pub struct OneVsAllLog {
    rows: Vec<(u32, String)>,
    classes: BTreeSet<u32>,
}

impl OneVsAllLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a row. `body` is the formatted feature part of an indexed line.
    pub fn append(&mut self, class_id: u32, body: String) {
        self.classes.insert(class_id);
        self.rows.push((class_id, body));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.classes.iter().copied()
    }

    /// Writes one binary training file per class into `dir`.
    pub fn materialize(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.classes.len());
        for class_id in self.class_ids() {
            let path = dir.join(class_file_name(class_id));
            let mut out = BufWriter::new(File::create(&path)?);
            for (row_class, body) in &self.rows {
                let label = if *row_class == class_id { "+1" } else { "-1" };
                writeln!(out, "{label}{body}")?;
            }
            out.flush()?;
            paths.push(path);
        }
        Ok(paths)
    }
}
