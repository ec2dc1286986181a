//! The manifest naming which builder produced an archive or training directory.
//!
//! Attribute syntax is one `Name: value` per line:
//!
//! ```text
//! Manifest-Version: 1.0
//! Format-Version: 1
//! Classifier-Builder: ova-svmlight
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};

use cleaver_core::{CleaverError, Result};

use crate::builder::BuilderKind;

/// Archive entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";
/// Manifest file name inside a training directory.
pub const MANIFEST_FILE: &str = "MANIFEST.MF";
/// Newest archive layout this crate reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_VERSION: &str = "Manifest-Version";
const FORMAT_VERSION_KEY: &str = "Format-Version";
const BUILDER_KEY: &str = "Classifier-Builder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Manifest {
    pub builder: BuilderKind,
    pub format_version: u32,
}

impl Manifest {
    pub fn new(builder: BuilderKind) -> Self {
        Self {
            builder,
            format_version: FORMAT_VERSION,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{MANIFEST_VERSION}: 1.0")?;
        writeln!(writer, "{FORMAT_VERSION_KEY}: {}", self.format_version)?;
        writeln!(writer, "{BUILDER_KEY}: {}", self.builder.tag())?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    /// # Errors
    ///
    /// [`CleaverError::ArchiveFormat`] if the builder attribute is missing or
    /// unknown, or the format version is missing, unparseable or too new.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut attributes = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| {
                CleaverError::ArchiveFormat(format!("bad manifest line {line:?}"))
            })?;
            attributes.insert(key.trim().to_owned(), value.trim().to_owned());
        }

        let tag = attributes.get(BUILDER_KEY).ok_or_else(|| {
            CleaverError::ArchiveFormat(format!("manifest has no {BUILDER_KEY} attribute"))
        })?;
        let builder = BuilderKind::from_tag(tag).ok_or_else(|| {
            CleaverError::ArchiveFormat(format!("unknown classifier builder {tag:?}"))
        })?;

        let version = attributes.get(FORMAT_VERSION_KEY).ok_or_else(|| {
            CleaverError::ArchiveFormat(format!("manifest has no {FORMAT_VERSION_KEY} attribute"))
        })?;
        let format_version: u32 = version.parse().map_err(|_| {
            CleaverError::ArchiveFormat(format!("bad {FORMAT_VERSION_KEY} {version:?}"))
        })?;
        if format_version > FORMAT_VERSION {
            return Err(CleaverError::ArchiveFormat(format!(
                "format version {format_version} is newer than supported version {FORMAT_VERSION}"
            )));
        }

        Ok(Self {
            builder,
            format_version,
        })
    }
}
