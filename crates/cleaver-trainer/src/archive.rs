//! Model archive container.
//!
//! Archives are zip files whose entry order is part of the format: readers
//! consume entries strictly in the order they were written and name the
//! entry they expect next.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use cleaver_core::{CleaverError, Result};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn zip_error(err: ZipError) -> CleaverError {
    match err {
        ZipError::Io(e) => CleaverError::Io(e),
        other => CleaverError::ArchiveFormat(other.to_string()),
    }
}

/// Writes archive entries in order.
pub struct ArchiveWriter {
    zip: ZipWriter<BufWriter<File>>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            zip: ZipWriter::new(BufWriter::new(file)),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options).map_err(zip_error)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Copies the file at `path` into the entry `name`.
    pub fn add_file<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            CleaverError::Configuration(format!("cannot archive {}: {e}", path.display()))
        })?;
        self.zip.start_file(name, self.options).map_err(zip_error)?;
        io::copy(&mut file, &mut self.zip)?;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        let mut inner = self.zip.finish().map_err(zip_error)?;
        inner.flush()?;
        Ok(())
    }
}

/// Sequential, order-checked view of an archive's entries.
#[derive(Debug, Default)]
pub struct ArchiveReader {
    entries: Vec<(String, Vec<u8>)>,
    position: usize,
}

impl ArchiveReader {
    /// Reads every file entry of the zip at `path` into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            CleaverError::Configuration(format!(
                "cannot open model archive {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let mut zip = ZipArchive::new(file).map_err(zip_error)?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(zip_error)?;
            if entry.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            entries.push((entry.name().to_owned(), bytes));
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            entries,
            position: 0,
        }
    }

    /// Name of the next unread entry.
    pub fn peek_name(&self) -> Option<&str> {
        self.entries
            .get(self.position)
            .map(|(name, _)| name.as_str())
    }

    /// Consumes the next entry, which must be named `expected`.
    ///
    /// # Errors
    ///
    /// [`CleaverError::ArchiveFormat`] naming both the expected and the found
    /// entry, or the end of the archive.
    pub fn next_entry(&mut self, expected: &str) -> Result<Vec<u8>> {
        let (name, bytes) = self.entries.get_mut(self.position).ok_or_else(|| {
            CleaverError::ArchiveFormat(format!(
                "expected next entry to be {expected}, found end of archive"
            ))
        })?;
        if name.as_str() != expected {
            return Err(CleaverError::ArchiveFormat(format!(
                "expected next entry to be {expected}, found {name}"
            )));
        }
        self.position += 1;
        Ok(std::mem::take(bytes))
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_enforces_order() {
        let mut reader = ArchiveReader::from_entries(vec![
            ("model-1".into(), b"a".to_vec()),
            ("sigmoid-1".into(), b"b".to_vec()),
        ]);
        assert_eq!(reader.peek_name(), Some("model-1"));

        let err = reader.next_entry("sigmoid-1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "archive format error: expected next entry to be sigmoid-1, found model-1"
        );

        assert_eq!(reader.next_entry("model-1").unwrap(), b"a");
        assert_eq!(reader.next_entry("sigmoid-1").unwrap(), b"b");
        assert_eq!(reader.remaining(), 0);

        let err = reader.next_entry("model-2").unwrap_err();
        assert!(err.to_string().contains("found end of archive"));
    }

    #[test]
    fn test_zip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, "weights").unwrap();
        let path = dir.path().join("model.zip");

        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.add_bytes("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n").unwrap();
        writer.add_file("model", &source).unwrap();
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.remaining(), 2);
        reader.next_entry("META-INF/MANIFEST.MF").unwrap();
        assert_eq!(reader.next_entry("model").unwrap(), b"weights");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("model.zip")).unwrap();
        let err = writer.add_file("model", dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CleaverError::Configuration(_)));
    }
}
