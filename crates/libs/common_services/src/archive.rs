//! Zip archive reading and building for album uploads and downloads.

use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One extracted archive entry.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Lists entry names without decompressing anything. Directories are
/// skipped. Fails deterministically on a malformed archive.
pub fn list_entry_names(bytes: &[u8]) -> Result<Vec<String>, ArchiveError> {
    let archive = ZipArchive::new(Cursor::new(bytes))?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(ToString::to_string)
        .collect())
}

/// Extracts all file entries in archive order.
pub fn extract_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut contents = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut contents)?;
        entries.push(ArchiveEntry {
            name,
            bytes: contents,
        });
    }
    Ok(entries)
}

/// Builds a fresh zip archive from (name, bytes) pairs.
pub fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in files {
        writer.start_file(name.clone(), options)?;
        writer.write_all(bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_archives_can_be_enumerated_and_extracted() {
        let files = vec![
            ("a/one.jpg".to_string(), b"one".to_vec()),
            ("two.png".to_string(), b"two".to_vec()),
        ];
        let bytes = build_archive(&files).unwrap();

        let names = list_entry_names(&bytes).unwrap();
        assert_eq!(names, vec!["a/one.jpg", "two.png"]);

        let entries = extract_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a/one.jpg");
        assert_eq!(entries[0].bytes, b"one");
        assert_eq!(entries[1].bytes, b"two");
    }

    #[test]
    fn malformed_archives_fail_deterministically() {
        let garbage = b"definitely not a zip file";
        assert!(matches!(
            list_entry_names(garbage),
            Err(ArchiveError::Invalid(_))
        ));
        assert!(matches!(
            extract_entries(garbage),
            Err(ArchiveError::Invalid(_))
        ));
    }
}
