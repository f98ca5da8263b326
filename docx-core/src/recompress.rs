//! The recompressor: re-archives an exported DOCX buffer at maximum
//! compression. `DocxEngine::export` is free to write entries uncompressed
//! or at a low compression level (`MemoryEngine` always uses `Stored`); this
//! pass rewrites every entry through `Deflated` at the best compression
//! level without touching file names or byte contents.

use std::io::{Cursor, Read, Write};

use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum RecompressError {
    #[error("failed to read source archive: {0}")]
    ReadArchive(String),
    #[error("failed to read entry '{name}': {source}")]
    ReadEntry { name: String, source: String },
    #[error("failed to write entry '{name}': {source}")]
    WriteEntry { name: String, source: String },
    #[error("failed to finalize archive: {0}")]
    Finalize(String),
}

/// Re-compress every entry of a ZIP-based document buffer at the best
/// available `Deflated` level, preserving names, contents, and entry order.
pub fn recompress(buffer: &[u8]) -> Result<Vec<u8>, RecompressError> {
    let mut archive = ZipArchive::new(Cursor::new(buffer))
        .map_err(|e| RecompressError::ReadArchive(e.to_string()))?;

    let mut out = Vec::new();
    {
        let cursor = Cursor::new(&mut out);
        let mut writer = ZipWriter::new(cursor);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| RecompressError::ReadArchive(e.to_string()))?;
            let name = entry.name().to_string();
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut contents)
                .map_err(|e| RecompressError::ReadEntry {
                    name: name.clone(),
                    source: e.to_string(),
                })?;
            writer
                .start_file(&name, options)
                .map_err(|e| RecompressError::WriteEntry {
                    name: name.clone(),
                    source: e.to_string(),
                })?;
            writer
                .write_all(&contents)
                .map_err(|e| RecompressError::WriteEntry {
                    name,
                    source: e.to_string(),
                })?;
        }
        writer
            .finish()
            .map_err(|e| RecompressError::Finalize(e.to_string()))?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::build_fixture;

    #[test]
    fn recompressed_archive_preserves_entry_contents() {
        let original = build_fixture(&["alpha", "beta", "gamma"]);
        let recompressed = recompress(&original).unwrap();

        let mut before = ZipArchive::new(Cursor::new(&original)).unwrap();
        let mut after = ZipArchive::new(Cursor::new(&recompressed)).unwrap();
        assert_eq!(before.len(), after.len());

        let mut before_xml = String::new();
        before
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut before_xml)
            .unwrap();
        let mut after_xml = String::new();
        after
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut after_xml)
            .unwrap();
        assert_eq!(before_xml, after_xml);
    }

    #[test]
    fn recompressed_entry_uses_deflate() {
        let original = build_fixture(&["some reasonably compressible text ".repeat(50).as_str()]);
        let recompressed = recompress(&original).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(&recompressed)).unwrap();
        let entry = archive.by_name("word/document.xml").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn invalid_buffer_is_a_read_error() {
        let err = recompress(b"not a zip file").unwrap_err();
        assert!(matches!(err, RecompressError::ReadArchive(_)));
    }
}
