//! Upload safety checks (§4.8): a magic-byte check on the raw bytes, and a
//! ZIP central-directory expansion-ratio check that never extracts entry
//! contents — only the sizes the central directory already reports.

use zip::ZipArchive;

use std::io::Cursor;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Hard cap on total uncompressed size, independent of the raw upload limit.
/// A legitimate DOCX rarely approaches this even when its raw upload is near
/// `MAX_FILE_SIZE`; a bomb reaches it from a tiny upload.
const MAX_TOTAL_UNCOMPRESSED_BYTES: u64 = 512 * 1024 * 1024;

/// Per-entry compression ratio beyond which an entry is treated as a bomb.
const MAX_ENTRY_RATIO: f64 = 100.0;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload does not start with the ZIP local-file-header signature")]
    NotAZip,
    #[error("archive central directory could not be read: {0}")]
    UnreadableArchive(String),
    #[error("archive would expand to {actual} bytes, exceeding the {limit} byte limit")]
    TotalTooLarge { actual: u64, limit: u64 },
    #[error("entry '{name}' has a compression ratio of {ratio:.1}:1, exceeding the {limit:.1}:1 limit")]
    SuspiciousRatio { name: String, ratio: f64, limit: f64 },
}

/// First four bytes must be the ZIP local-file-header signature `PK\x03\x04`.
pub fn check_magic_bytes(buffer: &[u8]) -> Result<(), UploadError> {
    if buffer.len() >= 4 && buffer[0..4] == ZIP_MAGIC {
        Ok(())
    } else {
        Err(UploadError::NotAZip)
    }
}

/// Reject archives whose central directory already reports an implausible
/// expansion, without decompressing a single entry.
pub fn check_expansion_ratio(buffer: &[u8]) -> Result<(), UploadError> {
    let mut archive =
        ZipArchive::new(Cursor::new(buffer)).map_err(|e| UploadError::UnreadableArchive(e.to_string()))?;

    let mut total_uncompressed: u64 = 0;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| UploadError::UnreadableArchive(e.to_string()))?;
        let name = entry.name().to_string();
        let uncompressed = entry.size();
        let compressed = entry.compressed_size();
        total_uncompressed = total_uncompressed.saturating_add(uncompressed);

        if compressed > 0 {
            let ratio = uncompressed as f64 / compressed as f64;
            if ratio > MAX_ENTRY_RATIO {
                return Err(UploadError::SuspiciousRatio {
                    name,
                    ratio,
                    limit: MAX_ENTRY_RATIO,
                });
            }
        } else if uncompressed > 0 {
            return Err(UploadError::SuspiciousRatio {
                name,
                ratio: f64::INFINITY,
                limit: MAX_ENTRY_RATIO,
            });
        }
    }

    if total_uncompressed > MAX_TOTAL_UNCOMPRESSED_BYTES {
        return Err(UploadError::TotalTooLarge {
            actual: total_uncompressed,
            limit: MAX_TOTAL_UNCOMPRESSED_BYTES,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_core::engine::memory::build_fixture;

    #[test]
    fn rejects_buffers_without_the_zip_signature() {
        let err = check_magic_bytes(b"not a zip at all").unwrap_err();
        assert!(matches!(err, UploadError::NotAZip));
    }

    #[test]
    fn rejects_buffers_shorter_than_the_signature() {
        let err = check_magic_bytes(b"PK").unwrap_err();
        assert!(matches!(err, UploadError::NotAZip));
    }

    #[test]
    fn accepts_a_well_formed_fixture() {
        let buffer = build_fixture(&["hello", "world"]);
        check_magic_bytes(&buffer).unwrap();
        check_expansion_ratio(&buffer).unwrap();
    }

    #[test]
    fn unreadable_archive_is_reported_distinctly() {
        let mut buffer = build_fixture(&["hello"]);
        buffer.truncate(buffer.len() / 2);
        let err = check_expansion_ratio(&buffer).unwrap_err();
        assert!(matches!(err, UploadError::UnreadableArchive(_)));
    }
}
