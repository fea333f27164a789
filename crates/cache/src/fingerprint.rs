use crate::error::{CacheError, Result};
use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Files above this size are never fingerprinted
pub const MAX_FINGERPRINT_BYTES: u64 = 10 * 1024 * 1024;

/// Modification time and size as seen by `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub mtime: i64,
    pub size: u64,
}

impl FileStamp {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            mtime: meta.modified().map(unix_seconds).unwrap_or(0),
            size: meta.len(),
        }
    }

    pub fn of(path: &Path) -> Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }
}

/// CRC-32 over the full file content plus the stamp taken just before reading.
pub fn fingerprint_file(path: &Path) -> Result<(u32, FileStamp)> {
    let stamp = FileStamp::of(path)?;
    if stamp.size > MAX_FINGERPRINT_BYTES {
        return Err(CacheError::FileTooLarge {
            path: path.to_path_buf(),
            size: stamp.size,
            limit: MAX_FINGERPRINT_BYTES,
        });
    }

    let bytes = std::fs::read(path)?;
    // the file may have grown between stat and read
    if bytes.len() as u64 > MAX_FINGERPRINT_BYTES {
        return Err(CacheError::FileTooLarge {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            limit: MAX_FINGERPRINT_BYTES,
        });
    }
    Ok((crc32fast::hash(&bytes), stamp))
}

pub(crate) fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

pub(crate) fn now_seconds() -> i64 {
    unix_seconds(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn fingerprint_is_crc32_of_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"123456789").unwrap();

        let (crc, stamp) = fingerprint_file(&path).unwrap();
        // standard CRC-32 check value
        assert_eq!(crc, 0xCBF4_3926);
        assert_eq!(stamp.size, 9);
        assert!(stamp.mtime > 0);
    }

    #[test]
    fn oversized_files_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FINGERPRINT_BYTES + 1).unwrap();

        assert!(matches!(
            fingerprint_file(&path),
            Err(CacheError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            fingerprint_file(&dir.path().join("nope")),
            Err(CacheError::Io(_))
        ));
    }
}
