//! Binary persistence for [`ChangeCache`].
//!
//! Layout, little-endian:
//!
//! ```text
//! u32 version
//! u64 entry_count
//! entry_count × {
//!     u16 path_len
//!     [u8; path_len] path (UTF-8, no terminator)
//!     i64 mtime
//!     u32 fingerprint
//!     u64 size
//!     i64 last_accessed
//! }
//! ```
//!
//! Records are written from least to most recently used, so replaying them
//! in file order restores the recency list.

use crate::cache::{CacheEntry, CacheLimits, ChangeCache};
use crate::error::Result;
use std::collections::VecDeque;
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 2;

/// At most this many records, the most recently used ones, are kept on load
pub const MAX_SNAPSHOT_ENTRIES: u64 = 10_000;

const HEADER_LEN: usize = 4 + 8;

impl ChangeCache {
    /// Write the whole cache to `path`, replacing any previous snapshot
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + self.len() * 48);
        buf.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());

        let mut written: u64 = 0;
        for entry in self.iter_lru() {
            let Ok(path_len) = u16::try_from(entry.path.len()) else {
                log::warn!(
                    "Not persisting cache entry with {} byte path",
                    entry.path.len()
                );
                continue;
            };
            buf.extend_from_slice(&path_len.to_le_bytes());
            buf.extend_from_slice(entry.path.as_bytes());
            buf.extend_from_slice(&entry.mtime.to_le_bytes());
            buf.extend_from_slice(&entry.fingerprint.to_le_bytes());
            buf.extend_from_slice(&entry.size.to_le_bytes());
            buf.extend_from_slice(&entry.last_accessed.to_le_bytes());
            written += 1;
        }
        buf[4..HEADER_LEN].copy_from_slice(&written.to_le_bytes());

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &buf)?;
        std::fs::rename(&tmp, path)?;
        log::info!("Saved {} cache entries to {}", written, path.display());
        Ok(())
    }

    /// Restore a cache saved by [`ChangeCache::save`].
    ///
    /// A missing file, a different version or an unreadable header yield an
    /// empty cache. A truncated or corrupt record ends the load; records read
    /// before it are kept. `limits` are applied after loading.
    pub fn load(path: &Path, limits: CacheLimits) -> Result<ChangeCache> {
        let mut cache = ChangeCache::with_limits(CacheLimits::unlimited());
        if !path.exists() {
            log::info!("No cache at {}, starting fresh", path.display());
            cache.set_limits(limits);
            return Ok(cache);
        }

        let bytes = std::fs::read(path)?;
        let mut reader = Reader::new(&bytes);
        let (Some(version), Some(count)) = (reader.u32(), reader.u64()) else {
            log::warn!("Cache {} has a truncated header, starting fresh", path.display());
            cache.set_limits(limits);
            return Ok(cache);
        };
        if version != SNAPSHOT_VERSION {
            log::warn!(
                "Cache {} is version {}, expected {}; starting fresh",
                path.display(),
                version,
                SNAPSHOT_VERSION
            );
            cache.set_limits(limits);
            return Ok(cache);
        }

        // records run LRU to MRU, so past the cap the oldest ones are dropped
        let mut recent: VecDeque<CacheEntry> = VecDeque::new();
        let mut read: u64 = 0;
        while read < count {
            let Some(entry) = read_entry(&mut reader) else {
                log::warn!(
                    "Cache {} is truncated after {} of {} entries",
                    path.display(),
                    read,
                    count
                );
                break;
            };
            if recent.len() as u64 == MAX_SNAPSHOT_ENTRIES {
                recent.pop_front();
            }
            recent.push_back(entry);
            read += 1;
        }
        if read > MAX_SNAPSHOT_ENTRIES {
            log::warn!(
                "Cache {} holds {} entries, keeping the {} most recent",
                path.display(),
                read,
                MAX_SNAPSHOT_ENTRIES
            );
        }
        for entry in recent {
            cache.insert(entry.path.clone(), entry);
        }

        cache.set_limits(limits);
        log::info!(
            "Loaded {} cache entries from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }
}

fn read_entry(reader: &mut Reader<'_>) -> Option<CacheEntry> {
    let path_len = reader.u16()?;
    let path = std::str::from_utf8(reader.take(usize::from(path_len))?).ok()?;
    if path.is_empty() {
        return None;
    }
    Some(CacheEntry {
        path: path.to_string(),
        mtime: reader.i64()?,
        fingerprint: reader.u32()?,
        size: reader.u64()?,
        last_accessed: reader.i64()?,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Option<i64> {
        self.array().map(i64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn entry(path: &str, fingerprint: u32) -> CacheEntry {
        CacheEntry {
            path: path.to_string(),
            mtime: 1_700_000_000,
            fingerprint,
            size: 10,
            last_accessed: 1_700_000_100,
        }
    }

    fn encode(version: u32, entries: &[CacheEntry]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        for e in entries {
            buf.extend_from_slice(&(e.path.len() as u16).to_le_bytes());
            buf.extend_from_slice(e.path.as_bytes());
            buf.extend_from_slice(&e.mtime.to_le_bytes());
            buf.extend_from_slice(&e.fingerprint.to_le_bytes());
            buf.extend_from_slice(&e.size.to_le_bytes());
            buf.extend_from_slice(&e.last_accessed.to_le_bytes());
        }
        buf
    }

    #[test]
    fn header_layout_is_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let mut cache = ChangeCache::new();
        cache.insert("a.py".into(), entry("a.py", 0xDEAD_BEEF));
        cache.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, encode(SNAPSHOT_VERSION, &[entry("a.py", 0xDEAD_BEEF)]));
    }

    #[test]
    fn load_replays_file_order_as_recency() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(
            &path,
            encode(
                SNAPSHOT_VERSION,
                &[entry("old", 1), entry("mid", 2), entry("new", 3)],
            ),
        )
        .unwrap();

        let cache = ChangeCache::load(&path, CacheLimits::default()).unwrap();
        assert_eq!(cache.paths(), vec!["old", "mid", "new"]);
        assert_eq!(cache.get(Path::new("mid")).unwrap().fingerprint, 2);
    }

    #[test]
    fn oversized_snapshot_keeps_most_recent_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let total = MAX_SNAPSHOT_ENTRIES as u32 + 5;
        let limits = CacheLimits {
            max_entries: 20_000,
            max_bytes: 0,
        };

        let mut cache = ChangeCache::with_limits(limits);
        for i in 0..total {
            let name = format!("f{i}");
            cache.insert(name.clone(), entry(&name, i));
        }
        cache.save(&path).unwrap();

        let restored = ChangeCache::load(&path, limits).unwrap();
        assert_eq!(restored.len() as u64, MAX_SNAPSHOT_ENTRIES);
        let newest = format!("f{}", total - 1);
        assert!(restored.contains(Path::new(&newest)));
        assert!(restored.contains(Path::new("f5")));
        assert!(!restored.contains(Path::new("f0")));
        assert!(!restored.contains(Path::new("f4")));
        assert_eq!(restored.paths().last(), Some(&newest));
    }

    #[test]
    fn version_mismatch_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, encode(1, &[entry("a", 1)])).unwrap();

        let cache = ChangeCache::load(&path, CacheLimits::default()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_or_tiny_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let missing = ChangeCache::load(&dir.path().join("none"), CacheLimits::default()).unwrap();
        assert!(missing.is_empty());

        let path = dir.path().join("tiny.bin");
        std::fs::write(&path, [2u8, 0]).unwrap();
        assert!(ChangeCache::load(&path, CacheLimits::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn truncated_record_keeps_earlier_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let mut bytes = encode(SNAPSHOT_VERSION, &[entry("a", 1), entry("b", 2)]);
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&path, bytes).unwrap();

        let cache = ChangeCache::load(&path, CacheLimits::default()).unwrap();
        assert_eq!(cache.paths(), vec!["a"]);
        assert_eq!(cache.stats().total_bytes, crate::entry_cost("a"));
    }

    #[test]
    fn invalid_utf8_path_stops_the_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let mut bytes = encode(SNAPSHOT_VERSION, &[entry("a", 1), entry("bb", 2)]);
        // corrupt the second record's path bytes
        let second_path_at = HEADER_LEN + 2 + 1 + 28 + 2;
        bytes[second_path_at] = 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let cache = ChangeCache::load(&path, CacheLimits::default()).unwrap();
        assert_eq!(cache.paths(), vec!["a"]);
    }

    #[test]
    fn limits_apply_after_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(
            &path,
            encode(SNAPSHOT_VERSION, &[entry("a", 1), entry("b", 2), entry("c", 3)]),
        )
        .unwrap();

        let cache = ChangeCache::load(
            &path,
            CacheLimits {
                max_entries: 2,
                max_bytes: 0,
            },
        )
        .unwrap();
        assert_eq!(cache.paths(), vec!["b", "c"]);
        assert_eq!(cache.limits().max_entries, 2);
    }
}
