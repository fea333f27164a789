//! # Archmap Cache
//!
//! Change detection for incremental scans: remembers `(mtime, size, crc32)`
//! per file so unchanged files are not re-parsed.
//!
//! ## Flow
//!
//! ```text
//! walker yields path
//!     │
//!     ├──> is_changed(path)?  ── no ──> skip (hit, entry promoted to MRU)
//!     │         │
//!     │        yes (miss)
//!     │         ▼
//!     │    extract + merge
//!     │         │
//!     └──> update(path) ──> crc32 + stat ──> insert as MRU ──> evict LRU while over limits
//!
//! end of scan: save() ──> versioned little-endian snapshot
//! next scan:   load() ──> same entries, same recency order
//! ```
//!
//! ## Example
//!
//! ```rust
//! use archmap_cache::{CacheLimits, ChangeCache};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = dir.path().join("app.py");
//! std::fs::write(&file, "print('hi')").unwrap();
//!
//! let mut cache = ChangeCache::with_limits(CacheLimits::default());
//! assert!(cache.is_changed(&file));
//! cache.update(&file).unwrap();
//! assert!(!cache.is_changed(&file));
//!
//! let snapshot = dir.path().join("cache.bin");
//! cache.save(&snapshot).unwrap();
//! let restored = ChangeCache::load(&snapshot, CacheLimits::default()).unwrap();
//! assert_eq!(restored.len(), 1);
//! ```

mod cache;
mod error;
mod fingerprint;
mod snapshot;

pub use cache::{
    entry_cost, CacheEntry, CacheLimits, CacheStats, ChangeCache, DEFAULT_MAX_ENTRIES,
};
pub use error::{CacheError, Result};
pub use fingerprint::{fingerprint_file, FileStamp, MAX_FINGERPRINT_BYTES};
pub use snapshot::{MAX_SNAPSHOT_ENTRIES, SNAPSHOT_VERSION};
