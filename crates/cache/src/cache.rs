use crate::error::{CacheError, Result};
use crate::fingerprint::{fingerprint_file, now_seconds, FileStamp};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the cache remembers about one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: String,
    pub mtime: i64,
    pub fingerprint: u32,
    pub size: u64,
    pub last_accessed: i64,
}

/// Upper bounds on the cache; 0 disables a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLimits {
    pub max_entries: usize,
    /// Budget for cache metadata (entry struct + path length), not file content
    pub max_bytes: usize,
}

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: 0,
        }
    }
}

impl CacheLimits {
    pub fn unlimited() -> Self {
        Self {
            max_entries: 0,
            max_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Path-keyed change detector with LRU eviction.
///
/// Recency is touched by both a successful [`ChangeCache::is_changed`] hit
/// and by [`ChangeCache::update`]. The `lru` map is unbounded; both limits
/// are enforced here so the byte budget applies as well as the entry count.
pub struct ChangeCache {
    entries: LruCache<String, CacheEntry>,
    limits: CacheLimits,
    total_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for ChangeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCache")
            .field("limits", &self.limits)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Bytes charged against `max_bytes` for one entry
pub fn entry_cost(path: &str) -> usize {
    std::mem::size_of::<CacheEntry>() + path.len()
}

pub(crate) fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::with_limits(CacheLimits::default())
    }

    pub fn with_limits(limits: CacheLimits) -> Self {
        Self {
            entries: LruCache::unbounded(),
            limits,
            total_bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    /// True unless the file is cached and its mtime and size still match.
    ///
    /// A hit promotes the entry to most recently used. Files that cannot be
    /// stat'd are reported as changed.
    pub fn is_changed(&mut self, path: &Path) -> bool {
        let key = path_key(path);
        let Some(entry) = self.entries.peek(&key) else {
            self.misses += 1;
            log::debug!("Cache miss (new): {key}");
            return true;
        };

        let stamp = match FileStamp::of(path) {
            Ok(stamp) => stamp,
            Err(e) => {
                self.misses += 1;
                log::debug!("Cache miss (stat failed: {e}): {key}");
                return true;
            }
        };
        if entry.mtime != stamp.mtime || entry.size != stamp.size {
            self.misses += 1;
            log::debug!("Cache miss (modified): {key}");
            return true;
        }

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_accessed = now_seconds();
        }
        self.hits += 1;
        false
    }

    /// Fingerprint the file and store it as the most recently used entry.
    ///
    /// On error the cache is left untouched.
    pub fn update(&mut self, path: &Path) -> Result<()> {
        let key = path_key(path);
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("empty path".into()));
        }

        let (fingerprint, stamp) = fingerprint_file(path)?;
        let entry = CacheEntry {
            path: key.clone(),
            mtime: stamp.mtime,
            fingerprint,
            size: stamp.size,
            last_accessed: now_seconds(),
        };
        self.insert(key, entry);
        self.enforce_limits();
        Ok(())
    }

    /// Insert or overwrite without enforcing limits; the entry becomes MRU
    pub(crate) fn insert(&mut self, key: String, entry: CacheEntry) {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
        } else {
            self.total_bytes += entry_cost(&key);
            self.entries.put(key, entry);
        }
    }

    /// Forget one file. Returns false if it was not cached.
    pub fn remove(&mut self, path: &Path) -> bool {
        let key = path_key(path);
        match self.entries.pop(&key) {
            Some(_) => {
                self.total_bytes -= entry_cost(&key);
                true
            }
            None => false,
        }
    }

    /// Replace the limits and evict immediately until both hold
    pub fn set_limits(&mut self, limits: CacheLimits) {
        self.limits = limits;
        self.enforce_limits();
    }

    fn over_limits(&self) -> bool {
        (self.limits.max_entries > 0 && self.entries.len() > self.limits.max_entries)
            || (self.limits.max_bytes > 0 && self.total_bytes > self.limits.max_bytes)
    }

    pub(crate) fn enforce_limits(&mut self) {
        while self.over_limits() {
            let Some((key, _)) = self.entries.pop_lru() else {
                break;
            };
            self.total_bytes -= entry_cost(&key);
            self.evictions += 1;
            log::debug!("Evicted {key} from cache");
        }
    }

    /// Drop every entry and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Look up an entry without touching recency
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.peek(&path_key(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(&path_key(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from least to most recently used
    pub fn iter_lru(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().rev().map(|(_, entry)| entry)
    }

    /// Cached paths from least to most recently used
    pub fn paths(&self) -> Vec<String> {
        self.iter_lru().map(|entry| entry.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn unseen_file_is_changed_and_counts_a_miss() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "a.py", "print(1)");
        let mut cache = ChangeCache::new();

        assert!(cache.is_changed(&path));
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty(), "a miss must not record an entry");
    }

    #[test]
    fn updated_file_is_unchanged_and_counts_a_hit() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "a.py", "print(1)");
        let mut cache = ChangeCache::new();

        cache.update(&path).unwrap();
        assert!(!cache.is_changed(&path));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_bytes, entry_cost(&path_key(&path)));
    }

    #[test]
    fn size_change_is_detected() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "a.py", "print(1)");
        let mut cache = ChangeCache::new();
        cache.update(&path).unwrap();

        std::fs::write(&path, "print(1)\nprint(2)\n").unwrap();
        assert!(cache.is_changed(&path));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn deleted_file_counts_as_changed() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "a.py", "x = 1");
        let mut cache = ChangeCache::new();
        cache.update(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(cache.is_changed(&path));
    }

    #[test]
    fn hit_promotes_to_most_recently_used() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a", "a");
        let b = write(&dir, "b", "b");
        let c = write(&dir, "c", "c");
        let mut cache = ChangeCache::new();
        for path in [&a, &b, &c] {
            cache.update(path).unwrap();
        }

        assert!(!cache.is_changed(&a));
        assert_eq!(
            cache.paths(),
            vec![path_key(&b), path_key(&c), path_key(&a)]
        );
    }

    #[test]
    fn failed_update_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let mut cache = ChangeCache::new();
        assert!(cache.update(&dir.path().join("missing.py")).is_err());
        assert!(cache.update(Path::new("")).is_err());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn overwrite_does_not_double_count_bytes() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "a.py", "1");
        let mut cache = ChangeCache::new();
        cache.update(&path).unwrap();
        write(&dir, "a.py", "22");
        cache.update(&path).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().total_bytes, entry_cost(&path_key(&path)));
        assert_eq!(cache.get(&path).unwrap().size, 2);
    }

    #[test]
    fn entry_limit_evicts_least_recently_used() {
        let dir = tempdir().unwrap();
        let mut cache = ChangeCache::with_limits(CacheLimits {
            max_entries: 2,
            max_bytes: 0,
        });
        let a = write(&dir, "a", "a");
        let b = write(&dir, "b", "b");
        let c = write(&dir, "c", "c");
        cache.update(&a).unwrap();
        cache.update(&b).unwrap();
        cache.update(&c).unwrap();

        assert!(!cache.contains(&a));
        assert!(cache.contains(&b) && cache.contains(&c));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn byte_limit_evicts_until_within_budget() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a", "a");
        let b = write(&dir, "b", "b");
        let budget = entry_cost(&path_key(&a)) + entry_cost(&path_key(&b)) - 1;
        let mut cache = ChangeCache::with_limits(CacheLimits {
            max_entries: 0,
            max_bytes: budget,
        });
        cache.update(&a).unwrap();
        cache.update(&b).unwrap();

        assert_eq!(cache.paths(), vec![path_key(&b)]);
        assert!(cache.stats().total_bytes <= budget);
    }

    #[test]
    fn tightening_limits_evicts_immediately() {
        let dir = tempdir().unwrap();
        let mut cache = ChangeCache::with_limits(CacheLimits::unlimited());
        let paths: Vec<_> = (0..5)
            .map(|i| write(&dir, &format!("f{i}"), "x"))
            .collect();
        for path in &paths {
            cache.update(path).unwrap();
        }

        cache.set_limits(CacheLimits {
            max_entries: 3,
            max_bytes: 0,
        });
        assert_eq!(
            cache.paths(),
            paths[2..].iter().map(|p| path_key(p)).collect::<Vec<_>>()
        );
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a", "a");
        let mut cache = ChangeCache::new();
        cache.update(&a).unwrap();
        cache.is_changed(&a);

        assert!(cache.remove(&a));
        assert!(!cache.remove(&a));
        assert_eq!(cache.stats().total_bytes, 0);

        cache.update(&a).unwrap();
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
