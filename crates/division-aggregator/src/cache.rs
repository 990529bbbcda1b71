//! Process-wide cache of loaded division maps.
//!
//! Division maps are immutable after load, so a batch of runs against the same
//! map and grid geometry can share one parsed copy. Entries are keyed by the
//! canonical map path together with the geometry key, so a map validated for
//! one resolution is never handed out for another.

use crate::division_map::DivisionMap;
use crate::error::Result;
use climdiv_common::GridSpec;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Cache key: map file plus the geometry it was loaded against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapKey {
    pub path: PathBuf,
    /// Whether rows were checked against the geometry on load.
    pub verified: bool,
    /// [`GridSpec::cache_key`] of the run geometry.
    pub geometry: String,
}

/// Statistics for the division map cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl MapCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Inner {
    maps: LruCache<MapKey, Arc<DivisionMap>>,
    stats: MapCacheStats,
}

/// LRU cache of loaded division maps.
pub struct DivisionMapCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl DivisionMapCache {
    /// Create a cache holding at most `capacity` maps (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                maps: LruCache::new(size),
                stats: MapCacheStats::default(),
            }),
            capacity: size.get(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries are immutable Arcs, so a poisoned lock still holds valid data
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached map for `path` and `geometry`, loading it on a miss.
    ///
    /// With `verify` the map rows are checked against `geometry` on load.
    pub fn get_or_load(
        &self,
        path: &Path,
        geometry: &GridSpec,
        verify: bool,
    ) -> Result<Arc<DivisionMap>> {
        let key = MapKey {
            path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            verified: verify,
            geometry: geometry.cache_key(),
        };

        {
            let mut inner = self.lock();
            if let Some(map) = inner.maps.get(&key).cloned() {
                inner.stats.hits += 1;
                debug!(path = %path.display(), "Division map cache hit");
                return Ok(map);
            }
            inner.stats.misses += 1;
        }

        // Load outside the lock; a concurrent loader of the same key just
        // replaces an identical entry.
        let map = if verify {
            DivisionMap::load_with_geometry(path, geometry)?
        } else {
            DivisionMap::load(path)?
        };
        let map = Arc::new(map);

        let mut inner = self.lock();
        inner.maps.put(key, Arc::clone(&map));
        inner.stats.entries = inner.maps.len();
        Ok(map)
    }

    /// Drop every entry loaded for `geometry`.
    pub fn invalidate_geometry(&self, geometry: &GridSpec) -> usize {
        let mut inner = self.lock();
        let target = geometry.cache_key();
        let stale: Vec<MapKey> = inner
            .maps
            .iter()
            .filter(|(key, _)| key.geometry == target)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            inner.maps.pop(key);
        }
        inner.stats.entries = inner.maps.len();
        stale.len()
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> MapCacheStats {
        let mut inner = self.lock();
        inner.stats.entries = inner.maps.len();
        inner.stats
    }

    /// Clear the cache.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.maps.clear();
        inner.stats = MapCacheStats::default();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climdiv_common::ScanMode;
    use std::io::Write;

    fn small_grid() -> GridSpec {
        GridSpec::new(2, 1, 1.0, 1.0, 0.0, 0.0, ScanMode::south_to_north())
    }

    fn write_map(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "lon|lat|division_code").unwrap();
        writeln!(file, "0|0|1").unwrap();
        writeln!(file, "1|0|2").unwrap();
        path
    }

    #[test]
    fn test_cache_hit_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(dir.path(), "map.txt");
        let cache = DivisionMapCache::new(4);

        let first = cache.get_or_load(&path, &small_grid(), true).unwrap();
        let second = cache.get_or_load(&path, &small_grid(), true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_different_geometry_is_different_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(dir.path(), "map.txt");
        let cache = DivisionMapCache::new(4);

        cache.get_or_load(&path, &small_grid(), false).unwrap();
        let mut other = small_grid();
        other.dx = 0.5;
        cache.get_or_load(&path, &other, false).unwrap();

        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.invalidate_geometry(&other), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_geometry_matches_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(dir.path(), "map.txt");
        let cache = DivisionMapCache::new(4);

        let grid = small_grid();
        let mut wider = small_grid();
        wider.nx = 12;

        cache.get_or_load(&path, &grid, true).unwrap();
        cache.get_or_load(&path, &grid, false).unwrap();
        cache.get_or_load(&path, &wider, false).unwrap();
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.invalidate_geometry(&grid), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_geometry(&grid), 0);
    }

    #[test]
    fn test_lru_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DivisionMapCache::new(2);
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| write_map(dir.path(), &format!("map_{}.txt", i)))
            .collect();

        for path in &paths {
            cache.get_or_load(path, &small_grid(), true).unwrap();
        }
        assert_eq!(cache.len(), 2);

        // First map was evicted and must be reloaded
        cache.get_or_load(&paths[0], &small_grid(), true).unwrap();
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_load_failure_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DivisionMapCache::new(2);
        let missing = dir.path().join("absent.txt");

        assert!(cache.get_or_load(&missing, &small_grid(), true).is_err());
        assert!(cache.is_empty());
    }
}
