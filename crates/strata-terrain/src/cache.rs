//! Per-coordinate memoization of biome lookups.
//!
//! One cache exists per orientation and per published generation. Entries
//! are never evicted or updated; a hot-reload publishes a fresh, empty cache
//! and the old one is dropped with its generation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::biome::BiomeResult;

/// Exact integer horizontal position.
///
/// Used as the cache key for block columns and as the address of a chunk in
/// the column sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPosition {
    /// X coordinate.
    pub x: i32,
    /// Z coordinate.
    pub z: i32,
}

impl ChunkPosition {
    /// Create a position.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Snapshot of cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to resolve the biome.
    pub misses: u64,
    /// Entries currently stored.
    pub entries: usize,
}

/// Concurrent `ChunkPosition -> BiomeResult` map.
///
/// Sharded, so concurrent readers and writers on different keys do not
/// contend. Two threads racing on the same key may both resolve it; the
/// first insert is kept and both observe the same stored value.
#[derive(Debug, Default)]
pub struct BiomeCache {
    entries: DashMap<ChunkPosition, BiomeResult, FxBuildHasher>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BiomeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached result for `pos`, counting the hit or miss.
    pub fn get(&self, pos: ChunkPosition) -> Option<BiomeResult> {
        match self.entries.get(&pos) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `result` unless the key is already present.
    ///
    /// Returns the value that ends up stored for `pos`.
    pub fn insert(&self, pos: ChunkPosition, result: BiomeResult) -> BiomeResult {
        self.entries.entry(pos).or_insert(result).value().clone()
    }

    /// Cached result for `pos`, resolving and storing it on a miss.
    ///
    /// `resolve` runs outside of any shard lock.
    pub fn get_or_insert_with(
        &self,
        pos: ChunkPosition,
        resolve: impl FnOnce() -> BiomeResult,
    ) -> BiomeResult {
        if let Some(hit) = self.get(pos) {
            return hit;
        }
        self.insert(pos, resolve())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
