//! In-memory range cache with logical-clock eviction.
//!
//! Entries are soft state: losing one costs a round trip to the index or
//! the owning location server, never correctness. Lookups take the shared
//! side of the lock and bump a per-entry access stamp atomically, so the
//! hot path never waits behind an insert; stale reads racing a concurrent
//! invalidation are acceptable because the index stays ground truth.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::range::SeqRange;

struct CacheSlot {
    range: SeqRange,
    last_access: AtomicU64,
}

/// Monotonic counter totals for hit-rate diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

#[derive(Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

pub struct FldCache {
    capacity: usize,
    clock: AtomicU64,
    slots: RwLock<BTreeMap<u64, CacheSlot>>,
    stats: CacheStats,
}

impl FldCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            slots: RwLock::new(BTreeMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Resolve the cached range containing `seq`, refreshing its access
    /// stamp. Never blocks on I/O.
    pub fn lookup(&self, seq: u64) -> Option<SeqRange> {
        let slots = self
            .slots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let hit = slots
            .range(..=seq)
            .next_back()
            .map(|(_, slot)| slot)
            .filter(|slot| slot.range.contains(seq));
        match hit {
            Some(slot) => {
                let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
                slot.last_access.store(tick, Ordering::Relaxed);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(slot.range)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a freshly resolved range, correcting any cached entry it
    /// overlaps and evicting the least-recently-used slot when full.
    pub fn insert(&self, range: SeqRange) {
        if !range.is_sane() {
            return;
        }

        let mut slots = self
            .slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::remove_overlapping(&mut slots, &range);
        while slots.len() >= self.capacity {
            let Some(coldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access.load(Ordering::Relaxed))
                .map(|(start, _)| *start)
            else {
                break;
            };
            slots.remove(&coldest);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        slots.insert(
            range.start,
            CacheSlot {
                range,
                last_access: AtomicU64::new(tick),
            },
        );
    }

    /// Drop every cached entry intersecting `range`. Called after
    /// administrative create/delete so later lookups re-read ground truth.
    pub fn invalidate_overlapping(&self, range: &SeqRange) -> usize {
        if !range.is_sane() {
            return 0;
        }
        let mut slots = self
            .slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let removed = Self::remove_overlapping(&mut slots, range);
        self.stats
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            invalidations: self.stats.invalidations.load(Ordering::Relaxed),
        }
    }

    fn remove_overlapping(slots: &mut BTreeMap<u64, CacheSlot>, range: &SeqRange) -> usize {
        let mut doomed = Vec::new();
        if let Some((start, slot)) = slots.range(..=range.start).next_back() {
            if slot.range.intersects(range) {
                doomed.push(*start);
            }
        }
        for (start, _) in slots.range(range.start..range.end) {
            if !doomed.contains(start) {
                doomed.push(*start);
            }
        }
        for start in &doomed {
            slots.remove(start);
        }
        doomed.len()
    }
}
