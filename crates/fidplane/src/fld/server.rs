//! Server-side location service.
//!
//! Owns the persistent index and a cache kept coherent with it:
//! administrative mutations invalidate the affected region, lookups fill
//! the cache from ground truth.

use std::sync::Arc;

use fjall::Keyspace;
use tracing::{debug, warn};

use super::cache::{CacheStatsSnapshot, FldCache};
use super::index::RangeIndex;
use crate::config::FldConfig;
use crate::error::FldError;
use crate::range::SeqRange;
use crate::transport::{FldRequest, FldResponse};

pub struct FldService {
    index: RangeIndex,
    cache: FldCache,
}

impl FldService {
    pub fn open(keyspace: Arc<Keyspace>, config: &FldConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            index: RangeIndex::open(keyspace)?,
            cache: FldCache::new(config.cache_capacity),
        })
    }

    /// Register a range. The region is invalidated in the cache so later
    /// lookups observe the new entry rather than a stale miss.
    pub fn create(&self, range: SeqRange) -> Result<(), FldError> {
        if !range.is_sane() {
            warn!(%range, "rejecting insane range create");
            return Err(FldError::Invalid(range));
        }
        self.index.create(range)?;
        self.cache.invalidate_overlapping(&range);
        debug!(%range, "location entry created");
        Ok(())
    }

    /// Unregister the range containing `seq`.
    pub fn delete(&self, seq: u64) -> Result<(), FldError> {
        let removed = self.index.delete(seq)?;
        self.cache.invalidate_overlapping(&removed);
        debug!(%removed, "location entry deleted");
        Ok(())
    }

    /// Resolve the range containing `seq`, cache first. A `NotFound` means
    /// the caller should consult the parent/authoritative server, not that
    /// the operation failed.
    pub fn lookup(&self, seq: u64) -> Result<SeqRange, FldError> {
        if let Some(range) = self.cache.lookup(seq) {
            return Ok(range);
        }
        let range = self.index.lookup(seq)?;
        self.cache.insert(range);
        Ok(range)
    }

    /// Owner of the range containing `seq`.
    pub fn lookup_owner(&self, seq: u64) -> Result<u32, FldError> {
        self.lookup(seq).map(|range| range.owner)
    }

    /// Dispatch one typed request. This is the whole server-side surface;
    /// the transport maps its messages onto these variants and nothing
    /// else.
    pub fn handle(&self, req: FldRequest) -> Result<FldResponse, FldError> {
        match req {
            FldRequest::Create { range } => {
                self.create(range)?;
                Ok(FldResponse::Created)
            }
            FldRequest::Delete { seq } => {
                self.delete(seq)?;
                Ok(FldResponse::Deleted)
            }
            FldRequest::Lookup { seq } => {
                let range = self.lookup(seq)?;
                Ok(FldResponse::Located { range })
            }
        }
    }

    /// Ordered snapshot of every committed entry.
    pub fn entries(&self) -> Result<Vec<SeqRange>, FldError> {
        self.index.entries()
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}
