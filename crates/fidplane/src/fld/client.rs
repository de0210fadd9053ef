//! Client-side location resolver.
//!
//! Keeps its own soft cache and falls back to the owning location server
//! over a channel. The locality check deliberately stays a hint: it reads
//! only the cache and errs toward "local".

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::cache::{CacheStatsSnapshot, FldCache};
use crate::config::FldConfig;
use crate::error::FldError;
use crate::fid::Fid;
use crate::range::SeqRange;
use crate::transport::{FldChannel, FldRequest, FldResponse};

pub struct FldClient {
    node_id: u32,
    cache: FldCache,
    remote: Option<Arc<dyn FldChannel>>,
    lookup_timeout: Duration,
}

impl FldClient {
    pub fn new(node_id: u32, config: &FldConfig, remote: Option<Arc<dyn FldChannel>>) -> Self {
        Self {
            node_id,
            cache: FldCache::new(config.cache_capacity),
            remote,
            lookup_timeout: config.lookup_timeout,
        }
    }

    /// Resolve the range containing `seq`: cache first, then one remote
    /// round trip with the configured deadline. A timeout surfaces as
    /// `Unavailable` and makes no assumption about the remote side.
    pub async fn lookup(&self, seq: u64) -> Result<SeqRange, FldError> {
        if let Some(range) = self.cache.lookup(seq) {
            return Ok(range);
        }
        let Some(remote) = &self.remote else {
            return Err(FldError::NotFound(seq));
        };
        let reply = tokio::time::timeout(
            self.lookup_timeout,
            remote.query(FldRequest::Lookup { seq }),
        )
        .await
        .map_err(|_| {
            FldError::Unavailable(anyhow::anyhow!(
                "lookup of {seq:#x} timed out after {:?}",
                self.lookup_timeout
            ))
        })??;
        match reply {
            FldResponse::Located { range } => {
                self.cache.insert(range);
                debug!(%range, seq, "resolved sequence location");
                Ok(range)
            }
            other => Err(FldError::Unavailable(anyhow::anyhow!(
                "unexpected lookup reply {other:?}"
            ))),
        }
    }

    /// Owner of the range containing `seq`.
    pub async fn lookup_owner(&self, seq: u64) -> Result<u32, FldError> {
        self.lookup(seq).await.map(|range| range.owner)
    }

    /// Returns true if `fid` is believed to live on this node.
    ///
    /// This is an educated conservative guess, not an authority: it is
    /// *not* guaranteed to return false for a remote fid, and any
    /// resolution failure degrades to "assume local". Suitable for routing
    /// and assertion hints only, never for access decisions.
    pub fn fid_is_local(&self, fid: &Fid) -> bool {
        match self.cache.lookup(fid.sequence) {
            Some(range) => range.owner == self.node_id,
            None => true,
        }
    }

    /// Seed or correct the soft cache. Exposed for locality bookkeeping
    /// when a grant or registration is observed out of band.
    pub fn note_range(&self, range: SeqRange) {
        self.cache.insert(range);
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}
