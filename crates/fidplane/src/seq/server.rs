//! Server-side sequence controller.
//!
//! Owns the authoritative partition of the sequence space. Every grant
//! carves a width off the front of a durable boundary record; the record
//! is committed and fsynced *before* the grant is returned, so a restart
//! resumes from the last persisted boundary and can never reissue a range.
//! A grant whose reply is lost in transit is leaked, not reused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SeqConfig;
use crate::error::AllocError;
use crate::range::SeqRange;
use crate::transport::{SeqChannel, SeqOp};

const STATE_PARTITION: &str = "seq_state";

/// Durable boundary record. `free_space` is the unallocated tail of the
/// controller's authoritative space; `super_space` is the remainder of the
/// super range it is currently carving meta grants from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct SpaceRecord {
    free_space: SeqRange,
    super_space: SeqRange,
}

struct ServerSeqState {
    free_space: SeqRange,
    super_space: SeqRange,
}

/// Monotonic grant totals for diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeqStatsSnapshot {
    pub super_grants: u64,
    pub meta_grants: u64,
    pub super_refills: u64,
}

#[derive(Default)]
struct SeqStats {
    super_grants: AtomicU64,
    meta_grants: AtomicU64,
    super_refills: AtomicU64,
}

pub struct SeqController {
    name: String,
    keyspace: Arc<Keyspace>,
    states: fjall::PartitionHandle,
    config: SeqConfig,
    /// Channel to a parent controller. When set, super space is refilled
    /// through it instead of carved locally; a root controller leaves it
    /// unset and feeds on its own free space.
    parent: Option<Arc<dyn SeqChannel>>,
    state: Mutex<ServerSeqState>,
    stats: SeqStats,
}

impl SeqController {
    /// Open a controller named `name`, bootstrapping its authoritative
    /// space from `space` on first start and reloading the persisted
    /// boundaries on every later one.
    pub fn open(
        keyspace: Arc<Keyspace>,
        name: &str,
        space: SeqRange,
        config: SeqConfig,
        parent: Option<Arc<dyn SeqChannel>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        anyhow::ensure!(space.is_sane(), "bootstrap space {space} is not sane");
        anyhow::ensure!(
            space.start >= config.reserved_boundary,
            "bootstrap space {space} dips below the reserved boundary {:#x}",
            config.reserved_boundary
        );

        let states = keyspace
            .open_partition(STATE_PARTITION, PartitionCreateOptions::default())
            .context("open seq state partition")?;

        let key = state_key(name);
        let state = match states.get(&key).context("read seq state record")? {
            Some(bytes) => {
                let record: SpaceRecord =
                    serde_json::from_slice(&bytes).context("decode seq state record")?;
                info!(
                    name,
                    free_space = %record.free_space,
                    super_space = %record.super_space,
                    "sequence controller recovered"
                );
                ServerSeqState {
                    free_space: record.free_space,
                    super_space: record.super_space,
                }
            }
            None => {
                let state = ServerSeqState {
                    free_space: space,
                    super_space: SeqRange::empty_at(space.start, space.owner, space.flags),
                };
                // Commit the bootstrap boundaries up front so the first
                // grant computes against durable state.
                persist_record(
                    &keyspace,
                    &states,
                    &key,
                    &SpaceRecord {
                        free_space: state.free_space,
                        super_space: state.super_space,
                    },
                )
                .map_err(|err| anyhow::anyhow!("persist bootstrap boundaries: {err}"))?;
                info!(name, space = %space, "sequence controller bootstrapped");
                state
            }
        };

        Ok(Self {
            name: name.to_string(),
            keyspace,
            states,
            config,
            parent,
            state: Mutex::new(state),
            stats: SeqStats::default(),
        })
    }

    /// Grant a super range: `super_width` sequences carved off the front of
    /// the authoritative space, or delegated to the parent controller when
    /// one is configured.
    pub async fn alloc_super_range(&self) -> Result<SeqRange, AllocError> {
        let granted = match &self.parent {
            Some(parent) => self.request_parent(parent, SeqOp::AllocSuper).await?,
            None => {
                let mut state = self.state.lock().await;
                let granted = carve(&mut state.free_space, self.config.super_width)?;
                self.persist(&state)?;
                granted
            }
        };
        self.stats.super_grants.fetch_add(1, Ordering::Relaxed);
        debug!(name = %self.name, %granted, "super range granted");
        Ok(granted)
    }

    /// Grant a meta range: `meta_width` sequences carved from the held
    /// super range, refilling it first when exhausted.
    pub async fn alloc_meta_range(&self) -> Result<SeqRange, AllocError> {
        let mut state = self.state.lock().await;
        if state.super_space.width() < self.config.meta_width {
            // A short tail is abandoned rather than split across super
            // ranges; grants stay contiguous within one super range.
            let fresh = match &self.parent {
                Some(parent) => self.request_parent(parent, SeqOp::AllocSuper).await?,
                None => carve(&mut state.free_space, self.config.super_width)?,
            };
            self.check_refill(&fresh)?;
            state.super_space = fresh;
            self.stats.super_refills.fetch_add(1, Ordering::Relaxed);
        }
        let granted = carve(&mut state.super_space, self.config.meta_width)?;
        self.persist(&state)?;
        self.stats.meta_grants.fetch_add(1, Ordering::Relaxed);
        debug!(name = %self.name, %granted, "meta range granted");
        Ok(granted)
    }

    /// Dispatch one typed allocation request.
    pub async fn handle(&self, op: SeqOp) -> Result<SeqRange, AllocError> {
        match op {
            SeqOp::AllocSuper => self.alloc_super_range().await,
            SeqOp::AllocMeta => self.alloc_meta_range().await,
        }
    }

    /// Current in-memory boundaries (matches the persisted record between
    /// grants). Diagnostic path.
    pub async fn spaces(&self) -> (SeqRange, SeqRange) {
        let state = self.state.lock().await;
        (state.free_space, state.super_space)
    }

    pub fn stats(&self) -> SeqStatsSnapshot {
        SeqStatsSnapshot {
            super_grants: self.stats.super_grants.load(Ordering::Relaxed),
            meta_grants: self.stats.meta_grants.load(Ordering::Relaxed),
            super_refills: self.stats.super_refills.load(Ordering::Relaxed),
        }
    }

    async fn request_parent(
        &self,
        parent: &Arc<dyn SeqChannel>,
        op: SeqOp,
    ) -> Result<SeqRange, AllocError> {
        tokio::time::timeout(self.config.grant_timeout, parent.alloc(op))
            .await
            .map_err(|_| {
                AllocError::Unavailable(anyhow::anyhow!(
                    "parent grant request timed out after {:?}",
                    self.config.grant_timeout
                ))
            })?
    }

    fn check_refill(&self, fresh: &SeqRange) -> Result<(), AllocError> {
        if !fresh.is_sane()
            || fresh.width() < self.config.meta_width
            || fresh.start < self.config.reserved_boundary
        {
            warn!(name = %self.name, %fresh, "discarding unusable super range");
            return Err(AllocError::Unavailable(anyhow::anyhow!(
                "granted super range {fresh} is unusable"
            )));
        }
        Ok(())
    }

    /// Durably commit the boundary record. Called with the state lock held,
    /// before any grant is acknowledged.
    fn persist(&self, state: &ServerSeqState) -> Result<(), AllocError> {
        persist_record(
            &self.keyspace,
            &self.states,
            &state_key(&self.name),
            &SpaceRecord {
                free_space: state.free_space,
                super_space: state.super_space,
            },
        )
    }
}

fn state_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1);
    key.extend_from_slice(name.as_bytes());
    key.push(0);
    key
}

fn persist_record(
    keyspace: &Keyspace,
    states: &fjall::PartitionHandle,
    key: &[u8],
    record: &SpaceRecord,
) -> Result<(), AllocError> {
    let bytes = serde_json::to_vec(record)?;
    let mut batch = keyspace.batch();
    batch.insert(states, key, bytes);
    batch.commit()?;
    keyspace.persist(PersistMode::SyncAll)?;
    Ok(())
}

fn carve(space: &mut SeqRange, width: u64) -> Result<SeqRange, AllocError> {
    if space.width() < width {
        return Err(AllocError::Exhausted);
    }
    let granted = SeqRange::new(space.start, space.start + width, space.owner, space.flags);
    space.start += width;
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeFlags;

    #[test]
    fn carve_advances_front() {
        let mut space = SeqRange::new(1000, 4000, 2, RangeFlags::Mdt);
        let first = carve(&mut space, 1000).expect("carve");
        let second = carve(&mut space, 1000).expect("carve");
        assert_eq!((first.start, first.end), (1000, 2000));
        assert_eq!((second.start, second.end), (2000, 3000));
        assert_eq!(space.start, 3000);
        assert_eq!(first.owner, 2);
    }

    #[test]
    fn carve_refuses_short_tail() {
        let mut space = SeqRange::new(0, 500, 0, RangeFlags::Mdt);
        assert!(matches!(
            carve(&mut space, 1000),
            Err(AllocError::Exhausted)
        ));
        // The tail is untouched by a failed carve.
        assert_eq!(space.start, 0);
    }
}
