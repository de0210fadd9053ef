//! Policy configuration for allocation widths and cache sizing.
//!
//! The widths are policy, not protocol: any node may run with different
//! values as long as the reserved boundary is respected. Defaults follow
//! the historical constants (10240 objects per sequence, 10240 sequences
//! per meta range, 10240 meta ranges per super range).

use std::time::Duration;

use crate::fid::FID_SEQ_NORMAL;

/// How many sequences a meta-range grant spans.
pub const SEQ_META_WIDTH: u64 = 0x2800;

/// How many sequences a super-range grant spans.
pub const SEQ_SUPER_WIDTH: u64 = SEQ_META_WIDTH * SEQ_META_WIDTH;

/// How many objects may be minted from one sequence.
pub const SEQ_MAX_WIDTH: u64 = 0x2800;

/// Default bound on cached location entries.
pub const FLD_CACHE_CAPACITY: usize = 1024;

/// Default deadline for a grant or remote lookup round trip.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Sequence allocation policy.
#[derive(Clone, Copy, Debug)]
pub struct SeqConfig {
    /// Width of a super-range grant (controller-to-controller).
    pub super_width: u64,
    /// Width of a meta-range grant (allocator-to-controller).
    pub meta_width: u64,
    /// Sequences below this value are never granted.
    pub reserved_boundary: u64,
    /// Deadline applied to grant requests issued over a channel.
    pub grant_timeout: Duration,
}

impl Default for SeqConfig {
    fn default() -> Self {
        Self {
            super_width: SEQ_SUPER_WIDTH,
            meta_width: SEQ_META_WIDTH,
            reserved_boundary: FID_SEQ_NORMAL,
            grant_timeout: RPC_TIMEOUT,
        }
    }
}

impl SeqConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.meta_width > 0, "meta width must be nonzero");
        anyhow::ensure!(
            self.super_width >= self.meta_width,
            "super width {} smaller than meta width {}",
            self.super_width,
            self.meta_width
        );
        Ok(())
    }
}

/// Location database policy.
#[derive(Clone, Copy, Debug)]
pub struct FldConfig {
    /// Bound on cached location entries; least-recently-used beyond this.
    pub cache_capacity: usize,
    /// Deadline applied to remote lookup round trips.
    pub lookup_timeout: Duration,
}

impl Default for FldConfig {
    fn default() -> Self {
        Self {
            cache_capacity: FLD_CACHE_CAPACITY,
            lookup_timeout: RPC_TIMEOUT,
        }
    }
}

impl FldConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.cache_capacity > 0, "cache capacity must be nonzero");
        Ok(())
    }
}
