//! Fid minting on top of the sequence allocator.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::client::SeqClient;
use crate::error::AllocError;
use crate::fid::Fid;

/// Mints fids from granted sequences. Object ids within a sequence are
/// monotonic from 1 and never reused; when a sequence's capacity is spent
/// the minter rolls to a fresh sequence from the allocator.
pub struct FidMinter {
    allocator: Arc<SeqClient>,
    /// Objects per sequence. Object id 0 is reserved as a sentinel.
    max_objects: u64,
    /// Last minted fid; `sequence == 0` until the first mint.
    current: Mutex<Fid>,
}

impl FidMinter {
    pub fn new(allocator: Arc<SeqClient>, max_objects: u64) -> Self {
        Self {
            allocator,
            max_objects: max_objects.clamp(1, u32::MAX as u64),
            current: Mutex::new(Fid::default()),
        }
    }

    pub async fn mint_fid(&self) -> Result<Fid, AllocError> {
        let mut current = self.current.lock().await;
        if current.sequence == 0 || u64::from(current.object_id) >= self.max_objects {
            let sequence = self.allocator.alloc_seq().await?;
            debug!(sequence, "minter switched to new sequence");
            *current = Fid::new(sequence, 0, 0);
        }
        current.object_id += 1;
        Ok(*current)
    }
}
