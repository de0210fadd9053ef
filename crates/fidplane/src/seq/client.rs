//! Client-side sequence allocator.
//!
//! One instance owns one granted range and hands out sequences from it
//! linearly. The state mutex is held across the grant round trip, which is
//! what keeps allocation strictly linear: concurrent callers hitting an
//! exhausted range queue behind the single in-flight request and observe
//! the freshly installed grant, never a duplicate request or a repeated
//! sequence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::AllocError;
use crate::range::{RangeFlags, SeqRange};
use crate::transport::{SeqChannel, SeqOp};

struct ClientSeqState {
    /// Current grant; exhausted when `next_seq` reaches `granted.end`.
    granted: SeqRange,
    next_seq: u64,
}

pub struct SeqClient {
    /// Which grant this allocator requests when exhausted: `AllocMeta` for
    /// a leaf allocator, `AllocSuper` when this allocator feeds a
    /// downstream controller of its own.
    op: SeqOp,
    channel: Arc<dyn SeqChannel>,
    grant_timeout: Duration,
    state: Mutex<ClientSeqState>,
}

impl SeqClient {
    pub fn new(channel: Arc<dyn SeqChannel>, op: SeqOp, grant_timeout: Duration) -> Self {
        Self {
            op,
            channel,
            grant_timeout,
            state: Mutex::new(ClientSeqState {
                granted: SeqRange::empty_at(0, 0, RangeFlags::Mdt),
                next_seq: 0,
            }),
        }
    }

    /// Allocate the next sequence, requesting a new grant first when the
    /// current range is used up. A failed or timed-out request leaves the
    /// allocator exhausted and retryable; it never burns a sequence.
    pub async fn alloc_seq(&self) -> Result<u64, AllocError> {
        let mut state = self.state.lock().await;
        if state.next_seq >= state.granted.end {
            let granted = tokio::time::timeout(self.grant_timeout, self.channel.alloc(self.op))
                .await
                .map_err(|_| {
                    AllocError::Unavailable(anyhow::anyhow!(
                        "grant request timed out after {:?}",
                        self.grant_timeout
                    ))
                })?
                .map_err(|err| {
                    warn!(error = %err, "sequence grant request failed");
                    err
                })?;
            if !granted.is_sane() {
                return Err(AllocError::Unavailable(anyhow::anyhow!(
                    "controller granted insane range {granted}"
                )));
            }
            debug!(%granted, "installed new sequence grant");
            state.granted = granted;
            state.next_seq = granted.start;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        Ok(seq)
    }

    /// Current grant and position. Diagnostic path.
    pub async fn current(&self) -> (SeqRange, u64) {
        let state = self.state.lock().await;
        (state.granted, state.next_seq)
    }
}
