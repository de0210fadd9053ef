//! Error taxonomy for location and allocation operations.

use thiserror::Error;

use crate::range::SeqRange;

/// Errors surfaced by the location database (index, service, client).
#[derive(Debug, Error)]
pub enum FldError {
    /// Attempted create intersects a committed range. Administrative
    /// callers decide how to repartition; never retried automatically.
    #[error("range {0} overlaps an existing entry")]
    Conflict(SeqRange),

    /// Rejected before touching storage: `start >= end`.
    #[error("invalid range {0}")]
    Invalid(SeqRange),

    /// No committed range covers the sequence. For lookups this means
    /// "consult the parent/authoritative server", not a fatal error.
    #[error("sequence {0:#x} is not covered by any range")]
    NotFound(u64),

    /// Remote location server unreachable or timed out. Retryable.
    #[error("location service unavailable: {0}")]
    Unavailable(anyhow::Error),

    /// Backing store transaction failed. The operation did not commit.
    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

impl From<fjall::Error> for FldError {
    fn from(err: fjall::Error) -> Self {
        FldError::Storage(err.into())
    }
}

/// Errors surfaced by the sequence allocation layer.
#[derive(Debug, Error)]
pub enum AllocError {
    /// Controller unreachable or timed out. Retryable with backoff; a
    /// duplicate retry can at worst leak the original grant, never reissue
    /// it.
    #[error("sequence controller unavailable: {0}")]
    Unavailable(anyhow::Error),

    /// The address space (or the configured slice of it) is used up.
    /// Fatal; requires operator intervention.
    #[error("sequence space exhausted")]
    Exhausted,

    /// Boundary persistence failed. No grant was issued.
    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

impl From<fjall::Error> for AllocError {
    fn from(err: fjall::Error) -> Self {
        AllocError::Storage(err.into())
    }
}

impl From<serde_json::Error> for AllocError {
    fn from(err: serde_json::Error) -> Self {
        AllocError::Storage(err.into())
    }
}
