//! Typed request/reply operations exposed to the transport layer.
//!
//! The wire transport itself is out of scope here: callers hand these
//! requests to an opaque channel that delivers each one at most once and
//! leaves timeout/retry to the requester. The loopback implementations
//! below route requests straight into in-process services, which is what
//! single-node deployments and tests use.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AllocError, FldError};
use crate::fld::FldService;
use crate::range::SeqRange;
use crate::seq::SeqController;

/// Operations understood by a sequence controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SeqOp {
    AllocSuper = 0,
    AllocMeta = 1,
}

/// Requests understood by a location server.
#[derive(Clone, Copy, Debug)]
pub enum FldRequest {
    /// Register a range after its grant committed. Admin path.
    Create { range: SeqRange },
    /// Unregister the range containing `seq`. Admin path.
    Delete { seq: u64 },
    /// Resolve the owner of the range containing `seq`. Hot path.
    Lookup { seq: u64 },
}

/// Replies produced by a location server.
#[derive(Clone, Copy, Debug)]
pub enum FldResponse {
    Created,
    Deleted,
    Located { range: SeqRange },
}

/// Request/reply channel to a location server.
#[async_trait]
pub trait FldChannel: Send + Sync + 'static {
    async fn query(&self, req: FldRequest) -> Result<FldResponse, FldError>;
}

/// Request/reply channel to a sequence controller.
#[async_trait]
pub trait SeqChannel: Send + Sync + 'static {
    async fn alloc(&self, op: SeqOp) -> Result<SeqRange, AllocError>;
}

/// In-process channel onto a local location server.
pub struct LocalFldChannel {
    service: Arc<FldService>,
}

impl LocalFldChannel {
    pub fn new(service: Arc<FldService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl FldChannel for LocalFldChannel {
    async fn query(&self, req: FldRequest) -> Result<FldResponse, FldError> {
        self.service.handle(req)
    }
}

/// In-process channel onto a local sequence controller.
pub struct LocalSeqChannel {
    controller: Arc<SeqController>,
}

impl LocalSeqChannel {
    pub fn new(controller: Arc<SeqController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl SeqChannel for LocalSeqChannel {
    async fn alloc(&self, op: SeqOp) -> Result<SeqRange, AllocError> {
        self.controller.handle(op).await
    }
}
