//! FID location subsystem.
//!
//! This crate implements the metadata-location core of a distributed
//! filesystem: a hierarchical, lease-based allocator that partitions the
//! 64-bit sequence space into non-overlapping grants, and the location
//! database (FLD) that maps sequences back to the node owning them. The
//! API surface is intentionally small: higher layers supply `FldChannel`/
//! `SeqChannel` transports and a `fjall` keyspace, then drive allocation
//! through `seq::SeqClient`/`seq::FidMinter` and resolution through
//! `fld::FldClient`/`fld::FldService`.
//!
//! Durability model: every grant boundary and every index mutation is
//! committed and fsynced before the operation acknowledges. After a crash
//! the persisted boundaries alone reconstruct allocator state and the
//! range table alone reconstructs resolution state; a grant whose reply
//! was lost is leaked, never reissued.

pub mod config;
pub mod error;
pub mod fid;
pub mod fld;
pub mod range;
pub mod seq;
pub mod transport;
