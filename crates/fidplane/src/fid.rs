//! File identifiers and the reserved-sequence policy.

use std::fmt;

/// First sequence value outside the legacy/interop space. Sequences below
/// this are addressable but never minted by this subsystem.
pub const FID_SEQ_START: u64 = 0x2_0000_0000;

/// First sequence eligible for general allocation. Everything in
/// `[FID_SEQ_START, FID_SEQ_NORMAL)` is reserved for bootstrap and internal
/// objects (root directory, local files, quota indexes and the like).
pub const FID_SEQ_NORMAL: u64 = 0x2_0000_0400;

/// Globally unique object identifier.
///
/// `sequence` determines the owning node (via the location database),
/// `object_id` distinguishes objects within a sequence, and `version` is
/// opaque metadata reserved for future reuse/versioning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fid {
    pub sequence: u64,
    pub object_id: u32,
    pub version: u32,
}

impl Fid {
    pub const fn new(sequence: u64, object_id: u32, version: u32) -> Self {
        Self {
            sequence,
            object_id,
            version,
        }
    }

    /// Whether the sequence belongs to the generally allocatable space.
    pub const fn is_norm(&self) -> bool {
        self.sequence >= FID_SEQ_NORMAL
    }

    /// Whether the sequence is reserved for bootstrap/internal use.
    pub const fn is_reserved(&self) -> bool {
        self.sequence < FID_SEQ_NORMAL
    }

    /// A fid is sane when it names a real object: a nonzero sequence and a
    /// nonzero object id.
    pub const fn is_sane(&self) -> bool {
        self.sequence != 0 && self.object_id != 0
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#x}:{:#x}:{:#x}]",
            self.sequence, self.object_id, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_boundary() {
        assert!(Fid::new(FID_SEQ_NORMAL, 1, 0).is_norm());
        assert!(Fid::new(FID_SEQ_NORMAL - 1, 1, 0).is_reserved());
        assert!(Fid::new(FID_SEQ_START, 1, 0).is_reserved());
    }

    #[test]
    fn sanity() {
        assert!(Fid::new(FID_SEQ_NORMAL, 1, 0).is_sane());
        assert!(!Fid::new(0, 1, 0).is_sane());
        assert!(!Fid::new(FID_SEQ_NORMAL, 0, 0).is_sane());
    }
}
