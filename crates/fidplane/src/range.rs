//! Sequence range descriptors.
//!
//! A `SeqRange` is a half-open `[start, end)` slice of the 64-bit sequence
//! space together with the index of the node that owns it. Ranges are the
//! unit of both allocation (grants handed out by the sequence controller)
//! and resolution (rows in the location index).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Allocation class carried by a range.
///
/// Metadata and data ranges are partitioned separately; `Any` matches both
/// classes when filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RangeFlags {
    Mdt = 0x0,
    Ost = 0x1,
    Any = 0x3,
}

impl RangeFlags {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0 => Some(RangeFlags::Mdt),
            0x1 => Some(RangeFlags::Ost),
            0x3 => Some(RangeFlags::Any),
            _ => None,
        }
    }

    /// Whether a range carrying `self` satisfies a filter of `filter`.
    pub const fn matches(self, filter: RangeFlags) -> bool {
        matches!(filter, RangeFlags::Any) || self.bits() == filter.bits()
    }
}

impl fmt::Display for RangeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RangeFlags::Mdt => "mdt",
            RangeFlags::Ost => "ost",
            RangeFlags::Any => "any",
        };
        f.write_str(name)
    }
}

/// Half-open `[start, end)` slice of the sequence space owned by one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeqRange {
    pub start: u64,
    /// Exclusive upper bound. Invariant: `start < end` for any sane range.
    pub end: u64,
    /// Index of the owning node.
    pub owner: u32,
    pub flags: RangeFlags,
}

impl SeqRange {
    pub const fn new(start: u64, end: u64, owner: u32, flags: RangeFlags) -> Self {
        Self {
            start,
            end,
            owner,
            flags,
        }
    }

    /// Zero-width marker range positioned at `at`. Used for "nothing granted
    /// yet" state; `is_sane` is false for these.
    pub const fn empty_at(at: u64, owner: u32, flags: RangeFlags) -> Self {
        Self {
            start: at,
            end: at,
            owner,
            flags,
        }
    }

    pub const fn width(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_sane(&self) -> bool {
        self.start < self.end
    }

    pub const fn is_exhausted(&self) -> bool {
        self.start >= self.end
    }

    pub const fn contains(&self, seq: u64) -> bool {
        self.start <= seq && seq < self.end
    }

    pub const fn intersects(&self, other: &SeqRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#x}-{:#x}):{}:{}",
            self.start, self.end, self.owner, self.flags
        )
    }
}
