//! Persistent range→owner index.
//!
//! Rows live in one keyspace partition keyed by the big-endian range start,
//! so lookup-by-contained-sequence is a reverse scan from the probe key.
//! Every mutation runs under an exclusive lock, commits through a keyspace
//! batch, and is fsynced before the call returns: a crash leaves either the
//! old or the new table, never a partial one.

use std::sync::{Arc, RwLock};

use anyhow::Context;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};

use crate::error::FldError;
use crate::range::{RangeFlags, SeqRange};

const RANGE_PARTITION: &str = "fld_ranges";

pub struct RangeIndex {
    keyspace: Arc<Keyspace>,
    ranges: fjall::PartitionHandle,
    lock: RwLock<()>,
}

impl RangeIndex {
    pub fn open(keyspace: Arc<Keyspace>) -> anyhow::Result<Self> {
        let ranges = keyspace
            .open_partition(RANGE_PARTITION, PartitionCreateOptions::default())
            .context("open range partition")?;
        Ok(Self {
            keyspace,
            ranges,
            lock: RwLock::new(()),
        })
    }

    /// Insert a new range. Fails with `Conflict` if it intersects any
    /// committed entry.
    pub fn create(&self, range: SeqRange) -> Result<(), FldError> {
        if !range.is_sane() {
            return Err(FldError::Invalid(range));
        }

        let _guard = self
            .lock
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // A conflicting entry either starts at/before the new range and
        // extends into it, or starts inside the new range.
        if let Some(prev) = self.predecessor(range.start)? {
            if prev.intersects(&range) {
                return Err(FldError::Conflict(range));
            }
        }
        let mut inside = self
            .ranges
            .range(encode_seq_key(range.start)..encode_seq_key(range.end));
        if let Some(entry) = inside.next() {
            let _ = entry.map_err(FldError::from)?;
            return Err(FldError::Conflict(range));
        }
        drop(inside);

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.ranges,
            encode_seq_key(range.start),
            encode_range_value(&range),
        );
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    /// Remove the entry whose range contains `seq`, returning it.
    pub fn delete(&self, seq: u64) -> Result<SeqRange, FldError> {
        let _guard = self
            .lock
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(found) = self.predecessor(seq)? else {
            return Err(FldError::NotFound(seq));
        };
        if !found.contains(seq) {
            return Err(FldError::NotFound(seq));
        }

        let mut batch = self.keyspace.batch();
        batch.remove(&self.ranges, encode_seq_key(found.start));
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(found)
    }

    /// Resolve the range containing `seq` via predecessor search.
    pub fn lookup(&self, seq: u64) -> Result<SeqRange, FldError> {
        let _guard = self
            .lock
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.predecessor(seq)? {
            Some(range) if range.contains(seq) => Ok(range),
            _ => Err(FldError::NotFound(seq)),
        }
    }

    /// All committed entries ordered by start. Administrative/diagnostic
    /// path; invariant scans in tests use it too.
    pub fn entries(&self) -> Result<Vec<SeqRange>, FldError> {
        let _guard = self
            .lock
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut out = Vec::new();
        for entry in self.ranges.range(Vec::<u8>::new()..) {
            let (key, value) = entry.map_err(FldError::from)?;
            out.push(decode_range(&key, &value)?);
        }
        Ok(out)
    }

    /// Greatest committed entry with `start <= seq`, regardless of whether
    /// it extends far enough to contain `seq`.
    fn predecessor(&self, seq: u64) -> Result<Option<SeqRange>, FldError> {
        let mut iter = self.ranges.range(..=encode_seq_key(seq)).rev();
        match iter.next() {
            None => Ok(None),
            Some(entry) => {
                let (key, value) = entry.map_err(FldError::from)?;
                Ok(Some(decode_range(&key, &value)?))
            }
        }
    }
}

fn encode_seq_key(seq: u64) -> Vec<u8> {
    seq.to_be_bytes().to_vec()
}

fn encode_range_value(range: &SeqRange) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 4 + 4);
    out.extend_from_slice(&range.end.to_be_bytes());
    out.extend_from_slice(&range.owner.to_be_bytes());
    out.extend_from_slice(&range.flags.bits().to_be_bytes());
    out
}

fn decode_range(key: &[u8], value: &[u8]) -> Result<SeqRange, FldError> {
    let parsed = (|| -> anyhow::Result<SeqRange> {
        anyhow::ensure!(key.len() == 8, "short range key");
        anyhow::ensure!(value.len() == 16, "short range value");
        let mut buf8 = [0u8; 8];
        buf8.copy_from_slice(key);
        let start = u64::from_be_bytes(buf8);
        buf8.copy_from_slice(&value[..8]);
        let end = u64::from_be_bytes(buf8);
        let mut buf4 = [0u8; 4];
        buf4.copy_from_slice(&value[8..12]);
        let owner = u32::from_be_bytes(buf4);
        buf4.copy_from_slice(&value[12..16]);
        let bits = u32::from_be_bytes(buf4);
        let flags = RangeFlags::from_bits(bits)
            .ok_or_else(|| anyhow::anyhow!("unknown range flags {bits:#x}"))?;
        Ok(SeqRange::new(start, end, owner, flags))
    })();
    parsed.map_err(FldError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeFlags;

    #[test]
    fn range_value_roundtrip() {
        let range = SeqRange::new(0x2_0000_0400, 0x2_0000_2c00, 7, RangeFlags::Mdt);
        let key = encode_seq_key(range.start);
        let value = encode_range_value(&range);
        let decoded = decode_range(&key, &value).expect("decode");
        assert_eq!(decoded, range);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_range(&[0u8; 8], &[0u8; 3]).is_err());
        // flag bits 0x2 are not a valid class
        let mut value = vec![0u8; 16];
        value[15] = 0x2;
        assert!(decode_range(&[0u8; 8], &value).is_err());
    }
}
