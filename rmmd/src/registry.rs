use crate::config::MAX_REALM_NUMS;
use crate::error::{Error, Result};
use crate::lifecycle::State;

use tinyvec::ArrayVec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RealmRecord {
    /// Physical address of the realm descriptor.
    pub rd: u64,
    /// Retention reported by the realm in seconds, 0 until it reports one.
    pub rpv: u64,
    pub state: State,
}

impl RealmRecord {
    fn new(rd: u64) -> Self {
        Self {
            rd,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHandle(usize);

impl RecordHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Realms observed being created, bounded by `MAX_REALM_NUMS`.
///
/// Records are never evicted. Observing a creation for a descriptor that is
/// already known restarts its record in place. Descriptor 0 is never tracked.
#[derive(Debug, Default)]
pub struct RealmRegistry {
    records: ArrayVec<[RealmRecord; MAX_REALM_NUMS]>,
}

impl RealmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rd: u64) -> Result<RecordHandle> {
        if rd == 0 {
            return Err(Error::NullDescriptor);
        }
        if let Some(idx) = self.position(rd) {
            self.records[idx] = RealmRecord::new(rd);
            return Ok(RecordHandle(idx));
        }
        if self.is_full() {
            return Err(Error::CapacityExceeded);
        }
        self.records.push(RealmRecord::new(rd));
        Ok(RecordHandle(self.records.len() - 1))
    }

    pub fn lookup(&self, rd: u64) -> Option<RealmRecord> {
        self.records.iter().find(|r| r.rd == rd).copied()
    }

    pub fn get_mut(&mut self, rd: u64) -> Option<&mut RealmRecord> {
        self.records.iter_mut().find(|r| r.rd == rd)
    }

    pub fn get(&self, handle: RecordHandle) -> Option<&RealmRecord> {
        self.records.get(handle.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RealmRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == MAX_REALM_NUMS
    }

    fn position(&self, rd: u64) -> Option<usize> {
        self.records.iter().position(|r| r.rd == rd)
    }
}
