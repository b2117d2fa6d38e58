use crate::config::MAX_REALM_NUMS;

use tinyvec::ArrayVec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    /// Counter value at which the deadline expires.
    pub at: u64,
    pub rd: u64,
}

/// Pending deadlines ordered by expiry, at most one per realm.
///
/// The head is what the secure timer is programmed with.
#[derive(Debug, Default)]
pub struct DeadlineQueue {
    entries: ArrayVec<[Deadline; MAX_REALM_NUMS]>,
}

impl DeadlineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the deadline of `rd`, if any, with one at `at`.
    ///
    /// Deadlines expiring at the same time keep their insertion order.
    pub fn schedule(&mut self, rd: u64, at: u64) -> bool {
        self.cancel(rd);
        if self.entries.len() == self.entries.capacity() {
            return false;
        }
        let idx = self
            .entries
            .iter()
            .position(|d| d.at > at)
            .unwrap_or(self.entries.len());
        self.entries.insert(idx, Deadline { at, rd });
        true
    }

    pub fn cancel(&mut self, rd: u64) -> Option<Deadline> {
        let idx = self.entries.iter().position(|d| d.rd == rd)?;
        Some(self.entries.remove(idx))
    }

    pub fn peek(&self) -> Option<&Deadline> {
        self.entries.first()
    }

    pub fn earliest(&self) -> Option<u64> {
        self.peek().map(|d| d.at)
    }

    /// Removes the head if it has expired at `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Deadline> {
        match self.peek() {
            Some(d) if d.at <= now => Some(self.entries.remove(0)),
            _ => None,
        }
    }

    pub fn contains(&self, rd: u64) -> bool {
        self.entries.iter().any(|d| d.rd == rd)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
