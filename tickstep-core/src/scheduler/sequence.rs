//! Acceleration sequence pool
//!
//! Each axis owns a singly linked list of future acceleration changes and
//! callback markers, sorted by the period they apply to. Entries come
//! from one fixed pool shared by all axes and are recycled through a
//! free stack, so list edits never allocate.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of sequence entries shared by all axes
pub const SEQ_POOL_SIZE: usize = 64;

/// Index of an entry in the pool
pub type SeqIndex = u16;

/// What a sequence entry does when its period comes up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeqAction {
    /// Replace the axis acceleration
    Accelerate(i32),
    /// Invoke the user callback
    Callback,
}

impl SeqAction {
    /// Check whether this is a callback marker
    pub fn is_callback(&self) -> bool {
        matches!(self, SeqAction::Callback)
    }
}

/// One pooled sequence entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccSeq {
    /// Period the entry applies to
    pub period: u32,
    /// Effect of the entry
    pub action: SeqAction,
    pub(crate) next: Option<SeqIndex>,
}

impl AccSeq {
    const EMPTY: Self = Self {
        period: 0,
        action: SeqAction::Callback,
        next: None,
    };

    /// Following entry in the same list
    pub fn next(&self) -> Option<SeqIndex> {
        self.next
    }
}

/// Fixed pool of sequence entries
#[derive(Debug)]
pub struct SeqPool<const N: usize> {
    entries: [AccSeq; N],
    free: Vec<SeqIndex, N>,
}

impl<const N: usize> Default for SeqPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SeqPool<N> {
    const INDEX_FITS: () = assert!(N <= SeqIndex::MAX as usize + 1, "sequence pool too large");

    /// Create a pool with every entry free
    pub fn new() -> Self {
        let () = Self::INDEX_FITS;
        let mut free = Vec::new();
        // Lowest index on top of the stack
        for i in (0..N).rev() {
            let _ = free.push(i as SeqIndex);
        }
        Self {
            entries: [AccSeq::EMPTY; N],
            free,
        }
    }

    /// Number of free entries
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Take an entry from the pool
    pub fn allocate(&mut self, period: u32, action: SeqAction) -> Option<SeqIndex> {
        let index = self.free.pop()?;
        self.entries[index as usize] = AccSeq {
            period,
            action,
            next: None,
        };
        Some(index)
    }

    /// Return a single entry to the pool
    pub fn release(&mut self, index: SeqIndex) {
        self.entries[index as usize].next = None;
        let _ = self.free.push(index);
    }

    /// Return a whole list to the pool
    pub fn release_chain(&mut self, head: Option<SeqIndex>) {
        let mut cursor = head;
        while let Some(index) = cursor {
            cursor = self.entries[index as usize].next;
            self.release(index);
        }
    }

    /// Build a linked list from `(period, action)` pairs
    ///
    /// Returns `None` when the input is empty or the pool runs out; in
    /// the latter case everything taken so far is given back.
    pub fn chain(&mut self, entries: &[(u32, SeqAction)]) -> Option<SeqIndex> {
        let mut head = None;
        let mut tail: Option<SeqIndex> = None;
        for &(period, action) in entries {
            let Some(index) = self.allocate(period, action) else {
                self.release_chain(head);
                return None;
            };
            match tail {
                Some(t) => self.entries[t as usize].next = Some(index),
                None => head = Some(index),
            }
            tail = Some(index);
        }
        head
    }

    /// Entry behind an index
    pub fn get(&self, index: SeqIndex) -> &AccSeq {
        &self.entries[index as usize]
    }

    pub(crate) fn set_next(&mut self, index: SeqIndex, next: Option<SeqIndex>) {
        self.entries[index as usize].next = next;
    }

    /// Iterate `(period, action)` pairs of a list
    pub fn iter(&self, head: Option<SeqIndex>) -> SeqIter<'_, N> {
        SeqIter {
            pool: self,
            cursor: head,
        }
    }
}

/// Iterator over one sequence list
pub struct SeqIter<'a, const N: usize> {
    pool: &'a SeqPool<N>,
    cursor: Option<SeqIndex>,
}

impl<const N: usize> Iterator for SeqIter<'_, N> {
    type Item = (u32, SeqAction);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.pool.get(self.cursor?);
        self.cursor = entry.next;
        Some((entry.period, entry.action))
    }
}
