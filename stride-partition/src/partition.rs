//! Partition state.
//!
//! A partition is an unbounded, append-only offset sequence. Its state is
//! two numbers: the highest offset produced so far and the highest offset
//! fully processed by some worker.

use stride_core::{Offset, PartitionId};

/// Mutable offset-space record for one logical partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionState {
    /// Stable identifier.
    id: PartitionId,
    /// Highest produced offset (inclusive).
    last_offset: Offset,
    /// Highest committed offset.
    committed_offset: Offset,
}

impl PartitionState {
    /// Creates a partition state.
    ///
    /// Callers provide `committed_offset <= last_offset`, as the generator
    /// does; `committed_offset == last_offset + 1` is tolerated.
    #[must_use]
    pub fn new(id: PartitionId, last_offset: Offset, committed_offset: Offset) -> Self {
        // Precondition: the committed frontier never runs past produced data.
        debug_assert!(committed_offset <= last_offset.next());

        Self {
            id,
            last_offset,
            committed_offset,
        }
    }

    /// Returns the partition identifier.
    #[must_use]
    pub const fn id(&self) -> PartitionId {
        self.id
    }

    /// Returns the next offset to process, if it has been produced.
    ///
    /// `None` is not end-of-stream: growth may make an offset available later.
    #[must_use]
    pub fn poll(&self) -> Option<Offset> {
        let offset = self.committed_offset.next();
        if offset > self.last_offset {
            return None;
        }
        Some(offset)
    }

    /// Advances the committed frontier by exactly one offset.
    ///
    /// Only valid right after a successful claim of `committed_offset + 1`;
    /// ordering is the caller's responsibility.
    pub fn commit(&mut self) {
        let before = self.committed_offset;
        self.committed_offset = self.committed_offset.next();

        // Postcondition: frontier moved by one.
        debug_assert_eq!(self.committed_offset.distance_from(before), 1);
    }

    /// Number of offsets ever produced (`last_offset + 1`).
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.last_offset.get().saturating_add(1)
    }

    /// Returns the committed frontier.
    #[must_use]
    pub const fn get_committed_position(&self) -> Offset {
        self.committed_offset
    }

    /// Returns the highest produced offset.
    #[must_use]
    pub const fn last_offset(&self) -> Offset {
        self.last_offset
    }

    /// Produced offsets that have not been committed yet.
    #[must_use]
    pub const fn backlog(&self) -> u64 {
        self.last_offset.distance_from(self.committed_offset)
    }

    /// Appends `n` new offsets at the tail of the partition.
    pub fn add_new_messages(&mut self, n: u64) {
        let before = self.last_offset;
        self.last_offset = self.last_offset.advance(n);

        // Postcondition: size tracks the new tail.
        debug_assert_eq!(self.size(), self.last_offset.get().saturating_add(1));
        debug_assert!(self.last_offset >= before);
    }
}
