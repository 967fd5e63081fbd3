//! Restriction tracking and dynamic splitting.
//!
//! A [`RestrictionTracker`] owns one contiguous range of a partition's offset
//! space on behalf of one worker. Claims must be strictly increasing, which
//! makes the offset right after the last claim the only point where the
//! remaining work can be handed off without duplicating or skipping offsets.

use stride_core::Offset;
use tracing::debug;

use crate::error::{TrackerError, TrackerResult};
use crate::range::OffsetRange;

/// Outcome of an accepted split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitResult {
    /// Range kept by the splitting tracker.
    pub primary: OffsetRange,
    /// Range handed back to the scheduler for a new worker.
    pub residual: OffsetRange,
}

/// Work done and left in a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionProgress {
    /// Offsets claimed so far.
    pub completed: u64,
    /// Offsets left before the stop. Unbounded ranges report a huge value.
    pub remaining: u64,
}

/// Tracker enforcing ordered, exclusive claiming within a restriction.
#[derive(Debug, Clone)]
pub struct RestrictionTracker {
    /// Currently owned range. The start never changes.
    range: OffsetRange,
    /// Highest successfully claimed offset.
    last_claim_attempt: Option<Offset>,
    /// Set once a zero-fraction split was accepted.
    checkpointed: bool,
}

impl RestrictionTracker {
    /// Creates a tracker owning `range`.
    #[must_use]
    pub const fn new(range: OffsetRange) -> Self {
        Self {
            range,
            last_claim_attempt: None,
            checkpointed: false,
        }
    }

    /// Returns the currently owned range.
    #[must_use]
    pub const fn current_restriction(&self) -> OffsetRange {
        self.range
    }

    /// Returns the highest successfully claimed offset.
    #[must_use]
    pub const fn last_claim_attempt(&self) -> Option<Offset> {
        self.last_claim_attempt
    }

    /// Returns true once a checkpoint split has been accepted.
    #[must_use]
    pub const fn is_checkpointed(&self) -> bool {
        self.checkpointed
    }

    /// Partitions are treated as unbounded until a split sets a finite stop.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        false
    }

    /// First offset not yet claimed through this tracker.
    const fn frontier(&self) -> Offset {
        match self.last_claim_attempt {
            Some(last) => last.next(),
            None => self.range.start(),
        }
    }

    /// Claims `offset` for processing.
    ///
    /// # Errors
    /// - `OutOfOrder` if `offset` is not above the last claim.
    /// - `BeforeStart` if `offset` is below the range start.
    /// - `PastStop` if `offset` is at or past the range stop.
    ///
    /// Every error means this tracker can no longer serve `offset`.
    pub fn try_claim(&mut self, offset: Offset) -> TrackerResult<()> {
        if let Some(last_claim) = self.last_claim_attempt {
            if offset <= last_claim {
                return Err(TrackerError::OutOfOrder { offset, last_claim });
            }
        }
        if offset < self.range.start() {
            return Err(TrackerError::BeforeStart {
                offset,
                start: self.range.start(),
            });
        }
        if offset >= self.range.stop() {
            return Err(TrackerError::PastStop {
                offset,
                stop: self.range.stop(),
            });
        }

        self.last_claim_attempt = Some(offset);

        // Postcondition: the claim is inside the owned range.
        debug_assert!(self.range.contains(offset));
        Ok(())
    }

    /// Splits off the unclaimed remainder of the restriction.
    ///
    /// The split point is always the first unclaimed offset. A
    /// `fraction_of_remainder` of zero checkpoints the tracker, after which
    /// every split is refused. Returns `None` when the split is refused;
    /// refusal is a no-op and may be retried.
    pub fn try_split(&mut self, fraction_of_remainder: f64) -> Option<SplitResult> {
        if self.checkpointed {
            debug!(range = %self.range, "split refused: tracker is checkpointed");
            return None;
        }
        if !(0.0..=1.0).contains(&fraction_of_remainder) {
            debug!(fraction_of_remainder, "split refused: fraction out of range");
            return None;
        }

        let split_point = self.frontier();
        if split_point > self.range.stop() {
            debug!(range = %self.range, %split_point, "split refused: nothing left to hand off");
            return None;
        }

        // The frontier lies in [start, stop] here, so split_at cannot fail.
        let (primary, residual) = self.range.split_at(split_point).ok()?;

        if fraction_of_remainder == 0.0 {
            self.checkpointed = true;
        }
        let original_stop = self.range.stop();
        self.range = primary;

        // Postconditions: claimed work stays with us, residual stays in bounds.
        debug_assert!(self.last_claim_attempt.map_or(true, |c| c < residual.start()));
        debug_assert!(residual.stop() == original_stop);
        debug_assert!(primary.start() <= residual.start());

        Some(SplitResult { primary, residual })
    }

    /// Reports claimed and remaining work.
    #[must_use]
    pub const fn current_progress(&self) -> RestrictionProgress {
        let frontier = self.frontier();
        RestrictionProgress {
            completed: frontier.distance_from(self.range.start()),
            remaining: self.range.stop().distance_from(frontier),
        }
    }

    /// Verifies that every offset of the owned range was claimed.
    ///
    /// # Errors
    /// Returns `WorkRemaining` if any offset of the range is unclaimed.
    pub const fn check_done(&self) -> TrackerResult<()> {
        let frontier = self.frontier();
        if frontier.get() < self.range.stop().get() {
            return Err(TrackerError::WorkRemaining {
                first_unclaimed: frontier,
                stop: self.range.stop(),
            });
        }
        Ok(())
    }
}
