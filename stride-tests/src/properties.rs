//! Property definitions and checkers for Stride simulation tests.
//!
//! Properties are invariants that must hold throughout a run, no matter how
//! worker steps and split requests interleave. The checker is fed every
//! emitted record and periodic partition snapshots, and collects violations
//! instead of panicking so a failing seed reports everything it broke.

use std::collections::{BTreeMap, BTreeSet};

use stride_core::{Offset, WorkerId};
use stride_partition::{OffsetRange, PartitionState, RestrictionTracker, TrackerError};
use stride_runner::ProcessedRecord;

// ============================================================================
// Property Violation Types
// ============================================================================

/// A violation of a consumption property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyViolation {
    /// A record arrived for a partition that was never registered.
    UnknownPartition {
        /// The partition ID.
        partition: u64,
    },
    /// An offset was emitted twice.
    DuplicateOffset {
        /// The partition ID.
        partition: u64,
        /// The repeated offset.
        offset: u64,
        /// The worker that emitted it the second time.
        worker: u64,
    },
    /// An offset was emitted before all lower offsets were.
    OffsetGap {
        /// The partition ID.
        partition: u64,
        /// The offset that should have come next.
        expected: u64,
        /// The offset that was emitted instead.
        actual: u64,
    },
    /// A worker emitted an offset not above its previous one.
    NonIncreasingClaim {
        /// The worker ID.
        worker: u64,
        /// The worker's previous offset.
        previous: u64,
        /// The offending offset.
        offset: u64,
    },
    /// A worker emitted an offset outside its current restriction.
    ClaimOutsideRestriction {
        /// The worker ID.
        worker: u64,
        /// The offending offset.
        offset: u64,
        /// Restriction start (inclusive).
        start: u64,
        /// Restriction stop (exclusive).
        stop: u64,
    },
    /// The committed frontier does not match the emitted count.
    CommittedMismatch {
        /// The partition ID.
        partition: u64,
        /// Initial committed offset plus emitted records.
        expected: u64,
        /// Observed committed offset.
        actual: u64,
    },
    /// A poll returned an offset that has not been produced.
    PollPastLast {
        /// The partition ID.
        partition: u64,
        /// The polled offset.
        polled: u64,
        /// The partition's last offset.
        last: u64,
    },
    /// A worker stopped with part of its restriction unclaimed.
    UnfinishedRestriction {
        /// The worker ID.
        worker: u64,
        /// First unclaimed offset.
        first_unclaimed: u64,
        /// Restriction stop (exclusive).
        stop: u64,
    },
}

impl std::fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPartition { partition } => {
                write!(f, "Record for unregistered partition {partition}")
            }
            Self::DuplicateOffset {
                partition,
                offset,
                worker,
            } => {
                write!(
                    f,
                    "Offset {offset} of partition {partition} emitted again by worker {worker}"
                )
            }
            Self::OffsetGap {
                partition,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Gap in partition {partition}: expected offset {expected}, got {actual}"
                )
            }
            Self::NonIncreasingClaim {
                worker,
                previous,
                offset,
            } => {
                write!(
                    f,
                    "Worker {worker} emitted offset {offset} after offset {previous}"
                )
            }
            Self::ClaimOutsideRestriction {
                worker,
                offset,
                start,
                stop,
            } => {
                write!(
                    f,
                    "Worker {worker} emitted offset {offset} outside [{start}, {stop})"
                )
            }
            Self::CommittedMismatch {
                partition,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Partition {partition} committed at {actual}, expected {expected}"
                )
            }
            Self::PollPastLast {
                partition,
                polled,
                last,
            } => {
                write!(
                    f,
                    "Partition {partition} polled offset {polled} past last offset {last}"
                )
            }
            Self::UnfinishedRestriction {
                worker,
                first_unclaimed,
                stop,
            } => {
                write!(
                    f,
                    "Worker {worker} stopped with [{first_unclaimed}, {stop}) unclaimed"
                )
            }
        }
    }
}

// ============================================================================
// Property Checker
// ============================================================================

/// Emission history of one partition.
#[derive(Debug, Clone)]
struct PartitionHistory {
    initial_committed: u64,
    emitted: u64,
    seen: BTreeSet<u64>,
}

impl PartitionHistory {
    const fn expected_committed(&self) -> u64 {
        self.initial_committed + self.emitted
    }
}

/// Accumulates property violations over a run.
#[derive(Debug, Default)]
pub struct PropertyChecker {
    partitions: BTreeMap<u64, PartitionHistory>,
    last_offsets: BTreeMap<u64, u64>,
    violations: Vec<PropertyViolation>,
    /// Number of checks performed.
    pub checks_performed: u64,
}

impl PropertyChecker {
    /// Creates an empty checker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `partition` from its current committed offset.
    pub fn register_partition(&mut self, partition: &PartitionState) {
        self.partitions.insert(
            partition.id().get(),
            PartitionHistory {
                initial_committed: partition.get_committed_position().get(),
                emitted: 0,
                seen: BTreeSet::new(),
            },
        );
    }

    /// Checks a record against the partition's emission order and the
    /// emitting worker's previous records.
    pub fn check_record(&mut self, record: &ProcessedRecord) {
        self.checks_performed += 1;
        let partition = record.partition_id.get();
        let worker = record.worker_id.get();
        let offset = record.offset.get();

        if let Some(&previous) = self.last_offsets.get(&worker) {
            if offset <= previous {
                self.violations.push(PropertyViolation::NonIncreasingClaim {
                    worker,
                    previous,
                    offset,
                });
            }
        }
        self.last_offsets.insert(worker, offset);

        let Some(history) = self.partitions.get_mut(&partition) else {
            self.violations
                .push(PropertyViolation::UnknownPartition { partition });
            return;
        };

        if !history.seen.insert(offset) {
            self.violations.push(PropertyViolation::DuplicateOffset {
                partition,
                offset,
                worker,
            });
            return;
        }

        let expected = history.expected_committed() + 1;
        if offset != expected {
            self.violations.push(PropertyViolation::OffsetGap {
                partition,
                expected,
                actual: offset,
            });
        }
        history.emitted += 1;
    }

    /// Checks that `offset`, just emitted by `worker`, lies in `restriction`.
    pub fn check_claim_in_restriction(
        &mut self,
        worker: WorkerId,
        offset: Offset,
        restriction: &OffsetRange,
    ) {
        self.checks_performed += 1;
        if !restriction.contains(offset) {
            self.violations
                .push(PropertyViolation::ClaimOutsideRestriction {
                    worker: worker.get(),
                    offset: offset.get(),
                    start: restriction.start().get(),
                    stop: restriction.stop().get(),
                });
        }
    }

    /// Checks the committed frontier and poll bound of `partition`.
    pub fn check_partition(&mut self, partition: &PartitionState) {
        self.checks_performed += 1;
        let id = partition.id().get();

        if let Some(polled) = partition.poll() {
            if polled > partition.last_offset() {
                self.violations.push(PropertyViolation::PollPastLast {
                    partition: id,
                    polled: polled.get(),
                    last: partition.last_offset().get(),
                });
            }
        }

        let Some(history) = self.partitions.get(&id) else {
            self.violations
                .push(PropertyViolation::UnknownPartition { partition: id });
            return;
        };
        let actual = partition.get_committed_position().get();
        if actual != history.expected_committed() {
            self.violations.push(PropertyViolation::CommittedMismatch {
                partition: id,
                expected: history.expected_committed(),
                actual,
            });
        }
    }

    /// Checks that a worker stopped by `reason` left nothing unclaimed.
    pub fn check_terminated(
        &mut self,
        worker: WorkerId,
        tracker: &RestrictionTracker,
        reason: &TrackerError,
    ) {
        self.checks_performed += 1;
        tracing::debug!(%worker, %reason, "checking terminated worker");
        if let Err(TrackerError::WorkRemaining {
            first_unclaimed,
            stop,
        }) = tracker.check_done()
        {
            self.violations
                .push(PropertyViolation::UnfinishedRestriction {
                    worker: worker.get(),
                    first_unclaimed: first_unclaimed.get(),
                    stop: stop.get(),
                });
        }
    }

    /// Records emitted for `partition` so far.
    #[must_use]
    pub fn emitted(&self, partition: u64) -> u64 {
        self.partitions.get(&partition).map_or(0, |h| h.emitted)
    }

    /// Returns all violations found.
    #[must_use]
    pub fn violations(&self) -> &[PropertyViolation] {
        &self.violations
    }

    /// Consumes the checker, returning its violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<PropertyViolation> {
        self.violations
    }

    /// Returns true if no violation was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}
