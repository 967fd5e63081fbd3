//! Restriction lifecycle interface.
//!
//! A scheduler never builds restrictions or trackers itself. It asks a
//! [`RestrictionProvider`] for the initial restriction of a partition, a
//! tracker for each restriction it assigns, a size estimate, and finally a
//! record stream for the (partition, tracker) pair.

use futures::stream::{BoxStream, StreamExt};
use rand_chacha::ChaCha8Rng;
use stride_core::{SimulationConfig, WorkerId};
use stride_partition::{OffsetRange, PartitionState, RestrictionTracker};

use crate::processing::{ProcessingLoop, SharedPartition, SharedTracker};
use crate::record::ProcessedRecord;

/// Creates restrictions and processes them.
pub trait RestrictionProvider: Send + Sync + 'static {
    /// Restriction covering all unprocessed offsets of `partition`.
    fn initial_restriction(&self, partition: &PartitionState) -> OffsetRange;

    /// Tracker owning `restriction`.
    fn create_tracker(&self, restriction: OffsetRange) -> RestrictionTracker;

    /// Estimate of the work contained in `restriction`.
    fn restriction_size(&self, partition: &PartitionState, restriction: &OffsetRange) -> u64;

    /// Lazy stream of records produced while `tracker` keeps accepting claims.
    ///
    /// Calling it again with a new tracker resumes from the partition's
    /// committed frontier.
    fn process(
        &self,
        worker_id: WorkerId,
        partition: SharedPartition,
        tracker: SharedTracker,
        rng: ChaCha8Rng,
    ) -> BoxStream<'static, ProcessedRecord>;
}

/// Provider for simulated partitions that grow while they are consumed.
#[derive(Debug, Clone, Default)]
pub struct PartitionProcessor {
    config: SimulationConfig,
}

impl PartitionProcessor {
    /// Creates a provider using `config` for every processing loop.
    #[must_use]
    pub const fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

impl RestrictionProvider for PartitionProcessor {
    fn initial_restriction(&self, partition: &PartitionState) -> OffsetRange {
        OffsetRange::unbounded(partition.get_committed_position().next())
    }

    fn create_tracker(&self, restriction: OffsetRange) -> RestrictionTracker {
        RestrictionTracker::new(restriction)
    }

    fn restriction_size(&self, _partition: &PartitionState, restriction: &OffsetRange) -> u64 {
        restriction.len()
    }

    fn process(
        &self,
        worker_id: WorkerId,
        partition: SharedPartition,
        tracker: SharedTracker,
        rng: ChaCha8Rng,
    ) -> BoxStream<'static, ProcessedRecord> {
        ProcessingLoop::new(worker_id, partition, tracker, self.config, rng)
            .into_stream()
            .boxed()
    }
}
