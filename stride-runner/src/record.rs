//! Output records.

use stride_core::{Offset, PartitionId, WorkerId};

/// One processed offset, as delivered to the output consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    /// Partition the offset belongs to.
    pub partition_id: PartitionId,
    /// Worker that claimed the offset.
    pub worker_id: WorkerId,
    /// The processed offset.
    pub offset: Offset,
    /// `"Processed: {offset}   Last: {size}"`.
    pub message: String,
}

impl ProcessedRecord {
    /// Builds the record for `offset` of a partition holding `size` offsets.
    #[must_use]
    pub fn new(partition_id: PartitionId, worker_id: WorkerId, offset: Offset, size: u64) -> Self {
        Self {
            partition_id,
            worker_id,
            offset,
            message: format!("Processed: {offset}   Last: {size}"),
        }
    }
}
