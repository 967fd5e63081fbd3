//! Restriction tracking error types.

use stride_core::Offset;
use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors raised by offset ranges and restriction trackers.
///
/// Every claim rejection is terminal for the worker that saw it: the tracker
/// can no longer serve the offset, so the worker stops rather than retries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// Range bounds are inverted.
    #[error("invalid range [{start}, {stop})")]
    InvalidRange {
        /// Requested start.
        start: Offset,
        /// Requested stop.
        stop: Offset,
    },

    /// Claim is not above the last successful claim.
    #[error("offset {offset} claimed out of order, last claim was {last_claim}")]
    OutOfOrder {
        /// The rejected offset.
        offset: Offset,
        /// The last successfully claimed offset.
        last_claim: Offset,
    },

    /// Claim is below the start of the restriction.
    #[error("offset {offset} is below restriction start {start}")]
    BeforeStart {
        /// The rejected offset.
        offset: Offset,
        /// Start of the owned range.
        start: Offset,
    },

    /// Claim is at or past the stop of the restriction.
    #[error("offset {offset} is at or past restriction stop {stop}")]
    PastStop {
        /// The rejected offset.
        offset: Offset,
        /// Stop of the owned range.
        stop: Offset,
    },

    /// The restriction still has unclaimed offsets.
    #[error("work remaining in [{first_unclaimed}, {stop})")]
    WorkRemaining {
        /// First offset that was never claimed.
        first_unclaimed: Offset,
        /// Stop of the owned range.
        stop: Offset,
    },
}
