//! Stride Partition - growing partitions and split-aware restriction tracking.
//!
//! This crate provides the two stateful pieces a worker needs to consume a
//! partition whose offset space keeps growing:
//!
//! - [`PartitionState`]: the committed frontier and the highest produced
//!   offset of one partition.
//! - [`RestrictionTracker`]: the claimable sub-range `[start, stop)` owned by
//!   one worker, with monotonic claims and dynamic splitting.
//!
//! # Split Protocol
//!
//! Offsets are claimed strictly in increasing order, Kafka-style. The only
//! safe split point is therefore the first offset past the last successful
//! claim: the tracker keeps `[start, split_point)` and hands
//! `[split_point, stop)` back as the residual. A split with a zero fraction
//! is a checkpoint and forbids any further split.
//!
//! ```text
//!   start        last claim   split_point                 stop
//!     |---claimed---|X|-------------residual------------------|
//!     \_____ retained _____/
//! ```
//!
//! # `TigerStyle` Principles
//!
//! - Explicit preconditions and postconditions via `debug_assert!`
//! - Typed claim rejections instead of silent booleans
//! - No unsafe code

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod partition;
mod range;
mod tracker;

pub use error::{TrackerError, TrackerResult};
pub use partition::PartitionState;
pub use range::OffsetRange;
pub use tracker::{RestrictionProgress, RestrictionTracker, SplitResult};
