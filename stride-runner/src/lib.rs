//! Stride Runner - drives workers over growing, splittable partitions.
//!
//! This crate wires the partition state and restriction tracker from
//! `stride-partition` into running workers:
//!
//! - [`ProcessingLoop`]: the poll → claim → emit → commit → grow cycle for one
//!   (partition, restriction) pair.
//! - [`RestrictionProvider`]: the interface a scheduler uses to create
//!   restrictions, trackers and output streams.
//! - [`generate_partitions`]: seeded generation of the initial partitions.
//! - [`Scheduler`]: one tokio task per live restriction, with dynamic splits
//!   that hand the residual to a new worker.
//!
//! # Shared State
//!
//! A split leaves two workers pointing at the same partition. Each worker
//! holds the partition lock for a whole poll → commit step, and the tracker
//! sits behind its own lock so the scheduler can split it while the worker
//! sleeps. Locks are always taken partition first, tracker second.
//!
//! # Determinism
//!
//! Every worker owns a `ChaCha8Rng` derived from the run seed and its worker
//! id, so a run is reproducible given its seed and split schedule.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod generator;
mod processing;
mod provider;
mod record;
mod scheduler;

pub use generator::{generate_partitions, worker_rng};
pub use processing::{LoopState, ProcessingLoop, SharedPartition, SharedTracker, StepOutcome};
pub use provider::{PartitionProcessor, RestrictionProvider};
pub use record::ProcessedRecord;
pub use scheduler::Scheduler;
