//! Stride Tests - Deterministic Simulation Testing for Stride.
//!
//! This crate contains the DST (Deterministic Simulation Testing) and
//! integration tests for Stride.
//!
//! ## Test Organization
//!
//! **DST Tests** (`*_dst.rs`): seeded interleaving of worker steps and splits
//! - `processing_dst`: many workers over shared growing partitions
//!
//! **Integration Tests** (`*_tests.rs`): full async stack
//! - `scheduler_tests`: scheduler, spawned workers and output channel
//!
//! **Support Modules**:
//! - `simulation`: single-threaded driver over real processing loops
//! - `properties`: invariant checker (`DuplicateOffset`, `OffsetGap`, etc.)
//! - `scenarios`: reusable workloads and regression seeds
//!
//! ## Naming Conventions
//!
//! - DST tests: `test_dst_<component>_<scenario>`
//! - Integration tests: `test_<component>_<scenario>`
//! - Unit tests: Inline in each crate under `#[cfg(test)]`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod properties;
pub mod scenarios;
pub mod simulation;

// DST test modules (deterministic simulation).
#[cfg(test)]
mod processing_dst;
