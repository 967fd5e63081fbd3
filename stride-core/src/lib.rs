//! Stride Core - Strongly-typed identifiers and configuration for Stride.
//!
//! This crate provides the vocabulary shared by every Stride crate: partition
//! and worker identifiers, the [`Offset`] type that indexes a partition's
//! offset space, the simulation tunables and the core error type.
//!
//! # Design Principles (TigerStyle)
//!
//! - **Strongly-typed IDs**: Prevent mixing up `WorkerId` with `PartitionId`
//! - **Explicit limits**: Every simulation tunable is validated up front
//! - **Explicit types**: Use u32/u64, not usize
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod types;

pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use types::{Offset, PartitionId, WorkerId};
