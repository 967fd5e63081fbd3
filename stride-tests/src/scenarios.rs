//! Reusable test scenarios for Stride simulation.
//!
//! Workloads bundle the split pressure and growth behavior a test wants, so
//! the same shape can be replayed across many seeds.

use stride_core::SimulationConfig;

use crate::simulation::SimulationParams;

/// Common workload shapes.
pub mod workloads {
    use super::{SimulationConfig, SimulationParams};

    /// Occasional splits, mostly steady consumption.
    #[must_use]
    pub const fn steady(seed: u64) -> SimulationParams {
        SimulationParams::new(seed)
    }

    /// No split requests at all: one worker per partition.
    #[must_use]
    pub const fn unsplit(seed: u64) -> SimulationParams {
        SimulationParams::new(seed).with_split_probability(0.0)
    }

    /// A split request on a third of all ticks.
    #[must_use]
    pub const fn split_heavy(seed: u64) -> SimulationParams {
        SimulationParams::new(seed)
            .with_split_probability(0.33)
            .with_checkpoint_probability(0.05)
    }

    /// Every split request checkpoints the split worker.
    #[must_use]
    pub const fn checkpoint_only(seed: u64) -> SimulationParams {
        SimulationParams::new(seed)
            .with_split_probability(0.1)
            .with_checkpoint_probability(1.0)
    }

    /// Partitions grow on most steps, in small bursts.
    #[must_use]
    pub const fn bursty_growth(seed: u64) -> SimulationParams {
        let config = SimulationConfig::for_testing()
            .with_prob_new_msgs(0.5)
            .with_growth_range(1, 5);
        SimulationParams::new(seed)
            .with_split_probability(0.1)
            .with_config(config)
    }

    /// Partitions only grow once workers have waited too long.
    #[must_use]
    pub const fn starved(seed: u64) -> SimulationParams {
        let config = SimulationConfig::for_testing()
            .with_prob_new_msgs(0.0)
            .with_max_empty_polls(2)
            .with_num_partitions(2);
        SimulationParams::new(seed)
            .with_split_probability(0.1)
            .with_config(config)
    }
}

/// Seeds for reproducible testing.
pub mod seeds {
    /// Standard test seeds that have historically found bugs.
    pub const REGRESSION_SEEDS: &[u64] = &[
        42,
        12345,
        0xDEAD_BEEF,
        999,
        7777,
        0x1337,
        0xCAFE_BABE,
        1,
        u64::MAX,
        0,
    ];

    /// Number of random seeds to test in CI.
    pub const CI_SEED_COUNT: u32 = 100;
}
