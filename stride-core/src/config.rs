//! Simulation tunables.
//!
//! Following TigerStyle: put limits on everything. Every knob of the
//! simulated source has an explicit default and is validated before a run.

use std::time::Duration;

/// Tunables for partition generation, growth injection and poll pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    // Generation.
    /// Number of partitions produced by the generator.
    pub num_partitions: u32,
    /// Upper bound (inclusive) for a partition's initial last offset.
    pub initial_max_size: u64,
    /// Upper bound (inclusive) for a partition's initial committed offset.
    pub max_initial_committed: u64,

    // Processing loop.
    /// Pause between two iterations of a processing loop.
    pub poll_timeout: Duration,
    /// Minimum number of offsets appended by one growth event.
    pub min_add_new_msgs: u64,
    /// Maximum number of offsets appended by one growth event.
    pub max_add_new_msgs: u64,
    /// Per-iteration probability of a spontaneous growth event.
    pub prob_new_msgs: f64,
    /// Consecutive empty polls tolerated before growth is forced.
    pub max_empty_polls: u32,
}

impl SimulationConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            num_partitions: 4,
            initial_max_size: 120,
            max_initial_committed: 20,

            poll_timeout: Duration::from_millis(100),
            min_add_new_msgs: 20,
            max_add_new_msgs: 100,
            prob_new_msgs: 0.01,
            max_empty_polls: 10,
        }
    }

    /// Same tunables with a 1ms poll timeout, for fast tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        let mut config = Self::new();
        config.poll_timeout = Duration::from_millis(1);
        config
    }

    /// Sets the number of generated partitions.
    #[must_use]
    pub const fn with_num_partitions(mut self, num_partitions: u32) -> Self {
        self.num_partitions = num_partitions;
        self
    }

    /// Sets the poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the inclusive range of a growth event's size.
    #[must_use]
    pub const fn with_growth_range(mut self, min: u64, max: u64) -> Self {
        self.min_add_new_msgs = min;
        self.max_add_new_msgs = max;
        self
    }

    /// Sets the per-iteration spontaneous growth probability.
    #[must_use]
    pub const fn with_prob_new_msgs(mut self, prob: f64) -> Self {
        self.prob_new_msgs = prob;
        self
    }

    /// Sets the number of empty polls tolerated before forced growth.
    #[must_use]
    pub const fn with_max_empty_polls(mut self, max_empty_polls: u32) -> Self {
        self.max_empty_polls = max_empty_polls;
        self
    }

    /// Validates that all tunables are internally consistent.
    ///
    /// # Errors
    /// Returns an error if any tunable is out of range.
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_partitions == 0 {
            return Err(crate::Error::InvalidArgument {
                name: "num_partitions",
                reason: "must be positive",
            });
        }

        // The generator draws last_offset from [committed, initial_max_size].
        if self.max_initial_committed > self.initial_max_size {
            return Err(crate::Error::InvalidArgument {
                name: "max_initial_committed",
                reason: "must be <= initial_max_size",
            });
        }

        if self.poll_timeout.is_zero() {
            return Err(crate::Error::InvalidArgument {
                name: "poll_timeout",
                reason: "must be positive",
            });
        }

        if self.min_add_new_msgs == 0 {
            return Err(crate::Error::InvalidArgument {
                name: "min_add_new_msgs",
                reason: "must be positive",
            });
        }

        if self.max_add_new_msgs < self.min_add_new_msgs {
            return Err(crate::Error::InvalidArgument {
                name: "max_add_new_msgs",
                reason: "must be >= min_add_new_msgs",
            });
        }

        if !(0.0..=1.0).contains(&self.prob_new_msgs) {
            return Err(crate::Error::InvalidArgument {
                name: "prob_new_msgs",
                reason: "must be within [0.0, 1.0]",
            });
        }

        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_partitions, 4);
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
        assert_eq!(config.max_empty_polls, 10);
    }

    #[test]
    fn test_testing_config_is_valid() {
        let config = SimulationConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_timeout, Duration::from_millis(1));
    }

    #[test]
    fn test_zero_partitions() {
        let config = SimulationConfig::new().with_num_partitions(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_committed_above_max_size() {
        let mut config = SimulationConfig::new();
        config.max_initial_committed = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_growth_range() {
        let config = SimulationConfig::new().with_growth_range(50, 10);
        assert!(config.validate().is_err());

        let config = SimulationConfig::new().with_growth_range(0, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_probability_out_of_range() {
        assert!(SimulationConfig::new()
            .with_prob_new_msgs(1.5)
            .validate()
            .is_err());
        assert!(SimulationConfig::new()
            .with_prob_new_msgs(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_zero_poll_timeout() {
        let config = SimulationConfig::new().with_poll_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
