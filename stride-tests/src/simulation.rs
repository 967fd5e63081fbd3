//! Single-threaded simulation driver.
//!
//! Runs real [`ProcessingLoop`]s over shared partition state, but calls
//! [`ProcessingLoop::step`] directly instead of spawning tasks. A seeded
//! `ChaCha8Rng` picks, at every tick, either a worker to step or a worker to
//! split, so one seed always replays the same interleaving.

use std::sync::{Arc, Mutex, PoisonError};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stride_core::{SimulationConfig, WorkerId};
use stride_partition::{OffsetRange, PartitionState};
use stride_runner::{
    generate_partitions, worker_rng, PartitionProcessor, ProcessedRecord, ProcessingLoop,
    RestrictionProvider, SharedPartition, SharedTracker, StepOutcome,
};
use tracing::debug;

use crate::properties::{PropertyChecker, PropertyViolation};

/// Knobs of one simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    /// Seed for partitions, interleaving and worker randomness.
    pub seed: u64,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Probability that a tick requests a split instead of stepping.
    pub split_probability: f64,
    /// Probability that a split request uses fraction zero.
    pub checkpoint_probability: f64,
    /// Partition and growth settings.
    pub config: SimulationConfig,
}

impl SimulationParams {
    /// Default parameters for `seed`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            ticks: 2_000,
            split_probability: 0.05,
            checkpoint_probability: 0.1,
            config: SimulationConfig::for_testing(),
        }
    }

    /// Sets the number of ticks.
    #[must_use]
    pub const fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Sets the split probability per tick.
    #[must_use]
    pub const fn with_split_probability(mut self, probability: f64) -> Self {
        self.split_probability = probability;
        self
    }

    /// Sets the probability of a checkpoint split.
    #[must_use]
    pub const fn with_checkpoint_probability(mut self, probability: f64) -> Self {
        self.checkpoint_probability = probability;
        self
    }

    /// Sets the partition and growth settings.
    #[must_use]
    pub const fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Seed of the run.
    pub seed: u64,
    /// Every emitted record, in emission order.
    pub records: Vec<ProcessedRecord>,
    /// Splits that produced a non-empty residual.
    pub splits: u64,
    /// Split requests that were refused.
    pub refused_splits: u64,
    /// Workers spawned, including the initial one per partition.
    pub workers_spawned: u64,
    /// Workers stopped by a rejected claim.
    pub workers_terminated: u64,
    /// Property violations found.
    pub violations: Vec<PropertyViolation>,
    /// Partition states at the end of the run.
    pub partitions: Vec<PartitionState>,
}

impl SimulationReport {
    /// Returns true if no property was violated.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

struct SimWorker {
    id: WorkerId,
    partition: SharedPartition,
    tracker: SharedTracker,
    processing: ProcessingLoop<ChaCha8Rng>,
    live: bool,
}

/// A deterministic multi-worker run.
pub struct Simulation {
    params: SimulationParams,
    rng: ChaCha8Rng,
    provider: PartitionProcessor,
    partitions: Vec<SharedPartition>,
    workers: Vec<SimWorker>,
    checker: PropertyChecker,
    report: SimulationReport,
}

impl Simulation {
    /// Generates the partitions for `params` and assigns one worker to each.
    ///
    /// # Panics
    /// Panics if `params.config` is invalid.
    #[must_use]
    pub fn new(params: SimulationParams) -> Self {
        assert!(params.config.validate().is_ok(), "invalid simulation config");

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut checker = PropertyChecker::new();
        let states = generate_partitions(&params.config, &mut rng);
        for state in &states {
            checker.register_partition(state);
        }

        let mut sim = Self {
            params,
            rng,
            provider: PartitionProcessor::new(params.config),
            partitions: Vec::new(),
            workers: Vec::new(),
            checker,
            report: SimulationReport {
                seed: params.seed,
                records: Vec::new(),
                splits: 0,
                refused_splits: 0,
                workers_spawned: 0,
                workers_terminated: 0,
                violations: Vec::new(),
                partitions: Vec::new(),
            },
        };

        for state in states {
            let restriction = sim.provider.initial_restriction(&state);
            let partition = Arc::new(Mutex::new(state));
            sim.partitions.push(Arc::clone(&partition));
            sim.spawn(partition, restriction);
        }
        sim
    }

    /// Runs every tick and returns the report.
    #[must_use]
    pub fn run(mut self) -> SimulationReport {
        for _ in 0..self.params.ticks {
            let live: Vec<usize> = self
                .workers
                .iter()
                .enumerate()
                .filter(|(_, w)| w.live)
                .map(|(i, _)| i)
                .collect();
            let Some(&index) = live.choose(&mut self.rng) else {
                break;
            };

            if self.rng.gen::<f64>() < self.params.split_probability {
                self.split(index);
            } else {
                self.step(index);
            }
        }

        for state in self.partitions() {
            self.checker.check_partition(&state);
            self.report.partitions.push(state);
        }
        self.report.violations = self.checker.into_violations();
        self.report
    }

    fn step(&mut self, index: usize) {
        let worker = &mut self.workers[index];
        let outcome = worker.processing.step();
        let tracker = worker.tracker.lock().unwrap_or_else(PoisonError::into_inner);

        match outcome {
            StepOutcome::Emitted(record) => {
                self.checker.check_record(&record);
                self.checker.check_claim_in_restriction(
                    worker.id,
                    record.offset,
                    &tracker.current_restriction(),
                );
                self.report.records.push(record);
            }
            StepOutcome::Waiting => {}
            StepOutcome::Terminated(reason) => {
                self.checker.check_terminated(worker.id, &tracker, &reason);
                worker.live = false;
                self.report.workers_terminated += 1;
            }
        }
        drop(tracker);

        let state = worker.partition.lock().unwrap_or_else(PoisonError::into_inner);
        self.checker.check_partition(&state);
    }

    fn split(&mut self, index: usize) {
        let fraction = if self.rng.gen::<f64>() < self.params.checkpoint_probability {
            0.0
        } else {
            self.rng.gen_range(0.0..=1.0)
        };

        let worker = &self.workers[index];
        let split = worker
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_split(fraction);
        let Some(split) = split else {
            self.report.refused_splits += 1;
            return;
        };

        debug!(
            worker = %worker.id,
            primary = %split.primary,
            residual = %split.residual,
            fraction,
            "simulated split"
        );
        if split.residual.is_empty() {
            return;
        }
        self.report.splits += 1;
        let partition = Arc::clone(&worker.partition);
        self.spawn(partition, split.residual);
    }

    fn spawn(&mut self, partition: SharedPartition, restriction: OffsetRange) {
        let id = WorkerId::new(self.report.workers_spawned);
        self.report.workers_spawned += 1;

        let tracker = Arc::new(Mutex::new(self.provider.create_tracker(restriction)));
        let processing = ProcessingLoop::new(
            id,
            Arc::clone(&partition),
            Arc::clone(&tracker),
            self.params.config,
            worker_rng(self.params.seed, id),
        );
        self.workers.push(SimWorker {
            id,
            partition,
            tracker,
            processing,
            live: true,
        });
    }

    /// Returns a snapshot of every partition.
    #[must_use]
    pub fn partitions(&self) -> Vec<PartitionState> {
        self.partitions
            .iter()
            .map(|p| p.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }
}
