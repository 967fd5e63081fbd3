//! Deterministic simulation of workers sharing growing partitions.
//!
//! Every test replays seeded interleavings of processing steps and split
//! requests and runs the property checker over the whole history.

use std::collections::BTreeMap;

use crate::scenarios::seeds::{CI_SEED_COUNT, REGRESSION_SEEDS};
use crate::scenarios::workloads;
use crate::simulation::{Simulation, SimulationParams, SimulationReport};

fn run(params: SimulationParams) -> SimulationReport {
    Simulation::new(params).run()
}

fn assert_clean(report: &SimulationReport) {
    assert!(
        report.is_ok(),
        "seed {}: {} violations, first: {}",
        report.seed,
        report.violations.len(),
        report.violations[0]
    );
}

#[test]
fn test_dst_processing_steady_regression_seeds() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::steady(seed));
        assert_clean(&report);
        assert!(!report.records.is_empty(), "seed {seed}: nothing emitted");
    }
}

#[test]
fn test_dst_processing_unsplit_keeps_one_worker_per_partition() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::unsplit(seed));
        assert_clean(&report);
        assert_eq!(report.workers_spawned, 4);
        // Unbounded restrictions never reject a claim.
        assert_eq!(report.workers_terminated, 0);
    }
}

#[test]
fn test_dst_processing_split_heavy() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::split_heavy(seed));
        assert_clean(&report);
        assert!(report.splits > 0, "seed {seed}: no split happened");
        assert_eq!(report.workers_spawned, 4 + report.splits);
    }
}

#[test]
fn test_dst_processing_checkpoint_only() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::checkpoint_only(seed));
        assert_clean(&report);
    }
}

#[test]
fn test_dst_processing_bursty_growth() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::bursty_growth(seed));
        assert_clean(&report);
    }
}

#[test]
fn test_dst_processing_starved_partitions_recover() {
    for &seed in REGRESSION_SEEDS {
        let report = run(workloads::starved(seed).with_ticks(5_000));
        assert_clean(&report);
        assert!(!report.records.is_empty(), "seed {seed}: nothing emitted");
    }
}

#[test]
fn test_dst_processing_ci_seeds() {
    for base_seed in 0..u64::from(CI_SEED_COUNT) {
        let seed = base_seed * 12345 + 42;
        let report = run(workloads::split_heavy(seed).with_ticks(500));
        assert_clean(&report);
    }
}

#[test]
fn test_dst_processing_committed_matches_emitted() {
    for &seed in REGRESSION_SEEDS {
        let sim = Simulation::new(workloads::split_heavy(seed));
        let initial: BTreeMap<u64, u64> = sim
            .partitions()
            .iter()
            .map(|p| (p.id().get(), p.get_committed_position().get()))
            .collect();
        let report = sim.run();
        assert_clean(&report);

        let mut emitted: BTreeMap<u64, u64> = BTreeMap::new();
        for record in &report.records {
            *emitted.entry(record.partition_id.get()).or_default() += 1;
        }

        assert_eq!(report.partitions.len(), initial.len());
        for partition in &report.partitions {
            let id = partition.id().get();
            let count = emitted.get(&id).copied().unwrap_or(0);
            assert_eq!(
                partition.get_committed_position().get(),
                initial[&id] + count,
                "seed {seed}: partition {id} committed frontier drifted"
            );
        }
    }
}

#[test]
fn test_dst_processing_exact_replay() {
    let first = run(workloads::split_heavy(42));
    let second = run(workloads::split_heavy(42));

    assert_eq!(first.records, second.records, "Same seed must produce identical records");
    assert_eq!(first.splits, second.splits);
    assert_eq!(first.workers_terminated, second.workers_terminated);
}

#[test]
fn test_dst_processing_different_seeds_diverge() {
    let mut patterns: Vec<Vec<(u64, u64, u64)>> = [1, 42, 123, 999, 12345, 54321, 0xDEAD, 0xBEEF]
        .into_iter()
        .map(|seed| {
            run(workloads::split_heavy(seed).with_ticks(300))
                .records
                .iter()
                .map(|r| (r.partition_id.get(), r.worker_id.get(), r.offset.get()))
                .collect()
        })
        .collect();

    patterns.sort();
    patterns.dedup();
    assert!(
        patterns.len() >= 2,
        "Different seeds should produce at least 2 unique patterns, got {}",
        patterns.len()
    );
}
