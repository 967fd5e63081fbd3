//! Initial partition generation and per-worker randomness.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stride_core::{Offset, PartitionId, SimulationConfig, WorkerId};
use stride_partition::PartitionState;

/// Generates `config.num_partitions` partitions with random initial offsets.
///
/// Partition `k` gets id `k`, a committed offset drawn from
/// `[0, max_initial_committed]` and a last offset drawn from
/// `[committed, initial_max_size]`. The config must be valid.
pub fn generate_partitions<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Vec<PartitionState> {
    // Precondition: validated config keeps both draws non-empty.
    debug_assert!(config.max_initial_committed <= config.initial_max_size);

    (0..u64::from(config.num_partitions))
        .map(|k| {
            let committed = rng.gen_range(0..=config.max_initial_committed);
            let last = rng.gen_range(committed..=config.initial_max_size);
            PartitionState::new(PartitionId::new(k), Offset::new(last), Offset::new(committed))
        })
        .collect()
}

/// Returns the random source of `worker_id` within the run seeded by `seed`.
///
/// Workers of one run share the seed but read disjoint ChaCha streams.
#[must_use]
pub fn worker_rng(seed: u64, worker_id: WorkerId) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(worker_id.get());
    rng
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_configured_partition_count() {
        let config = SimulationConfig::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let partitions = generate_partitions(&config, &mut rng);

        assert_eq!(partitions.len(), 4);
        for (k, partition) in partitions.iter().enumerate() {
            assert_eq!(partition.id(), PartitionId::new(k as u64));
        }
    }

    #[test]
    fn test_initial_offsets_within_bounds() {
        let config = SimulationConfig::new().with_num_partitions(64);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for partition in generate_partitions(&config, &mut rng) {
            let committed = partition.get_committed_position().get();
            let last = partition.last_offset().get();
            assert!(committed <= config.max_initial_committed);
            assert!(committed <= last);
            assert!(last <= config.initial_max_size);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = SimulationConfig::new();
        let a = generate_partitions(&config, &mut ChaCha8Rng::seed_from_u64(99));
        let b = generate_partitions(&config, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_worker_rngs_differ() {
        let mut a = worker_rng(1, WorkerId::new(0));
        let mut b = worker_rng(1, WorkerId::new(1));
        let mut a_again = worker_rng(1, WorkerId::new(0));

        let first: u64 = a.gen();
        assert_ne!(first, b.gen::<u64>());
        assert_eq!(first, a_again.gen::<u64>());
    }
}
