//! Restriction scheduling.
//!
//! The scheduler owns the live workers. Assigning a partition creates its
//! initial restriction and spawns a worker; splitting a live worker narrows
//! its tracker and spawns a new worker for the residual against the same
//! partition state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use stride_core::{Error, Offset, PartitionId, Result, WorkerId};
use stride_partition::{OffsetRange, PartitionState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::generator::worker_rng;
use crate::processing::{forward, SharedPartition, SharedTracker};
use crate::provider::{PartitionProcessor, RestrictionProvider};
use crate::record::ProcessedRecord;

/// A spawned worker and the handles the scheduler keeps on it.
#[derive(Debug)]
struct Worker {
    partition_id: PartitionId,
    partition: SharedPartition,
    tracker: SharedTracker,
    task: JoinHandle<u64>,
}

/// Spawns one tokio task per live restriction.
///
/// Finished workers are forgotten the next time a worker is spawned; the
/// records they delivered are kept in a running total for [`join`](Self::join).
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Scheduler<P = PartitionProcessor> {
    provider: Arc<P>,
    seed: u64,
    next_worker_id: WorkerId,
    workers: BTreeMap<WorkerId, Worker>,
    /// Records delivered by workers already pruned from `workers`.
    delivered: u64,
    output: mpsc::UnboundedSender<ProcessedRecord>,
}

impl<P: RestrictionProvider> Scheduler<P> {
    /// Creates a scheduler delivering records to `output`.
    ///
    /// Worker random sources are derived from `seed`.
    #[must_use]
    pub fn new(provider: P, seed: u64, output: mpsc::UnboundedSender<ProcessedRecord>) -> Self {
        Self {
            provider: Arc::new(provider),
            seed,
            next_worker_id: WorkerId::new(0),
            workers: BTreeMap::new(),
            delivered: 0,
            output,
        }
    }

    /// Assigns the initial restriction of `partition` to a new worker.
    pub fn assign(&mut self, partition: PartitionState) -> WorkerId {
        let restriction = self.provider.initial_restriction(&partition);
        self.spawn(Arc::new(Mutex::new(partition)), restriction)
    }

    /// Splits the restriction of `worker_id` and hands the residual to a new
    /// worker.
    ///
    /// Returns the new worker's id, or `None` if the split was refused, the
    /// worker has already finished, or the residual is empty.
    ///
    /// # Errors
    /// Returns `NotFound` if `worker_id` was never spawned.
    pub fn try_split(&mut self, worker_id: WorkerId, fraction: f64) -> Result<Option<WorkerId>> {
        let Some(worker) = self.lookup(worker_id)? else {
            debug!(worker = %worker_id, "split skipped: worker finished");
            return Ok(None);
        };

        if worker.task.is_finished() {
            debug!(worker = %worker_id, "split skipped: worker finished");
            return Ok(None);
        }

        let split = worker
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_split(fraction);
        let Some(split) = split else {
            return Ok(None);
        };

        info!(
            worker = %worker_id,
            partition = %worker.partition_id,
            primary = %split.primary,
            residual = %split.residual,
            fraction,
            "split restriction"
        );

        if split.residual.is_empty() {
            return Ok(None);
        }
        let partition = Arc::clone(&worker.partition);
        Ok(Some(self.spawn(partition, split.residual)))
    }

    /// Estimate of the work left to `worker_id`.
    ///
    /// A finished worker that has already been forgotten has nothing left.
    ///
    /// # Errors
    /// Returns `NotFound` if `worker_id` was never spawned.
    pub fn restriction_size(&self, worker_id: WorkerId) -> Result<u64> {
        let Some(worker) = self.lookup(worker_id)? else {
            return Ok(0);
        };
        let partition = worker.partition.lock().unwrap_or_else(PoisonError::into_inner);
        let tracker = worker.tracker.lock().unwrap_or_else(PoisonError::into_inner);

        // Only the unclaimed part of the restriction is left to do.
        let frontier = tracker.last_claim_attempt().map_or(
            tracker.current_restriction().start(),
            Offset::next,
        );
        let remaining = OffsetRange::new(frontier, tracker.current_restriction().stop())
            .unwrap_or_else(|_| OffsetRange::unbounded(Offset::MAX));
        Ok(self.provider.restriction_size(&partition, &remaining))
    }

    /// Ids of workers whose task is still running, in spawn order.
    #[must_use]
    pub fn live_workers(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|(_, worker)| !worker.task.is_finished())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Aborts every worker task.
    pub fn shutdown(&self) {
        for (id, worker) in &self.workers {
            if !worker.task.is_finished() {
                debug!(worker = %id, "aborting worker");
                worker.task.abort();
            }
        }
    }

    /// Waits for every worker to finish and returns the records delivered.
    ///
    /// Aborted workers count as having delivered nothing.
    pub async fn join(self) -> u64 {
        let mut delivered = self.delivered;
        for (_, worker) in self.workers {
            delivered += worker.task.await.unwrap_or(0);
        }
        delivered
    }

    /// Finds a tracked worker. `Ok(None)` means it was spawned and has since
    /// been pruned.
    fn lookup(&self, worker_id: WorkerId) -> Result<Option<&Worker>> {
        if worker_id >= self.next_worker_id {
            return Err(Error::NotFound {
                resource: "worker",
                id: worker_id.get(),
            });
        }
        Ok(self.workers.get(&worker_id))
    }

    /// Drops finished workers, keeping the count of what they delivered.
    fn prune_finished(&mut self) {
        let delivered = &mut self.delivered;
        self.workers.retain(|id, worker| {
            if !worker.task.is_finished() {
                return true;
            }
            // A finished task resolves on its first poll.
            let count = (&mut worker.task)
                .now_or_never()
                .and_then(std::result::Result::ok)
                .unwrap_or(0);
            debug!(worker = %id, delivered = count, "pruned finished worker");
            *delivered += count;
            false
        });
    }

    fn spawn(&mut self, partition: SharedPartition, restriction: OffsetRange) -> WorkerId {
        self.prune_finished();

        let worker_id = self.next_worker_id;
        self.next_worker_id = worker_id.next();

        let partition_id = partition.lock().unwrap_or_else(PoisonError::into_inner).id();
        let tracker = Arc::new(Mutex::new(self.provider.create_tracker(restriction)));
        let records = self.provider.process(
            worker_id,
            Arc::clone(&partition),
            Arc::clone(&tracker),
            worker_rng(self.seed, worker_id),
        );

        let task = tokio::spawn(forward(worker_id, records, self.output.clone()));

        info!(
            worker = %worker_id,
            partition = %partition_id,
            %restriction,
            "spawned worker"
        );

        self.workers.insert(
            worker_id,
            Worker {
                partition_id,
                partition,
                tracker,
                task,
            },
        );
        worker_id
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use stride_core::SimulationConfig;

    use super::*;

    fn quiet_scheduler() -> (Scheduler, mpsc::UnboundedReceiver<ProcessedRecord>) {
        let config = SimulationConfig::for_testing().with_prob_new_msgs(0.0);
        let (tx, rx) = mpsc::unbounded_channel();
        (Scheduler::new(PartitionProcessor::new(config), 42, tx), rx)
    }

    fn make_partition(id: u64, last: u64, committed: u64) -> PartitionState {
        PartitionState::new(PartitionId::new(id), Offset::new(last), Offset::new(committed))
    }

    #[tokio::test(start_paused = true)]
    async fn test_assign_processes_backlog() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let worker = scheduler.assign(make_partition(0, 9, 4));
        assert_eq!(scheduler.live_workers(), vec![worker]);

        let offsets: Vec<u64> = {
            let mut out = Vec::new();
            for _ in 0..5 {
                out.push(rx.recv().await.unwrap().offset.get());
            }
            out
        };
        assert_eq!(offsets, vec![5, 6, 7, 8, 9]);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_hands_residual_to_new_worker() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let first = scheduler.assign(make_partition(0, 200, 0));

        let mut seen = Vec::new();
        for _ in 0..10 {
            seen.push(rx.recv().await.unwrap());
        }

        let second = scheduler.try_split(first, 0.5).unwrap().unwrap();
        assert_ne!(first, second);

        for _ in 0..20 {
            seen.push(rx.recv().await.unwrap());
        }
        scheduler.shutdown();

        // Every offset is processed once, in order, by one worker or the other.
        let offsets: Vec<u64> = seen.iter().map(|r| r.offset.get()).collect();
        assert_eq!(offsets, (1..=30).collect::<Vec<_>>());

        let mut by_worker: HashMap<WorkerId, Vec<u64>> = HashMap::new();
        for record in &seen {
            by_worker.entry(record.worker_id).or_default().push(record.offset.get());
        }
        let max_first = by_worker[&first].iter().max().copied().unwrap();
        let min_second = by_worker[&second].iter().min().copied().unwrap();
        assert!(max_first < min_second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retained_worker_stops_after_split() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let first = scheduler.assign(make_partition(0, 200, 0));
        rx.recv().await.unwrap();

        let second = scheduler.try_split(first, 0.5).unwrap().unwrap();
        for _ in 0..5 {
            rx.recv().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.live_workers(), vec![second]);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_refuses_second_split() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let first = scheduler.assign(make_partition(0, 200, 0));
        rx.recv().await.unwrap();

        assert!(scheduler.try_split(first, 0.0).unwrap().is_some());
        assert_eq!(scheduler.try_split(first, 0.5).unwrap(), None);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_unknown_worker() {
        let (mut scheduler, _rx) = quiet_scheduler();
        assert_eq!(
            scheduler.try_split(WorkerId::new(9), 0.5),
            Err(Error::NotFound {
                resource: "worker",
                id: 9,
            })
        );
        assert!(scheduler.restriction_size(WorkerId::new(9)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restriction_size_shrinks_with_split() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let first = scheduler.assign(make_partition(0, 200, 0));
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }

        scheduler.try_split(first, 0.5).unwrap();
        // Everything the first worker kept has already been claimed.
        assert_eq!(scheduler.restriction_size(first).unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_after_shutdown() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        scheduler.assign(make_partition(0, 50, 0));
        scheduler.assign(make_partition(1, 50, 0));
        rx.recv().await.unwrap();

        scheduler.shutdown();
        assert_eq!(scheduler.join().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_finished_worker_is_noop() {
        let config = SimulationConfig::for_testing().with_prob_new_msgs(0.0);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(PartitionProcessor::new(config), 1, tx);
        let first = scheduler.assign(make_partition(0, 200, 0));

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = scheduler.try_split(first, 0.0).unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(!scheduler.live_workers().contains(&first));
        assert_eq!(scheduler.try_split(first, 0.5).unwrap(), None);
        assert!(scheduler.live_workers().contains(&second));
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_splits_prune_finished_workers() {
        let (mut scheduler, mut rx) = quiet_scheduler();
        let first = scheduler.assign(make_partition(0, 5_000, 0));
        let mut worker = first;

        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(3)).await;
            worker = scheduler.try_split(worker, 0.5).unwrap().unwrap();
            // The worker just split and its residual; older ones have finished.
            assert!(scheduler.workers.len() <= 3, "tracking {}", scheduler.workers.len());
        }
        tokio::time::sleep(Duration::from_millis(3)).await;
        assert_eq!(scheduler.live_workers(), vec![worker]);

        // Forgotten workers are finished, not unknown.
        assert_eq!(scheduler.try_split(first, 0.5).unwrap(), None);
        assert_eq!(scheduler.restriction_size(first).unwrap(), 0);

        scheduler.shutdown();
        let delivered = scheduler.join().await;
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        // Only the aborted workers' counts are lost.
        assert!(delivered > 0);
        assert!(delivered <= received);
    }
}
