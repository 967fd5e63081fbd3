//! The poll → claim → emit → commit → grow processing loop.
//!
//! One [`ProcessingLoop`] runs per (partition, restriction) pair. Each
//! [`step`](ProcessingLoop::step) is synchronous and fully determined by the
//! loop's random source, which keeps simulation tests reproducible; the
//! async drivers only add the poll pause between steps.
//!
//! ```text
//!            ┌────────────── offset ready ───────────────┐
//!            ▼                                           │
//!   Polling ──▶ Claiming ──▶ Emitting ──▶ Committing ────┘
//!      │  ▲         │
//!      ▼  │         └── claim rejected ──▶ Terminated
//!     Waiting
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, Stream, StreamExt};
use rand::Rng;
use stride_core::{SimulationConfig, WorkerId};
use stride_partition::{PartitionState, RestrictionTracker, TrackerError};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::record::ProcessedRecord;

/// Partition state shared by every worker of one partition.
pub type SharedPartition = Arc<Mutex<PartitionState>>;

/// Tracker shared between its worker and the scheduler.
pub type SharedTracker = Arc<Mutex<RestrictionTracker>>;

/// Position of a loop in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// About to poll the partition.
    Polling,
    /// Claiming the polled offset.
    Claiming,
    /// Building the output record for the claimed offset.
    Emitting,
    /// Committing the claimed offset.
    Committing,
    /// No offset was ready on the last poll.
    Waiting,
    /// A claim was rejected; the loop is done.
    Terminated,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// An offset was claimed, committed and turned into a record.
    Emitted(ProcessedRecord),
    /// No offset was ready.
    Waiting,
    /// The tracker rejected the polled offset.
    Terminated(TrackerError),
}

/// Processing loop of one worker.
#[derive(Debug)]
pub struct ProcessingLoop<R> {
    worker_id: WorkerId,
    partition: SharedPartition,
    tracker: SharedTracker,
    config: SimulationConfig,
    rng: R,
    state: LoopState,
    /// Empty polls since the last forced growth.
    empty_polls: u32,
    /// Offsets emitted by this loop.
    emitted: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Steps never panic while holding a lock, so a poisoned guard is intact.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: Rng> ProcessingLoop<R> {
    /// Creates a loop for `tracker`'s restriction of `partition`.
    #[must_use]
    pub const fn new(
        worker_id: WorkerId,
        partition: SharedPartition,
        tracker: SharedTracker,
        config: SimulationConfig,
        rng: R,
    ) -> Self {
        Self {
            worker_id,
            partition,
            tracker,
            config,
            rng,
            state: LoopState::Polling,
            empty_polls: 0,
            emitted: 0,
        }
    }

    /// Returns the worker id.
    #[must_use]
    pub const fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Returns the number of records emitted so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Returns the number of empty polls since the last forced growth.
    #[must_use]
    pub const fn empty_polls(&self) -> u32 {
        self.empty_polls
    }

    /// Returns true once a claim has been rejected.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == LoopState::Terminated
    }

    /// Runs one iteration without pausing.
    ///
    /// The partition lock is held for the whole iteration, so a claimed
    /// offset is committed before any other worker of the partition polls.
    pub fn step(&mut self) -> StepOutcome {
        let partition_lock = Arc::clone(&self.partition);
        let mut partition = lock(&partition_lock);

        self.state = LoopState::Polling;
        let outcome = match partition.poll() {
            Some(offset) => {
                self.state = LoopState::Claiming;
                let claim = lock(&self.tracker).try_claim(offset);
                if let Err(err) = claim {
                    debug!(
                        worker = %self.worker_id,
                        partition = %partition.id(),
                        %offset,
                        error = %err,
                        "claim rejected, stopping"
                    );
                    self.state = LoopState::Terminated;
                    return StepOutcome::Terminated(err);
                }

                self.state = LoopState::Emitting;
                let record =
                    ProcessedRecord::new(partition.id(), self.worker_id, offset, partition.size());

                self.state = LoopState::Committing;
                partition.commit();
                self.emitted += 1;

                // Postcondition: the claimed offset is now the committed frontier.
                debug_assert_eq!(partition.get_committed_position(), offset);

                StepOutcome::Emitted(record)
            }
            None => {
                self.state = LoopState::Waiting;
                self.empty_polls += 1;
                debug!(
                    worker = %self.worker_id,
                    partition = %partition.id(),
                    empty_polls = self.empty_polls,
                    "empty poll, waiting"
                );
                StepOutcome::Waiting
            }
        };

        self.inject_growth(&mut partition);
        outcome
    }

    /// Simulates producers appending to the partition.
    fn inject_growth(&mut self, partition: &mut PartitionState) {
        let forced = self.empty_polls > self.config.max_empty_polls;
        if !forced && self.rng.gen::<f64>() >= self.config.prob_new_msgs {
            return;
        }

        let count = self.growth_amount();
        partition.add_new_messages(count);
        if forced {
            self.empty_polls = 0;
            info!(
                worker = %self.worker_id,
                partition = %partition.id(),
                count,
                backlog = partition.backlog(),
                "waited too long, adding messages"
            );
        } else {
            info!(
                worker = %self.worker_id,
                partition = %partition.id(),
                count,
                backlog = partition.backlog(),
                "new messages arrived"
            );
        }
    }

    fn growth_amount(&mut self) -> u64 {
        self.rng
            .gen_range(self.config.min_add_new_msgs..=self.config.max_add_new_msgs)
    }
}

impl<R: Rng + Send + 'static> ProcessingLoop<R> {
    /// Turns the loop into a lazy stream of records.
    ///
    /// The stream pauses `poll_timeout` after every iteration and ends when a
    /// claim is rejected. Nothing runs until the stream is polled.
    pub fn into_stream(self) -> impl Stream<Item = ProcessedRecord> + Send + 'static {
        stream::unfold((self, false), |(mut lp, pause)| async move {
            if pause {
                tokio::time::sleep(lp.config.poll_timeout).await;
            }
            loop {
                match lp.step() {
                    StepOutcome::Emitted(record) => return Some((record, (lp, true))),
                    StepOutcome::Waiting => {
                        tokio::time::sleep(lp.config.poll_timeout).await;
                    }
                    StepOutcome::Terminated(_) => return None,
                }
            }
        })
    }
}

/// Sends every record of `records` to `output` until either side ends.
///
/// Returns the number of records delivered. This is the body of every
/// spawned worker task.
pub(crate) async fn forward<S>(
    worker_id: WorkerId,
    records: S,
    output: mpsc::UnboundedSender<ProcessedRecord>,
) -> u64
where
    S: Stream<Item = ProcessedRecord>,
{
    let mut records = std::pin::pin!(records);
    let mut delivered = 0;
    while let Some(record) = records.next().await {
        if output.send(record).is_err() {
            break;
        }
        delivered += 1;
    }
    debug!(worker = %worker_id, delivered, "worker finished");
    delivered
}
