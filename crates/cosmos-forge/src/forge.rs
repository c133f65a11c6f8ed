//! The worker pool that runs chunk builds and collision samples.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashMap;

use crate::worker::{JobKind, JobOutcome, WorkerJob, WorkerReply, worker_loop};
use crate::{DeleteTask, ForgeError, Task, TaskId, TaskResult};

/// Anything that accepts forge tasks. Chunk trees submit through this trait
/// so they can be driven by a recording queue in tests.
pub trait TaskQueue {
    /// Enqueue a task and return its id. Never blocks.
    fn submit(&mut self, task: Task) -> Result<TaskId, ForgeError>;
}

/// Everything the forge produced during one [`ChunkForge::update`].
#[derive(Debug, Default)]
pub struct ForgeUpdate {
    /// Finished builds and height samples.
    pub results: Vec<TaskResult>,
    /// Deletions whose replacement builds are no longer queued or running.
    pub released: Vec<DeleteTask>,
    /// Tasks that panicked on a worker and were dropped.
    pub faulted: Vec<TaskId>,
}

impl ForgeUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.released.is_empty() && self.faulted.is_empty()
    }
}

/// Counters since the forge was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForgeStats {
    pub builds_submitted: u64,
    pub deletes_submitted: u64,
    pub collisions_submitted: u64,
    pub results_delivered: u64,
    pub deletes_released: u64,
    pub cancelled: u64,
    pub faulted: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Idle,
    Busy(TaskId),
}

struct WorkerSlot {
    state: SlotState,
    jobs: Option<Sender<WorkerJob>>,
    handle: Option<JoinHandle<()>>,
}

struct QueuedJob {
    id: TaskId,
    kind: JobKind,
}

/// Pool of worker threads, one per slot.
///
/// Tasks are dispatched in submission order to idle slots. Each slot runs at
/// most one task at a time and goes `Idle -> Busy -> Idle`. Deletions are kept
/// on the main thread until the builds replacing the deleted chunk are done.
pub struct ChunkForge {
    slots: Vec<WorkerSlot>,
    replies: Receiver<WorkerReply>,
    queue: VecDeque<QueuedJob>,
    /// Cancellation flags of every queued or running job.
    in_flight: FxHashMap<TaskId, Arc<AtomicBool>>,
    deletions: Vec<DeleteTask>,
    next_id: u64,
    stats: ForgeStats,
    disposed: bool,
}

impl ChunkForge {
    /// Start a forge with `worker_count` threads (at least one).
    pub fn new(worker_count: usize) -> Result<Self, ForgeError> {
        let worker_count = worker_count.max(1);
        let (reply_sender, replies) = unbounded::<WorkerReply>();

        let mut slots = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (job_sender, job_receiver) = unbounded::<WorkerJob>();
            let reply_sender = reply_sender.clone();
            let handle = std::thread::Builder::new()
                .name(format!("chunk-forge-{index}"))
                .spawn(move || worker_loop(index, job_receiver, reply_sender))
                .map_err(|source| ForgeError::Spawn { index, source })?;
            slots.push(WorkerSlot {
                state: SlotState::Idle,
                jobs: Some(job_sender),
                handle: Some(handle),
            });
        }

        tracing::info!(workers = worker_count, "chunk forge started");
        Ok(Self {
            slots,
            replies,
            queue: VecDeque::new(),
            in_flight: FxHashMap::default(),
            deletions: Vec::new(),
            next_id: 0,
            stats: ForgeStats::default(),
            disposed: false,
        })
    }

    /// Start a forge with one worker per core, leaving one for the main thread.
    pub fn with_defaults() -> Result<Self, ForgeError> {
        Self::new(num_cpus::get().saturating_sub(1).max(1))
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of jobs waiting for a worker.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of slots currently running a job.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Busy(_)))
            .count()
    }

    /// Returns `true` while jobs are queued or running or deletions are held.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty() || self.busy_count() > 0 || !self.deletions.is_empty()
    }

    /// Returns `true` if `id` is queued or running.
    #[must_use]
    pub fn is_in_flight(&self, id: TaskId) -> bool {
        self.in_flight.contains_key(&id)
    }

    #[must_use]
    pub fn stats(&self) -> ForgeStats {
        self.stats
    }

    /// Request cooperative cancellation of a queued or running job.
    ///
    /// A queued job is discarded without being dispatched; a running build
    /// stops at its next grid row. Unknown ids are ignored.
    pub fn cancel(&mut self, id: TaskId) {
        if let Some(flag) = self.in_flight.get(&id) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Advance the forge by one frame.
    ///
    /// Collects finished jobs first, then dispatches queued jobs to idle
    /// slots in FIFO order, then releases deletions that no longer wait on
    /// a queued or running build.
    pub fn update(&mut self) -> ForgeUpdate {
        let mut update = ForgeUpdate::default();
        self.collect_replies(&mut update);
        self.dispatch(&mut update);
        self.release_deletions(&mut update);
        update
    }

    fn collect_replies(&mut self, update: &mut ForgeUpdate) {
        while let Ok(reply) = self.replies.try_recv() {
            let slot = &mut self.slots[reply.slot];
            debug_assert_eq!(slot.state, SlotState::Busy(reply.id));
            slot.state = SlotState::Idle;

            let cancelled = self
                .in_flight
                .remove(&reply.id)
                .is_some_and(|flag| flag.load(Ordering::Relaxed));

            match reply.outcome {
                JobOutcome::Done(result) if !cancelled => {
                    self.stats.results_delivered += 1;
                    update.results.push(result);
                }
                JobOutcome::Done(_) | JobOutcome::Cancelled => {
                    self.stats.cancelled += 1;
                }
                JobOutcome::Faulted(message) => {
                    tracing::error!(task = %reply.id, slot = reply.slot, "forge task panicked: {message}");
                    self.stats.faulted += 1;
                    update.faulted.push(reply.id);
                }
            }
        }
    }

    fn dispatch(&mut self, update: &mut ForgeUpdate) {
        let in_flight = &mut self.in_flight;
        let stats = &mut self.stats;
        self.queue.retain(|job| {
            let cancelled = in_flight
                .get(&job.id)
                .is_none_or(|flag| flag.load(Ordering::Relaxed));
            if cancelled {
                in_flight.remove(&job.id);
                stats.cancelled += 1;
            }
            !cancelled
        });

        for index in 0..self.slots.len() {
            if self.slots[index].state != SlotState::Idle {
                continue;
            }
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            let Some(cancelled) = self.in_flight.get(&job.id).cloned() else {
                continue;
            };
            let slot = &mut self.slots[index];
            let sent = slot.jobs.as_ref().is_some_and(|jobs| {
                jobs.send(WorkerJob {
                    id: job.id,
                    kind: job.kind,
                    cancelled,
                })
                .is_ok()
            });
            if sent {
                slot.state = SlotState::Busy(job.id);
            } else {
                tracing::error!(task = %job.id, slot = index, "forge worker is gone");
                self.in_flight.remove(&job.id);
                self.stats.faulted += 1;
                update.faulted.push(job.id);
            }
        }
    }

    fn release_deletions(&mut self, update: &mut ForgeUpdate) {
        let in_flight = &self.in_flight;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deletions)
            .into_iter()
            .partition(|d| !d.awaiting.iter().any(|id| in_flight.contains_key(id)));
        self.deletions = waiting;
        self.stats.deletes_released += ready.len() as u64;
        update.released.extend(ready);
    }

    /// Stop all workers and drop queued work. Running jobs are cancelled and
    /// their threads joined. Further submissions fail with
    /// [`ForgeError::Disposed`].
    ///
    /// Returns every deletion still held, so the caller can release its
    /// resources.
    pub fn dispose(&mut self) -> Vec<DeleteTask> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;

        for flag in self.in_flight.values() {
            flag.store(true, Ordering::Relaxed);
        }
        for slot in &mut self.slots {
            slot.jobs = None;
        }
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                if handle.join().is_err() {
                    tracing::warn!("forge worker exited with a panic");
                }
            }
            slot.state = SlotState::Idle;
        }

        self.queue.clear();
        self.in_flight.clear();
        while self.replies.try_recv().is_ok() {}
        let held = std::mem::take(&mut self.deletions);
        self.stats.deletes_released += held.len() as u64;
        tracing::info!(stats = ?self.stats, held = held.len(), "chunk forge disposed");
        held
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl TaskQueue for ChunkForge {
    fn submit(&mut self, task: Task) -> Result<TaskId, ForgeError> {
        if self.disposed {
            return Err(ForgeError::Disposed);
        }
        let id = TaskId(self.next_id);
        self.next_id += 1;

        match task {
            Task::Build(build) => {
                self.stats.builds_submitted += 1;
                self.enqueue(id, JobKind::Build(build));
            }
            Task::Collision(collision) => {
                self.stats.collisions_submitted += 1;
                self.enqueue(id, JobKind::Collision(collision));
            }
            Task::Delete(delete) => {
                self.stats.deletes_submitted += 1;
                if delete.was_pending {
                    self.cancel(delete.chunk);
                    self.forward_awaiting(&delete);
                }
                self.deletions.push(delete);
            }
        }
        Ok(id)
    }
}

impl ChunkForge {
    fn enqueue(&mut self, id: TaskId, kind: JobKind) {
        self.in_flight.insert(id, Arc::new(AtomicBool::new(false)));
        self.queue.push_back(QueuedJob { id, kind });
    }

    /// A held deletion waiting on a build that was just cancelled waits on
    /// whatever replaces that build instead.
    fn forward_awaiting(&mut self, cancelled: &DeleteTask) {
        for held in &mut self.deletions {
            let Some(index) = held.awaiting.iter().position(|&id| id == cancelled.chunk) else {
                continue;
            };
            held.awaiting.swap_remove(index);
            for &id in &cancelled.awaiting {
                if !held.awaiting.contains(&id) {
                    held.awaiting.push(id);
                }
            }
        }
    }
}

impl Drop for ChunkForge {
    fn drop(&mut self) {
        let held = self.dispose();
        if !held.is_empty() {
            tracing::warn!(count = held.len(), "forge dropped with deletions still held");
        }
    }
}
