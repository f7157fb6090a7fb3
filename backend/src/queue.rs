//! Named command queues with bounded concurrency.
//!
//! Each [`QueueName`] has its own fair semaphore, so independent categories
//! (a long `check` and a quick `type`) proceed side by side while each
//! category stays within its limit. In low-memory mode every submission is
//! routed to the single `lowmem` queue.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use gmod_types::QueueName;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::events::{BackendEvent, EventBus};

const QUEUE_COUNT: usize = QueueName::ALL.len();

/// Built-in concurrency limit for `queue`.
#[must_use]
pub fn default_limit(queue: QueueName, max_browse_processes: usize) -> usize {
    match queue {
        QueueName::CheckLint => 2,
        QueueName::Browse => max_browse_processes.max(1),
        QueueName::Init => 4,
        QueueName::TypeInfo | QueueName::Find | QueueName::List | QueueName::LowMem => 1,
    }
}

/// Limit bookkeeping for one queue's semaphore.
struct Lane {
    limit: usize,
    /// Permits still to be retired after a lowered limit, taken from
    /// submissions as they finish.
    deficit: usize,
}

pub struct QueueSet {
    semaphores: [Semaphore; QUEUE_COUNT],
    lanes: Mutex<[Lane; QUEUE_COUNT]>,
    /// In-flight plus waiting submissions per queue.
    outstanding: [AtomicUsize; QUEUE_COUNT],
    low_memory: AtomicBool,
    events: EventBus,
}

/// Decrements a queue's outstanding count and reports idleness on drop.
struct Outstanding<'a> {
    set: &'a QueueSet,
    queue: QueueName,
}

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        let previous = self.set.outstanding[self.queue as usize].fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.set.events.emit(BackendEvent::QueueIdle { queue: self.queue });
            if self.set.is_idle() {
                self.set.events.emit(BackendEvent::BackendIdle);
            }
        }
    }
}

/// A held queue slot.
struct Slot<'a> {
    set: &'a QueueSet,
    queue: QueueName,
    permit: Option<SemaphorePermit<'a>>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.set.release(self.queue, permit);
        }
    }
}

impl QueueSet {
    #[must_use]
    pub fn new(max_browse_processes: usize, low_memory: bool, events: EventBus) -> Self {
        let limits: [usize; QUEUE_COUNT] =
            std::array::from_fn(|i| default_limit(QueueName::ALL[i], max_browse_processes));
        Self {
            semaphores: limits.map(Semaphore::new),
            lanes: Mutex::new(limits.map(|limit| Lane { limit, deficit: 0 })),
            outstanding: std::array::from_fn(|_| AtomicUsize::new(0)),
            low_memory: AtomicBool::new(low_memory),
            events,
        }
    }

    /// Run `thunk` once `queue` has a free slot. Waiters are admitted FIFO.
    ///
    /// The thunk's output, error or not, goes only to this caller.
    pub async fn submit<F>(&self, queue: QueueName, thunk: F) -> F::Output
    where
        F: Future,
    {
        let queue = self.route(queue);
        self.events.emit(BackendEvent::BackendActive);
        self.outstanding[queue as usize].fetch_add(1, Ordering::SeqCst);
        let _outstanding = Outstanding { set: self, queue };

        // The semaphores are never closed.
        let permit = self.semaphores[queue as usize].acquire().await.ok();
        let _slot = Slot {
            set: self,
            queue,
            permit,
        };
        tracing::trace!(%queue, "queue slot acquired");
        thunk.await
    }

    /// Change a queue's limit (clamped to at least 1).
    ///
    /// Raising it admits waiters at once. Lowering it retires free permits
    /// first and then permits of running submissions as they finish, so the
    /// queue never runs more than the new limit once the excess has drained.
    pub fn set_limit(&self, queue: QueueName, limit: usize) {
        let limit = limit.max(1);
        let semaphore = &self.semaphores[queue as usize];
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let lane = &mut lanes[queue as usize];
        tracing::debug!(%queue, from = lane.limit, to = limit, "queue limit changed");

        if limit > lane.limit {
            let raise = limit - lane.limit;
            let repaid = raise.min(lane.deficit);
            lane.deficit -= repaid;
            semaphore.add_permits(raise - repaid);
        } else {
            let cut = lane.limit - limit;
            let forgotten = semaphore.forget_permits(cut);
            lane.deficit += cut - forgotten;
        }
        lane.limit = limit;
    }

    #[must_use]
    pub fn limit(&self, queue: QueueName) -> usize {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)[queue as usize].limit
    }

    pub fn set_low_memory(&self, enabled: bool) {
        tracing::debug!(enabled, "low-memory mode");
        self.low_memory.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn low_memory(&self) -> bool {
        self.low_memory.load(Ordering::SeqCst)
    }

    /// Submissions for `queue` that are running or waiting.
    #[must_use]
    pub fn outstanding(&self, queue: QueueName) -> usize {
        self.outstanding[queue as usize].load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.outstanding
            .iter()
            .all(|count| count.load(Ordering::SeqCst) == 0)
    }

    fn route(&self, queue: QueueName) -> QueueName {
        if self.low_memory() {
            QueueName::LowMem
        } else {
            queue
        }
    }

    /// Return a finished submission's permit, or retire it while the queue
    /// is above a lowered limit.
    fn release(&self, queue: QueueName, permit: SemaphorePermit<'_>) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let lane = &mut lanes[queue as usize];
        if lane.deficit > 0 {
            lane.deficit -= 1;
            permit.forget();
        } else {
            drop(permit);
        }
    }
}
