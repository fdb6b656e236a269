//! The host scheduler seam.
//!
//! effio never runs its own thread pool. It asks two things of the host: run a
//! continuation later, which lets an eagerly started branch of a parallel
//! join give up its first slot, and provide its context around a resumed
//! step, which may be woken from any thread.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;

/// A continuation handed to the host.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Host facility that runs continuations at some later point.
pub trait Scheduler: Send + Sync {
    /// Queue `task` to run after the caller has returned.
    ///
    /// Implementations must not run `task` on the calling stack.
    fn schedule_later(&self, task: Task);

    /// Run a resumed step of an execution now, on the calling thread.
    ///
    /// Wake-ups can come from threads the host knows nothing about, so
    /// implementations wrap `step` in whatever context host services such as
    /// timers need. The default runs it bare.
    fn resume(&self, step: Task) {
        step();
    }
}

/// Runs continuations as detached tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_later(&self, task: Task) {
        // Detached: the continuation reports through its own completion signal.
        drop(self.handle.spawn(async move { task() }));
    }

    fn resume(&self, step: Task) {
        let _context = self.handle.enter();
        step();
    }
}

/// FIFO scheduler drained explicitly by its owner.
///
/// Nothing runs until [`QueueScheduler::run_pending`] or
/// [`QueueScheduler::run_until_idle`] is called, which makes interleavings
/// deterministic. Suitable for single-threaded hosts and tests.
#[derive(Default)]
pub struct QueueScheduler {
    queue: Mutex<VecDeque<Task>>,
    scheduled: AtomicUsize,
}

impl QueueScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of tasks ever handed to this scheduler.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the tasks that are queued right now, in order.
    ///
    /// Tasks queued while these run wait for the next call. Returns the
    /// number of tasks run.
    pub fn run_pending(&self) -> usize {
        let batch = self.pending();
        let mut ran = 0;
        while ran < batch {
            let Some(task) = self.pop() else { break };
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks until the queue is empty, including ones queued meanwhile.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop() {
            task();
            ran += 1;
        }
        ran
    }

    fn pop(&self) -> Option<Task> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for QueueScheduler {
    fn schedule_later(&self, task: Task) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.lock().push_back(task);
    }
}

impl fmt::Debug for QueueScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueScheduler")
            .field("pending", &self.pending())
            .field("scheduled", &self.scheduled_count())
            .finish()
    }
}
