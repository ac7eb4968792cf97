//! Work-stealing directory queue with completion tracking
//!
//! Directory tasks are seeded into a shared injector and then pushed onto
//! the local FIFO deque of whichever worker discovered them. Idle workers
//! steal from the injector first, then from their peers.
//!
//! Completion is tracked with a pending counter: it is incremented for every
//! task pushed (the root included) and decremented only after a task's
//! listing and dispatch are done. Because a task's children are pushed
//! before the task itself completes, the counter can only reach zero once
//! every transitively spawned task has finished.

use crossbeam_deque::{Injector, Steal, Stealer, Worker as DequeWorker};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A task to list one directory
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(path: PathBuf, depth: u32) -> Self {
        Self { path, depth }
    }

    /// Create the root task
    pub fn root(path: PathBuf) -> Self {
        Self::new(path, 0)
    }

    /// Task for a child directory of this one
    pub fn child(&self, path: PathBuf) -> Self {
        Self::new(path, self.depth + 1)
    }
}

/// Statistics for the task queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,

    /// Tasks taken from another worker's deque
    pub stolen: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued tasks)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get number of stolen tasks
    pub fn stolen_count(&self) -> u64 {
        self.stolen.load(Ordering::Relaxed)
    }
}

/// A worker's private end of the queue
pub struct LocalQueue {
    id: usize,
    deque: DequeWorker<DirTask>,
}

impl LocalQueue {
    /// Worker ID owning this deque
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Shared directory queue
pub struct TaskQueue {
    /// Global entry point for seeded tasks
    injector: Injector<DirTask>,

    /// One stealer per worker deque
    stealers: Vec<Stealer<DirTask>>,

    /// Tasks pushed but not yet completed
    pending: AtomicU64,

    /// Listings currently in flight
    active: AtomicUsize,

    /// Queue statistics
    stats: QueueStats,
}

impl TaskQueue {
    /// Create a queue and one local deque per worker
    pub fn new(worker_count: usize) -> (Self, Vec<LocalQueue>) {
        let mut locals = Vec::with_capacity(worker_count);
        let mut stealers = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let deque = DequeWorker::new_fifo();
            stealers.push(deque.stealer());
            locals.push(LocalQueue { id, deque });
        }

        let queue = Self {
            injector: Injector::new(),
            stealers,
            pending: AtomicU64::new(0),
            active: AtomicUsize::new(0),
            stats: QueueStats::default(),
        };

        (queue, locals)
    }

    /// Seed the queue with a task (normally the root)
    pub fn seed(&self, task: DirTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        self.injector.push(task);
    }

    /// Push a task discovered by the worker owning `local`
    pub fn push(&self, local: &LocalQueue, task: DirTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        local.deque.push(task);
    }

    /// Get the next task: local deque first, then injector, then peers
    pub fn next(&self, local: &LocalQueue) -> Option<DirTask> {
        let task = local.deque.pop().or_else(|| self.steal(local.id));
        if task.is_some() {
            self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        task
    }

    fn steal(&self, id: usize) -> Option<DirTask> {
        loop {
            match self.injector.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        for (i, stealer) in self.stealers.iter().enumerate() {
            if i == id {
                continue;
            }
            loop {
                match stealer.steal() {
                    Steal::Success(task) => {
                        self.stats.stolen.fetch_add(1, Ordering::Relaxed);
                        return Some(task);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    /// Mark one task as fully dispatched
    pub fn complete(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Check if all work is complete
    pub fn is_complete(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }

    /// Tasks pushed but not yet completed
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Listings currently in flight
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

/// RAII guard marking a listing as in flight.
///
/// Dropping the guard also completes the task, so a worker that bails out
/// early never leaves the pending counter stuck.
pub struct TaskGuard<'a> {
    queue: &'a TaskQueue,
}

impl<'a> TaskGuard<'a> {
    /// Create a new guard (marks a listing as active)
    pub fn new(queue: &'a TaskQueue) -> Self {
        queue.active.fetch_add(1, Ordering::SeqCst);
        Self { queue }
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.queue.active.fetch_sub(1, Ordering::SeqCst);
        self.queue.complete();
    }
}
