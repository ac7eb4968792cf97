//! Walk coordinator - orchestrates the bounded parallel walk
//!
//! The coordinator is responsible for:
//! - Setting up the task queue, shared counters and issue log
//! - Spawning the worker pool and seeding the root
//! - Running the aggregator on the calling thread until workers exit
//! - Joining workers, draining issues and assembling the tree

use crate::config::WalkConfig;
use crate::error::{TreeError, WalkIssue};
use crate::tree::FileNode;
use crate::walker::aggregate::{assemble, drain_issues, Aggregator, IssueLog, WalkCounters};
use crate::walker::queue::{DirTask, TaskQueue};
use crate::walker::source::DirSource;
use crate::walker::worker::{WalkContext, Worker};
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed (or stopped) walk
#[derive(Debug)]
pub struct WalkResult {
    /// Assembled tree
    pub root: FileNode,

    /// Directories discovered (root excluded)
    pub total_dirs: u64,

    /// Files discovered
    pub total_files: u64,

    /// Sum of file sizes
    pub total_bytes: u64,

    /// Advisory issues, in the order they were recorded
    pub issues: Vec<WalkIssue>,

    /// Time taken for the walk
    pub duration: Duration,

    /// The deadline expired before the walk finished
    pub timed_out: bool,

    /// The shutdown flag was raised externally
    pub interrupted: bool,
}

impl WalkResult {
    /// Whether the walk ran to completion
    pub fn completed(&self) -> bool {
        !self.timed_out && !self.interrupted
    }
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub issues: u64,
    pub pending: u64,
    pub active_workers: usize,
    pub total_workers: usize,
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Entries (files + dirs) discovered per second
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.files + self.dirs) as f64 / secs
        } else {
            0.0
        }
    }
}

type ProgressCallback = Box<dyn Fn(WalkProgress) + Send + 'static>;

/// Coordinates one bounded parallel walk
pub struct WalkCoordinator {
    config: WalkConfig,
    source: Arc<dyn DirSource>,
    shutdown: Arc<AtomicBool>,
}

impl WalkCoordinator {
    /// Create a new walk coordinator
    pub fn new(config: WalkConfig, source: Arc<dyn DirSource>) -> Self {
        Self::with_shutdown(config, source, Arc::new(AtomicBool::new(false)))
    }

    /// Create a coordinator observing an existing shutdown flag
    pub fn with_shutdown(
        config: WalkConfig,
        source: Arc<dyn DirSource>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            source,
            shutdown,
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Walk the directory `root_path`, populating `root`
    pub fn run(&self, root: FileNode, root_path: PathBuf) -> Result<WalkResult, TreeError> {
        self.run_inner(root, root_path, None)
    }

    /// Like `run`, calling `progress_callback` roughly every 100ms
    pub fn run_with_progress<F>(
        &self,
        root: FileNode,
        root_path: PathBuf,
        progress_callback: F,
    ) -> Result<WalkResult, TreeError>
    where
        F: Fn(WalkProgress) + Send + 'static,
    {
        self.run_inner(root, root_path, Some(Box::new(progress_callback)))
    }

    fn run_inner(
        &self,
        mut root: FileNode,
        root_path: PathBuf,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<WalkResult, TreeError> {
        let start = Instant::now();
        let deadline = self.config.timeout.map(|t| start + t);
        let worker_count = self.config.concurrency;

        info!(
            root = %root_path.display(),
            workers = worker_count,
            "Starting tree walk"
        );

        let (queue, locals) = TaskQueue::new(worker_count);
        let stop = Arc::new(AtomicBool::new(false));
        let context = Arc::new(WalkContext {
            queue,
            source: Arc::clone(&self.source),
            counters: WalkCounters::default(),
            issues: IssueLog::default(),
            shutdown: Arc::clone(&self.shutdown),
            stop: Arc::clone(&stop),
        });

        context.queue.seed(DirTask::root(root_path.clone()));

        let (listing_tx, listing_rx) = unbounded();

        let mut workers = Vec::with_capacity(worker_count);
        for local in locals {
            match Worker::spawn(local, Arc::clone(&context), listing_tx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Let already-spawned workers wind down before bailing
                    stop.store(true, Ordering::SeqCst);
                    drop(listing_tx);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(e.into());
                }
            }
        }
        debug!(count = workers.len(), "Workers spawned");

        // Drop our sender so the aggregator sees the channel close when the
        // last worker exits
        drop(listing_tx);

        let walk_done = Arc::new(AtomicBool::new(false));
        let reporter = spawn_reporter(
            Arc::clone(&context),
            Arc::clone(&walk_done),
            worker_count,
            start,
            progress_callback,
        );

        let collected = Aggregator::new(listing_rx, Arc::clone(&stop), deadline).collect();
        let interrupted = !collected.timed_out && self.shutdown.load(Ordering::SeqCst);

        let mut join_error = None;
        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed to join cleanly");
                join_error.get_or_insert(e);
            }
        }

        walk_done.store(true, Ordering::SeqCst);
        if let Some(handle) = reporter {
            let _ = handle.join();
        }

        if let Some(e) = join_error {
            return Err(e.into());
        }

        let mut arena = collected.arena;
        assemble(&mut root, &root_path, &mut arena);

        let issues = drain_issues(&context.issues);
        let duration = start.elapsed();
        let counters = &context.counters;

        debug!(
            enqueued = context.queue.stats().enqueued.load(Ordering::Relaxed),
            listed = context.queue.stats().throughput(),
            stolen = context.queue.stats().stolen_count(),
            "Queue stats"
        );
        info!(
            dirs = counters.dirs(),
            files = counters.files(),
            issues = issues.len(),
            duration_ms = duration.as_millis() as u64,
            "Walk completed"
        );

        Ok(WalkResult {
            root,
            total_dirs: counters.dirs(),
            total_files: counters.files(),
            total_bytes: counters.bytes(),
            issues,
            duration,
            timed_out: collected.timed_out,
            interrupted,
        })
    }
}

/// Spawn the progress thread, unless there is nothing to report to
fn spawn_reporter(
    context: Arc<WalkContext>,
    walk_done: Arc<AtomicBool>,
    total_workers: usize,
    start: Instant,
    progress_callback: Option<ProgressCallback>,
) -> Option<thread::JoinHandle<()>> {
    let progress_callback = progress_callback?;

    thread::Builder::new()
        .name("walk-progress".to_string())
        .spawn(move || {
            while !walk_done.load(Ordering::Relaxed) {
                progress_callback(snapshot(&context, total_workers, start));
                thread::sleep(Duration::from_millis(100));
            }
        })
        .ok()
}

fn snapshot(context: &WalkContext, total_workers: usize, start: Instant) -> WalkProgress {
    WalkProgress {
        dirs: context.counters.dirs(),
        files: context.counters.files(),
        bytes: context.counters.bytes(),
        issues: context.counters.issues(),
        pending: context.queue.pending(),
        active_workers: context.queue.active(),
        total_workers,
        elapsed: start.elapsed(),
    }
}
