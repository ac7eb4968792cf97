//! Worker thread logic for the bounded directory walk
//!
//! Each worker:
//! - Pulls one directory task at a time (local deque, injector, then peers)
//! - Lists the directory through the shared `DirSource`
//! - Skips hidden entries and stats the rest
//! - Hands the finished child list to the aggregator in one message
//! - Pushes child directories back onto its local deque
//!
//! Because a worker lists exactly one directory at a time, the number of
//! in-flight listings is bounded by the worker count.

use crate::error::{WalkIssue, WorkerError};
use crate::tree::FileNode;
use crate::walker::aggregate::{DirListing, IssueLog, ListedChild, WalkCounters};
use crate::walker::queue::{DirTask, LocalQueue, TaskGuard, TaskQueue};
use crate::walker::source::DirSource;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Spins without work before a worker starts sleeping
const MAX_IDLE_SPINS: u32 = 1000;

/// State shared by every worker of one walk
pub struct WalkContext {
    /// Directory queue and completion tracking
    pub queue: TaskQueue,

    /// Listing backend
    pub source: Arc<dyn DirSource>,

    /// Running totals
    pub counters: WalkCounters,

    /// Advisory errors
    pub issues: IssueLog,

    /// External stop signal (interrupt)
    pub shutdown: Arc<AtomicBool>,

    /// Walk-local stop signal (deadline, failed startup)
    pub stop: Arc<AtomicBool>,
}

impl WalkContext {
    /// Check if workers should stop picking up new directories
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.shutdown.load(Ordering::Relaxed)
    }
}

/// A worker thread that processes directory tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        local: LocalQueue,
        context: Arc<WalkContext>,
        listings: Sender<DirListing>,
    ) -> Result<Self, WorkerError> {
        let id = local.id();

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(local, context, listings))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Main worker loop
fn worker_loop(local: LocalQueue, context: Arc<WalkContext>, listings: Sender<DirListing>) {
    let id = local.id();
    debug!("Worker {} started", id);

    let mut idle_spins = 0;
    let mut processed = 0u64;

    loop {
        if context.should_stop() {
            debug!("Worker {} stopping early", id);
            break;
        }

        match context.queue.next(&local) {
            Some(task) => {
                idle_spins = 0;
                let _guard = TaskGuard::new(&context.queue);
                expand_directory(&task, &local, &context, &listings);
                processed += 1;
            }
            None => {
                if context.queue.is_complete() {
                    break;
                }

                idle_spins += 1;
                if idle_spins > MAX_IDLE_SPINS {
                    thread::sleep(Duration::from_micros(100));
                    idle_spins = 0;
                }
            }
        }
    }

    debug!("Worker {} finished after {} directories", id, processed);
}

/// List one directory and dispatch its children.
///
/// A listing failure is recorded and ends this subtree. A metadata failure
/// drops only the affected entry.
pub fn expand_directory(
    task: &DirTask,
    local: &LocalQueue,
    context: &WalkContext,
    listings: &Sender<DirListing>,
) {
    let dir_path = task.path.to_string_lossy().into_owned();

    let entries = match context.source.read_dir(&task.path) {
        Ok(entries) => entries,
        Err(e) => {
            context.issues.push(
                WalkIssue::ReadDir {
                    path: dir_path,
                    reason: e.to_string(),
                },
                &context.counters,
            );
            return;
        }
    };

    trace!("Listed {} ({} entries)", dir_path, entries.len());

    let mut children = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.is_hidden() {
            continue;
        }

        let full_path = task.path.join(&entry.name);
        let meta = match context.source.metadata(&full_path) {
            Ok(meta) => meta,
            Err(e) => {
                context.issues.push(
                    WalkIssue::Stat {
                        path: full_path.to_string_lossy().into_owned(),
                        reason: e.to_string(),
                    },
                    &context.counters,
                );
                continue;
            }
        };

        let name = entry.name.to_string_lossy().into_owned();
        let path = full_path.to_string_lossy().into_owned();

        if entry.is_dir {
            context.counters.record_dir();
            let node = FileNode::directory(name, path, meta.mtime);
            children.push(ListedChild::dir(node, full_path.clone()));
            context.queue.push(local, task.child(full_path));
        } else {
            context.counters.record_file(meta.len);
            children.push(ListedChild::file(FileNode::file(
                name,
                path,
                meta.len,
                meta.mtime,
            )));
        }
    }

    // The aggregator outlives every worker, so a failed send only happens
    // while the walk is being torn down
    let _ = listings.send(DirListing {
        path: task.path.clone(),
        children,
    });
}
