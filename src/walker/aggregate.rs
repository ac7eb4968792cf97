//! Aggregation of concurrent walk output
//!
//! Workers share three things with the aggregator:
//! - `WalkCounters`: atomic totals bumped as entries are classified
//! - `IssueLog`: an append-only list of advisory errors
//! - a channel of `DirListing`s, one per successfully listed directory
//!
//! The aggregator is the only owner of the listing arena. Each directory's
//! children arrive in a single message from the one worker that listed it,
//! so no two writers ever touch the same child list. Once the walk is
//! joined, the arena is folded into the final tree.

use crate::error::WalkIssue;
use crate::tree::FileNode;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Shared totals for a single walk
#[derive(Debug, Default)]
pub struct WalkCounters {
    /// Directories discovered (root excluded)
    pub dirs: AtomicU64,

    /// Files discovered
    pub files: AtomicU64,

    /// Sum of file sizes
    pub bytes: AtomicU64,

    /// Advisory issues recorded
    pub issues: AtomicU64,
}

impl WalkCounters {
    pub fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
    }

    pub fn dirs(&self) -> u64 {
        self.dirs.load(Ordering::Relaxed)
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn issues(&self) -> u64 {
        self.issues.load(Ordering::Relaxed)
    }
}

/// Append-only collector for advisory errors
#[derive(Debug, Default)]
pub struct IssueLog {
    issues: Mutex<Vec<WalkIssue>>,
}

impl IssueLog {
    /// Record an issue
    pub fn push(&self, issue: WalkIssue, counters: &WalkCounters) {
        counters.issues.fetch_add(1, Ordering::Relaxed);
        self.issues.lock().push(issue);
    }

    /// Take every recorded issue, leaving the log empty
    pub fn drain(&self) -> Vec<WalkIssue> {
        std::mem::take(&mut *self.issues.lock())
    }
}

/// A child node together with the on-disk path of a child directory
#[derive(Debug)]
pub struct ListedChild {
    pub node: FileNode,

    /// Exact path of a child directory; `node.path` may be lossy
    pub dir_path: Option<PathBuf>,
}

impl ListedChild {
    pub fn file(node: FileNode) -> Self {
        Self {
            node,
            dir_path: None,
        }
    }

    pub fn dir(node: FileNode, dir_path: PathBuf) -> Self {
        Self {
            node,
            dir_path: Some(dir_path),
        }
    }
}

/// The children of one directory, produced by the worker that listed it
#[derive(Debug)]
pub struct DirListing {
    /// Directory that was listed
    pub path: PathBuf,

    /// Child nodes in listing order; child directories have empty children
    pub children: Vec<ListedChild>,
}

/// Outcome of draining the listing channel
#[derive(Debug)]
pub struct Collected {
    /// Listings keyed by directory path
    pub arena: HashMap<PathBuf, Vec<ListedChild>>,

    /// True if the deadline expired before the workers finished
    pub timed_out: bool,
}

/// Collects listings while the walk runs and assembles the final tree
pub struct Aggregator {
    receiver: Receiver<DirListing>,
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Aggregator {
    pub fn new(
        receiver: Receiver<DirListing>,
        stop: Arc<AtomicBool>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            receiver,
            stop,
            deadline,
        }
    }

    /// Receive listings until every worker has dropped its sender.
    ///
    /// If the deadline passes first, the stop flag is raised and
    /// draining continues until the workers wind down, so nothing a worker
    /// already committed is lost.
    pub fn collect(self) -> Collected {
        let mut arena = HashMap::new();
        let mut timed_out = false;

        loop {
            let listing = match self.deadline {
                Some(deadline) if !timed_out => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(wait) {
                        Ok(listing) => listing,
                        Err(RecvTimeoutError::Timeout) => {
                            debug!("Walk deadline reached, stopping workers");
                            timed_out = true;
                            self.stop.store(true, Ordering::SeqCst);
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                _ => match self.receiver.recv() {
                    Ok(listing) => listing,
                    Err(_) => break,
                },
            };

            arena.insert(listing.path, listing.children);
        }

        Collected { arena, timed_out }
    }
}

/// Fold the listing arena into `root`, listed at `root_path`.
///
/// Directories with no listing (unreadable, or never reached before a
/// deadline) keep an empty child list.
pub fn assemble(
    root: &mut FileNode,
    root_path: &Path,
    arena: &mut HashMap<PathBuf, Vec<ListedChild>>,
) {
    let mut stack: Vec<(&mut FileNode, PathBuf)> = vec![(root, root_path.to_path_buf())];
    while let Some((node, path)) = stack.pop() {
        let listed = arena.remove(&path).unwrap_or_default();
        let mut dir_paths = Vec::new();
        let children = listed
            .into_iter()
            .map(|child| {
                if let Some(dir_path) = child.dir_path {
                    dir_paths.push(dir_path);
                }
                child.node
            })
            .collect();
        node.children = Some(children);

        let mut dir_paths = dir_paths.into_iter();
        for child in node.children.iter_mut().flatten() {
            if child.is_dir {
                match dir_paths.next() {
                    Some(dir_path) => stack.push((child, dir_path)),
                    None => child.children = Some(Vec::new()),
                }
            }
        }
    }
}

/// Drain the issue log, logging each issue
pub fn drain_issues(log: &IssueLog) -> Vec<WalkIssue> {
    let issues = log.drain();
    for issue in &issues {
        warn!("{}", issue);
    }
    issues
}
