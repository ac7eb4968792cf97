//! filetree-walker - Concurrent directory tree builder
//!
//! Walks a local directory with a bounded pool of worker threads and turns
//! it into a JSON-serializable tree, either nested or flattened into
//! separate directory and file lists.
//!
//! # Features
//!
//! - **Bounded Parallelism**: at most `concurrency` directory listings are
//!   in flight at any moment, regardless of tree shape.
//!
//! - **Work Stealing**: each worker keeps a local deque and steals from its
//!   peers when idle, so wide and deep trees both keep the pool busy.
//!
//! - **Single Writer**: workers hand whole directory listings to one
//!   aggregator, which alone assembles the tree.
//!
//! - **Partial Failure**: unreadable subdirectories and vanished entries
//!   are recorded as issues and the rest of the tree is still returned.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   generate_file_tree(root, organize)            │
//! │               (resolve, validate, pick the layout)              │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Worker Threads                             │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐      │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │      │
//! │  │ readdir │  │ readdir │  │ readdir │         │ readdir │      │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘      │
//! │       └────────────┴─────┬──────┴────────────────────┘          │
//! │                          ▼                                      │
//! │            ┌──────────────────────────┐                         │
//! │            │       Aggregator         │                         │
//! │            │  - listing arena         │                         │
//! │            │  - deadline              │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//!                    ┌──────────────────┐
//!                    │  FileTreeResult  │
//!                    │ (nested / flat)  │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Nested tree
//! filetree-walker /srv/data --pretty
//!
//! # Flat dirs/files listing with 16 workers
//! filetree-walker '/srv/data::org' -w 16 -o tree.json
//! ```

pub mod config;
pub mod error;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod tree;
pub mod walker;

pub use config::{CliArgs, RunConfig, TreeRequest, WalkConfig};
pub use error::{Result, TreeError, WalkIssue};
pub use service::{generate_file_tree, FileTreeGenerator};
pub use tree::{FileNode, FileTree, FileTreeResult, OrganizedTree, TreeLayout};
pub use walker::{DirSource, LocalFs, WalkCoordinator, WalkProgress, WalkResult};
