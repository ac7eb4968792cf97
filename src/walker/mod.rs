//! Bounded parallel directory walker
//!
//! A fixed pool of worker threads lists directories one at a time, so the
//! number of in-flight listings never exceeds the worker count. Finished
//! listings flow to a single aggregator, which alone owns the tree under
//! construction.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     WalkCoordinator     │
//!                     │  - seeds the root       │
//!                     │  - joins the pool       │
//!                     └───────────┬─────────────┘
//!                                 │
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │◄──steal───► │  Worker 2 │◄──steal───► │  Worker N │
//! │  READDIR  │             │  READDIR  │             │  READDIR  │
//! │  lstat    │             │  lstat    │             │  lstat    │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       │        DirListing       │                         │
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │       Aggregator        │
//!                     │  - listing arena        │
//!                     │  - deadline             │
//!                     │  - assembles the tree   │
//!                     └─────────────────────────┘
//! ```

pub mod aggregate;
pub mod coordinator;
pub mod queue;
pub mod source;
pub mod worker;

pub use aggregate::{assemble, Aggregator, DirListing, IssueLog, ListedChild, WalkCounters};
pub use coordinator::{WalkCoordinator, WalkProgress, WalkResult};
pub use queue::{DirTask, TaskQueue};
pub use source::{DirSource, EntryMeta, LocalFs, RawEntry};
