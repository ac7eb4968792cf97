//! HTTP delivery for file trees.
//!
//! Serves the same trees as the CLI over a small JSON API, either as one
//! response or as chunked WebSocket frames.

pub mod chunks;
pub mod response;
pub mod routes;

pub use response::ApiResponse;
pub use routes::{build_router, serve};
