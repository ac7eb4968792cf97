//! Tree model and the organized projection

pub mod node;
pub mod organize;

pub use node::{extension_of, FileNode, FileTree, FileTreeResult, OrganizedTree, TreeLayout};
pub use organize::organize;
