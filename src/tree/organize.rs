//! Flat dirs/files projection of a completed tree

use crate::tree::node::{FileNode, OrganizedTree};

/// Project a completed tree into pre-order `dirs` and `files` lists.
///
/// Every directory, the root included, lands in `dirs` as a shallow copy
/// with no children. Files are borrowed as-is. The input is not modified.
pub fn organize(root: &FileNode) -> OrganizedTree<'_> {
    let mut organized = OrganizedTree {
        dirs: Vec::new(),
        files: Vec::new(),
    };

    // Explicit stack; children pushed in reverse to keep pre-order
    let mut stack: Vec<&FileNode> = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_dir {
            organized.dirs.push(node.shallow_copy());
        } else {
            organized.files.push(node);
        }
        stack.extend(node.children().iter().rev());
    }

    organized
}
