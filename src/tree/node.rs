//! Tree entities returned by a walk
//!
//! `FileNode` is the nested representation, `OrganizedTree` the flat
//! dirs/files projection, and `FileTreeResult` the envelope handed to
//! callers. All of them serialize to the camelCase JSON shape consumers
//! of the HTTP API expect.

use crate::error::WalkIssue;
use crate::tree::organize::organize;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

/// One filesystem entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Base name
    pub name: String,

    /// Size in bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Extension without the leading dot (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Absolute, normalized path
    pub path: String,

    /// Modification time in seconds since epoch (files only).
    ///
    /// Portable creation times do not exist, so this carries the same value
    /// as `last_modified`. The name is kept for wire compatibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<i64>,

    /// Modification time in seconds since epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,

    /// True for directories
    pub is_dir: bool,

    /// Child entries in listing order (directories only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    /// Create a directory node with no children yet
    pub fn directory(name: impl Into<String>, path: impl Into<String>, mtime: Option<i64>) -> Self {
        Self {
            name: name.into(),
            size: None,
            file_type: None,
            path: path.into(),
            created_date: None,
            last_modified: mtime,
            is_dir: true,
            children: Some(Vec::new()),
        }
    }

    /// Create a file (leaf) node
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        mtime: Option<i64>,
    ) -> Self {
        let name = name.into();
        let file_type = extension_of(&name);
        Self {
            name,
            size: Some(size),
            file_type,
            path: path.into(),
            created_date: mtime,
            last_modified: mtime,
            is_dir: false,
            children: None,
        }
    }

    /// Children of this node, empty for files
    pub fn children(&self) -> &[FileNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// True if this node has no `children` field at all
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(FileNode::node_count).sum::<usize>()
    }

    /// Copy of this node without its children.
    ///
    /// Directories keep an absent `children` field in the copy, which is how
    /// the organized projection lists them.
    pub fn shallow_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            size: self.size,
            file_type: self.file_type.clone(),
            path: self.path.clone(),
            created_date: self.created_date,
            last_modified: self.last_modified,
            is_dir: self.is_dir,
            children: None,
        }
    }
}

/// File extension without the leading dot, `None` when there is none
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => Some(name[idx + 1..].to_string()),
        _ => None,
    }
}

/// Flat projection of a completed tree
///
/// Directories are shallow copies; files borrow from the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizedTree<'a> {
    pub dirs: Vec<FileNode>,
    pub files: Vec<&'a FileNode>,
}

impl OrganizedTree<'_> {
    /// Total number of entries in both lists
    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    /// True if both lists are empty
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Shape requested for the returned tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeLayout {
    /// Nested `FileNode` tree
    #[default]
    Nested,
    /// Flat dirs/files projection
    Organized,
}

impl TreeLayout {
    pub fn from_organize(organize: bool) -> Self {
        if organize {
            TreeLayout::Organized
        } else {
            TreeLayout::Nested
        }
    }
}

/// View of the tree held by a `FileTreeResult`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FileTree<'a> {
    Nested(&'a FileNode),
    Organized(OrganizedTree<'a>),
}

/// Envelope returned by a successful walk
#[derive(Debug, Clone)]
pub struct FileTreeResult {
    root: FileNode,
    layout: TreeLayout,
    dir_count: u64,
    file_count: u64,
    total_bytes: u64,
    issues: Vec<WalkIssue>,
    duration: Duration,
}

impl FileTreeResult {
    pub fn new(
        root: FileNode,
        layout: TreeLayout,
        dir_count: u64,
        file_count: u64,
        total_bytes: u64,
        issues: Vec<WalkIssue>,
        duration: Duration,
    ) -> Self {
        Self {
            root,
            layout,
            dir_count,
            file_count,
            total_bytes,
            issues,
            duration,
        }
    }

    /// The tree in the requested layout
    pub fn tree(&self) -> FileTree<'_> {
        match self.layout {
            TreeLayout::Nested => FileTree::Nested(&self.root),
            TreeLayout::Organized => FileTree::Organized(organize(&self.root)),
        }
    }

    /// The nested tree, regardless of layout
    pub fn root(&self) -> &FileNode {
        &self.root
    }

    pub fn layout(&self) -> TreeLayout {
        self.layout
    }

    /// Directories discovered, root excluded
    pub fn dir_count(&self) -> u64 {
        self.dir_count
    }

    /// Files discovered
    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    /// Sum of file sizes
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Advisory problems encountered during the walk
    pub fn issues(&self) -> &[WalkIssue] {
        &self.issues
    }

    /// Wall-clock time of the walk
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Consume the envelope, returning the nested tree
    pub fn into_root(self) -> FileNode {
        self.root
    }
}

impl Serialize for FileTreeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.issues.is_empty() { 4 } else { 5 };
        let mut state = serializer.serialize_struct("FileTreeResult", fields)?;
        state.serialize_field("tree", &self.tree())?;
        state.serialize_field("dirCount", &self.dir_count)?;
        state.serialize_field("fileCount", &self.file_count)?;
        state.serialize_field("totalBytes", &self.total_bytes)?;
        if self.issues.is_empty() {
            state.skip_field("issues")?;
        } else {
            state.serialize_field("issues", &self.issues)?;
        }
        state.end()
    }
}
