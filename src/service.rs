//! Tree generation entry point
//!
//! Validates the root, drives the walk and wraps the outcome in a
//! `FileTreeResult`. Only root validation (and a timeout or interrupt)
//! can fail a call; problems inside the walk are advisory and travel with
//! the result.

use crate::config::WalkConfig;
use crate::error::{Result, TreeError};
use crate::tree::{FileNode, FileTreeResult, TreeLayout};
use crate::walker::{DirSource, LocalFs, WalkCoordinator, WalkProgress, WalkResult};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Generate the tree for `root` with the default configuration
pub fn generate_file_tree(root: impl AsRef<Path>, organize: bool) -> Result<FileTreeResult> {
    FileTreeGenerator::new(WalkConfig::default())?.generate(root, organize)
}

/// Configured tree generator
pub struct FileTreeGenerator {
    config: WalkConfig,
    source: Arc<dyn DirSource>,
    shutdown: Arc<AtomicBool>,
}

impl FileTreeGenerator {
    /// Create a generator walking the local filesystem
    pub fn new(config: WalkConfig) -> Result<Self> {
        Self::with_source(config, Arc::new(LocalFs))
    }

    /// Create a generator over a custom listing backend
    pub fn with_source(config: WalkConfig, source: Arc<dyn DirSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Walk `root` and return the tree in the requested layout
    pub fn generate(&self, root: impl AsRef<Path>, organize: bool) -> Result<FileTreeResult> {
        self.generate_inner(root.as_ref(), organize, None::<fn(WalkProgress)>)
    }

    /// Like `generate`, reporting progress roughly every 100ms
    pub fn generate_with_progress<F>(
        &self,
        root: impl AsRef<Path>,
        organize: bool,
        progress_callback: F,
    ) -> Result<FileTreeResult>
    where
        F: Fn(WalkProgress) + Send + 'static,
    {
        self.generate_inner(root.as_ref(), organize, Some(progress_callback))
    }

    fn generate_inner<F>(
        &self,
        root: &Path,
        organize: bool,
        progress_callback: Option<F>,
    ) -> Result<FileTreeResult>
    where
        F: Fn(WalkProgress) + Send + 'static,
    {
        let root_path = resolve_root(root)?;
        let root_display = root_path.to_string_lossy().into_owned();

        let meta = self.source.root_metadata(&root_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                TreeError::NotFound {
                    path: root_display.clone(),
                }
            } else {
                TreeError::PathResolution {
                    path: root_display.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !meta.is_dir {
            return Err(TreeError::NotADirectory { path: root_display });
        }

        let root_node = FileNode::directory(root_name(&root_path), root_display.clone(), meta.mtime);

        let coordinator = WalkCoordinator::with_shutdown(
            self.config.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.shutdown),
        );
        let walk = match progress_callback {
            Some(callback) => coordinator.run_with_progress(root_node, root_path, callback)?,
            None => coordinator.run(root_node, root_path)?,
        };

        if let Some(reason) = root_listing_failure(&walk) {
            return Err(TreeError::RootUnreadable {
                path: root_display,
                reason,
            });
        }

        let layout = TreeLayout::from_organize(organize);
        let timed_out = walk.timed_out;
        let interrupted = walk.interrupted;
        let result = into_result(walk, layout);

        if timed_out {
            return Err(TreeError::WalkTimeout {
                elapsed: result.duration(),
                partial: Box::new(result),
            });
        }
        if interrupted {
            return Err(TreeError::Interrupted);
        }

        match layout {
            TreeLayout::Organized => info!("Organizing file tree for {}", root_display),
            TreeLayout::Nested => info!("Get file tree for {}", root_display),
        }
        info!(
            "Total time for {}: {:.3}s",
            root_display,
            result.duration().as_secs_f64()
        );

        Ok(result)
    }
}

/// Make `root` absolute and lexically normalized
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(root).map_err(|e| TreeError::PathResolution {
        path: root.to_string_lossy().into_owned(),
        reason: e.to_string(),
    })?;
    Ok(normalize_lexically(&absolute))
}

/// Remove `.` components and resolve `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn root_name(root: &Path) -> String {
    match root.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => root.to_string_lossy().into_owned(),
    }
}

fn root_listing_failure(walk: &WalkResult) -> Option<String> {
    walk.issues.iter().find_map(|issue| match issue {
        crate::error::WalkIssue::ReadDir { path, reason } if *path == walk.root.path => {
            Some(reason.clone())
        }
        _ => None,
    })
}

fn into_result(walk: WalkResult, layout: TreeLayout) -> FileTreeResult {
    FileTreeResult::new(
        walk.root,
        layout,
        walk.total_dirs,
        walk.total_files,
        walk.total_bytes,
        walk.issues,
        walk.duration,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexically(Path::new("/a/b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize_lexically(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_resolve_relative_root() {
        let resolved = resolve_root(Path::new("some/../dir")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("dir"));
        assert!(!resolved.to_string_lossy().contains(".."));
    }

    #[test]
    fn test_resolve_empty_root_fails() {
        assert!(matches!(
            resolve_root(Path::new("")),
            Err(TreeError::PathResolution { .. })
        ));
    }

    #[test]
    fn test_root_name() {
        assert_eq!(root_name(Path::new("/srv/data")), "data");
        assert_eq!(root_name(Path::new("/")), "/");
    }
}
