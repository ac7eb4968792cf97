//! Integration tests for filetree-walker
//!
//! These tests build small trees under a temporary directory. Failure and
//! latency scenarios wrap the local filesystem in a custom `DirSource`.

use filetree_walker::config::{TreeRequest, WalkConfig};
use filetree_walker::error::{TreeError, WalkIssue};
use filetree_walker::service::{generate_file_tree, FileTreeGenerator};
use filetree_walker::tree::{organize, FileNode, FileTree};
use filetree_walker::walker::{DirSource, EntryMeta, LocalFs, RawEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Local filesystem with a per-listing delay and in-flight tracking
#[derive(Default)]
struct SlowFs {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowFs {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }
}

impl DirSource for SlowFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        let entries = LocalFs.read_dir(path);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        entries
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        LocalFs.metadata(path)
    }
}

/// Local filesystem whose `lstat` fails for one entry
struct StatFailFs {
    broken: PathBuf,
}

impl DirSource for StatFailFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>> {
        LocalFs.read_dir(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        if path == self.broken {
            return Err(io::Error::new(io::ErrorKind::NotFound, "vanished"));
        }
        LocalFs.metadata(path)
    }

    fn root_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        LocalFs.root_metadata(path)
    }
}

/// Local filesystem that refuses to list one directory
struct DenyFs {
    denied: PathBuf,
}

impl DirSource for DenyFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>> {
        if path == self.denied {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        LocalFs.read_dir(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        LocalFs.metadata(path)
    }

    fn root_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        LocalFs.root_metadata(path)
    }
}

fn generator(workers: usize, source: Arc<dyn DirSource>) -> FileTreeGenerator {
    FileTreeGenerator::with_source(WalkConfig::new(workers, None).unwrap(), source).unwrap()
}

fn find<'a>(node: &'a FileNode, name: &str) -> Option<&'a FileNode> {
    node.children().iter().find(|c| c.name == name)
}

fn all_nodes(node: &FileNode) -> Vec<&FileNode> {
    let mut out = vec![node];
    for child in node.children() {
        out.extend(all_nodes(child));
    }
    out
}

fn build_wide_tree(root: &Path, width: usize, depth: usize) {
    if depth == 0 {
        return;
    }
    for i in 0..width {
        let dir = root.join(format!("d{}", i));
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("f.txt"), b"12345").unwrap();
        build_wide_tree(&dir, width, depth - 1);
    }
}

#[test]
fn test_basic_tree() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.log"), b"0123456789").unwrap();

    let result = generate_file_tree(dir.path(), false).unwrap();
    assert_eq!(result.dir_count(), 1);
    assert_eq!(result.file_count(), 2);
    assert_eq!(result.total_bytes(), 15);
    assert!(result.issues().is_empty());

    let root = result.root();
    assert!(root.is_dir);
    assert_eq!(root.path, dir.path().to_string_lossy());
    assert_eq!(root.children().len(), 2);

    let a = find(root, "a.txt").unwrap();
    assert_eq!(a.size, Some(5));
    assert_eq!(a.file_type.as_deref(), Some("txt"));
    assert_eq!(a.created_date, a.last_modified);
    assert!(a.children.is_none());

    let sub = find(root, "sub").unwrap();
    assert!(sub.is_dir);
    assert!(sub.size.is_none());
    let b = find(sub, "b.log").unwrap();
    assert_eq!(b.size, Some(10));
    assert_eq!(b.file_type.as_deref(), Some("log"));
    assert_eq!(b.path, dir.path().join("sub/b.log").to_string_lossy());
}

#[test]
fn test_json_shape() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("README"), b"x").unwrap();

    let result = generate_file_tree(dir.path(), false).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["dirCount"], 0);
    assert_eq!(json["fileCount"], 1);
    assert!(json.get("issues").is_none());

    let file = &json["tree"]["children"][0];
    assert_eq!(file["name"], "README");
    assert_eq!(file["isDir"], false);
    assert!(file.get("fileType").is_none());
    assert!(file.get("children").is_none());
    assert!(file["lastModified"].is_i64());
}

#[test]
fn test_empty_root() {
    let dir = tempdir().unwrap();
    let result = generate_file_tree(dir.path(), false).unwrap();
    assert_eq!(result.dir_count(), 0);
    assert_eq!(result.file_count(), 0);
    assert_eq!(result.root().children, Some(Vec::new()));

    let organized = generate_file_tree(dir.path(), true).unwrap();
    match organized.tree() {
        FileTree::Organized(flat) => {
            assert_eq!(flat.dirs.len(), 1);
            assert!(flat.files.is_empty());
        }
        FileTree::Nested(_) => panic!("expected organized layout"),
    }
}

#[test]
fn test_missing_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let err = generate_file_tree(&missing, false).unwrap_err();
    assert!(matches!(err, TreeError::NotFound { .. }));
    assert!(err.is_validation());
}

#[test]
fn test_file_root() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let err = generate_file_tree(&file, false).unwrap_err();
    assert!(matches!(err, TreeError::NotADirectory { .. }));
}

#[test]
fn test_root_path_is_normalized() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let messy = dir.path().join("sub/./../sub/");

    let result = generate_file_tree(&messy, false).unwrap();
    assert_eq!(result.root().path, dir.path().join("sub").to_string_lossy());
    assert_eq!(result.root().name, "sub");
}

#[test]
fn test_hidden_entries_excluded() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".env"), b"secret").unwrap();
    fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
    fs::create_dir_all(dir.path().join("src/.cache")).unwrap();
    fs::write(dir.path().join("src/.cache/blob"), b"x").unwrap();
    fs::write(dir.path().join("src/.hidden.rs"), b"x").unwrap();
    fs::write(dir.path().join("src/main.rs"), b"fn main() {}").unwrap();

    let result = generate_file_tree(dir.path(), false).unwrap();
    for node in all_nodes(result.root()).into_iter().skip(1) {
        assert!(!node.name.starts_with('.'), "hidden entry {}", node.path);
    }
    assert_eq!(result.dir_count(), 1);
    assert_eq!(result.file_count(), 1);
}

#[test]
fn test_counts_match_tree() {
    let dir = tempdir().unwrap();
    build_wide_tree(dir.path(), 3, 3);

    let result = generate_file_tree(dir.path(), false).unwrap();
    let nodes = all_nodes(result.root());
    assert_eq!(
        (nodes.len() - 1) as u64,
        result.dir_count() + result.file_count()
    );
    // 3 + 9 + 27 directories, one file each
    assert_eq!(result.dir_count(), 39);
    assert_eq!(result.file_count(), 39);

    for node in nodes {
        assert_eq!(node.is_dir, node.children.is_some());
        for child in node.children() {
            assert_eq!(
                PathBuf::from(&child.path),
                PathBuf::from(&node.path).join(&child.name)
            );
        }
    }
}

#[test]
fn test_organized_layout() {
    let dir = tempdir().unwrap();
    build_wide_tree(dir.path(), 2, 2);
    fs::write(dir.path().join("top.md"), b"# top").unwrap();

    let result = generate_file_tree(dir.path(), true).unwrap();
    let total = all_nodes(result.root()).len();

    let flat = match result.tree() {
        FileTree::Organized(flat) => flat,
        FileTree::Nested(_) => panic!("expected organized layout"),
    };
    assert_eq!(flat.len(), total);
    assert_eq!(flat.dirs.len() as u64, result.dir_count() + 1);
    assert_eq!(flat.files.len() as u64, result.file_count());
    assert_eq!(flat.dirs[0].path, result.root().path);
    assert!(flat.dirs.iter().all(|d| d.is_dir && d.children.is_none()));
    assert!(flat.files.iter().all(|f| f.is_leaf() && !f.is_dir));

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["tree"]["dirs"].is_array());
    assert!(json["tree"]["files"].is_array());
}

#[test]
fn test_repeat_walks_agree() {
    let dir = tempdir().unwrap();
    build_wide_tree(dir.path(), 3, 2);

    let first = generate_file_tree(dir.path(), false).unwrap();
    let second = generate_file_tree(dir.path(), false).unwrap();
    assert_eq!(first.dir_count(), second.dir_count());
    assert_eq!(first.file_count(), second.file_count());

    let mut a: Vec<_> = all_nodes(first.root()).iter().map(|n| n.path.clone()).collect();
    let mut b: Vec<_> = all_nodes(second.root()).iter().map(|n| n.path.clone()).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);

    // Organizing twice yields the same projection
    assert_eq!(organize(first.root()), organize(first.root()));
}

#[test]
fn test_concurrency_limit() {
    let dir = tempdir().unwrap();
    build_wide_tree(dir.path(), 6, 2);

    let source = Arc::new(SlowFs::new(Duration::from_millis(20)));
    let result = generator(3, source.clone())
        .generate(dir.path(), false)
        .unwrap();

    assert_eq!(result.dir_count(), 42);
    let max = source.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "{} listings in flight", max);
    assert!(max >= 1);
    assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unreadable_subdirectory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("locked")).unwrap();
    fs::write(dir.path().join("locked/inner.txt"), b"x").unwrap();
    fs::create_dir(dir.path().join("open")).unwrap();
    fs::write(dir.path().join("open/ok.txt"), b"ok").unwrap();

    let source = Arc::new(DenyFs {
        denied: dir.path().join("locked"),
    });
    let result = generator(2, source).generate(dir.path(), false).unwrap();

    let locked = find(result.root(), "locked").unwrap();
    assert_eq!(locked.children, Some(Vec::new()));
    let open = find(result.root(), "open").unwrap();
    assert_eq!(open.children().len(), 1);

    assert_eq!(result.issues().len(), 1);
    match &result.issues()[0] {
        WalkIssue::ReadDir { path, .. } => {
            assert_eq!(path, &dir.path().join("locked").to_string_lossy())
        }
        other => panic!("unexpected issue {:?}", other),
    }

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["issues"][0]["kind"], "readDir");
}

#[test]
fn test_unstattable_entry_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
    fs::write(dir.path().join("gone.txt"), b"gone!").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/inner.txt"), b"in").unwrap();

    let source = Arc::new(StatFailFs {
        broken: dir.path().join("gone.txt"),
    });
    let result = generator(2, source).generate(dir.path(), false).unwrap();

    let root = result.root();
    assert!(find(root, "gone.txt").is_none());
    assert!(find(root, "keep.txt").is_some());
    assert_eq!(find(root, "sub").unwrap().children().len(), 1);

    assert_eq!(result.dir_count(), 1);
    assert_eq!(result.file_count(), 2);
    assert_eq!(result.total_bytes(), 6);
    assert_eq!((all_nodes(root).len() - 1) as u64, 3);

    assert_eq!(result.issues().len(), 1);
    match &result.issues()[0] {
        WalkIssue::Stat { path, .. } => {
            assert_eq!(path, &dir.path().join("gone.txt").to_string_lossy())
        }
        other => panic!("unexpected issue {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_symlinked_root() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("real")).unwrap();
    fs::write(dir.path().join("real/a.txt"), b"abc").unwrap();
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(dir.path().join("real"), &link).unwrap();

    let result = generate_file_tree(&link, false).unwrap();
    assert_eq!(result.root().path, link.to_string_lossy());
    assert_eq!(result.root().name, "link");
    assert_eq!(result.file_count(), 1);
    let a = find(result.root(), "a.txt").unwrap();
    assert_eq!(a.path, link.join("a.txt").to_string_lossy());

    // Symlinks inside the tree are still leaves
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("real/loop")).unwrap();
    let result = generate_file_tree(&link, false).unwrap();
    let looped = find(result.root(), "loop").unwrap();
    assert!(!looped.is_dir);
    assert!(looped.children.is_none());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_sibling_dirs() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let ff = dir.path().join(OsStr::from_bytes(b"d\xff"));
    let fe = dir.path().join(OsStr::from_bytes(b"d\xfe"));
    fs::create_dir(&ff).unwrap();
    fs::create_dir(&fe).unwrap();
    fs::write(ff.join("one.txt"), b"1").unwrap();
    fs::write(fe.join("two.txt"), b"22").unwrap();

    let result = generate_file_tree(dir.path(), false).unwrap();
    assert_eq!(result.dir_count(), 2);
    assert_eq!(result.file_count(), 2);

    let nodes = all_nodes(result.root());
    assert_eq!((nodes.len() - 1) as u64, 4);
    let mut names: Vec<_> = nodes
        .iter()
        .filter(|n| !n.is_dir)
        .map(|n| n.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, ["one.txt", "two.txt"]);
}

#[test]
fn test_unreadable_root() {
    let dir = tempdir().unwrap();
    let source = Arc::new(DenyFs {
        denied: dir.path().to_path_buf(),
    });
    let err = generator(2, source).generate(dir.path(), false).unwrap_err();
    assert!(matches!(err, TreeError::RootUnreadable { .. }));
}

#[test]
fn test_timeout_returns_partial_tree() {
    let dir = tempdir().unwrap();
    build_wide_tree(dir.path(), 2, 6);

    let config = WalkConfig {
        concurrency: 2,
        timeout: Some(Duration::from_millis(150)),
    };
    let source = Arc::new(SlowFs::new(Duration::from_millis(50)));
    let gen = FileTreeGenerator::with_source(config, source).unwrap();

    match gen.generate(dir.path(), false) {
        Err(TreeError::WalkTimeout { elapsed, partial }) => {
            assert!(elapsed >= Duration::from_millis(150));
            // 126 directories exist; only a fraction were reached
            assert!(partial.dir_count() < 126);
            assert!(partial.root().is_dir);
            let nodes = all_nodes(partial.root());
            assert_eq!(
                (nodes.len() - 1) as u64,
                partial.dir_count() + partial.file_count()
            );
            assert!(nodes.iter().all(|n| n.is_dir == n.children.is_some()));
        }
        other => panic!("expected timeout, got {:?}", other.map(|r| r.dir_count())),
    }
}

#[test]
fn test_relative_root() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x.txt"), b"x").unwrap();

    let cwd = std::env::current_dir().unwrap();
    let relative = pathdiff(dir.path(), &cwd);
    let result = generate_file_tree(&relative, false).unwrap();
    assert!(Path::new(&result.root().path).is_absolute());
    assert_eq!(result.file_count(), 1);
}

/// `target` expressed relative to `base` using `..` components
fn pathdiff(target: &Path, base: &Path) -> PathBuf {
    let mut rel = PathBuf::new();
    for _ in base.components().skip(1) {
        rel.push("..");
    }
    rel.join(target.strip_prefix("/").unwrap())
}

#[test]
fn test_token_parsing() {
    let req = TreeRequest::parse("/srv/data::org");
    assert_eq!(req.path, "/srv/data");
    assert!(req.organize);

    let req = TreeRequest::parse("/srv/data");
    assert!(!req.organize);

    let req = TreeRequest::parse("/srv/data::nope");
    assert_eq!(req.path, "/srv/data");
    assert!(!req.organize);
}

#[test]
fn test_invalid_config_rejected() {
    let config = WalkConfig {
        concurrency: 0,
        timeout: None,
    };
    let err = FileTreeGenerator::new(config).err().unwrap();
    assert!(matches!(err, TreeError::Config(_)));
}
