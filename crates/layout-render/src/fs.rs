//! Filesystem access for template compilation.
//!
//! The template store needs exactly two things from a filesystem: a
//! recursive walk that yields paths with an is-directory flag, and a
//! whole-file read. [`FileSystem`] captures that contract so templates can
//! come from local disk ([`OsFileSystem`]) or from memory
//! ([`MemoryFileSystem`], also used for assets embedded in the binary).
//!
//! # Paths
//!
//! All paths passed to and returned from a [`FileSystem`] are relative to the
//! filesystem's own root. Walking `"templates"` on an [`OsFileSystem`] rooted
//! at `/srv/app` visits `/srv/app/templates` and yields entries such as
//! `templates/home.tmpl`.
//!
//! # Example
//!
//! ```rust
//! use layout_render::fs::{FileSystem, MemoryFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::new()
//!     .with_file("templates/home.tmpl", "Hello")
//!     .with_file("templates/admin/index.tmpl", "Admin");
//!
//! let files: Vec<_> = fs
//!     .walk(Path::new("templates"))
//!     .into_iter()
//!     .filter(|entry| !entry.is_dir)
//!     .collect();
//! assert_eq!(files.len(), 2);
//! assert_eq!(fs.read_file(Path::new("templates/home.tmpl")).unwrap(), b"Hello");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// One item visited during a directory walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the filesystem root.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl WalkEntry {
    /// Creates a file entry.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Creates a directory entry.
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// Read-only hierarchical file store.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Recursively lists everything under `root`, including `root` itself.
    ///
    /// Entries that cannot be visited are skipped; a missing root yields an
    /// empty list.
    fn walk(&self, root: &Path) -> Vec<WalkEntry>;

    /// Reads a whole file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Returns `true` when `dir` denotes the filesystem root itself.
pub(crate) fn is_root(dir: &Path) -> bool {
    dir.components().all(|c| matches!(c, Component::CurDir))
}

// =============================================================================
// Local disk
// =============================================================================

/// Local disk filesystem rooted at a base directory.
#[derive(Debug, Clone)]
pub struct OsFileSystem {
    base: PathBuf,
}

impl OsFileSystem {
    /// Creates a filesystem rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The directory all paths are resolved against.
    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl Default for OsFileSystem {
    /// Rooted at the process working directory.
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileSystem for OsFileSystem {
    fn walk(&self, root: &Path) -> Vec<WalkEntry> {
        WalkDir::new(self.base.join(root))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.base).ok()?;
                Some(WalkEntry {
                    path: relative.to_path_buf(),
                    is_dir: entry.file_type().is_dir(),
                })
            })
            .collect()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.base.join(path))
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory filesystem.
///
/// Useful for tests and for templates embedded in the binary with
/// `include_str!`; see [`MemoryFileSystem::from_entries`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filesystem from `(relative path, content)` pairs placed under
    /// `root`.
    ///
    /// ```rust
    /// use layout_render::fs::{FileSystem, MemoryFileSystem};
    /// use std::path::Path;
    ///
    /// static TEMPLATES: &[(&str, &str)] = &[("home.tmpl", "Hello"), ("layout.tmpl", "{{ yield() }}")];
    ///
    /// let fs = MemoryFileSystem::from_entries("templates", TEMPLATES);
    /// assert!(fs.read_file(Path::new("templates/layout.tmpl")).is_ok());
    /// ```
    pub fn from_entries(root: impl AsRef<Path>, entries: &[(&str, &str)]) -> Self {
        let root = root.as_ref();
        let mut fs = Self::new();
        for (path, content) in entries {
            fs.insert(root.join(path), *content);
        }
        fs
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Removes a file, returning its content.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.remove(path.as_ref())
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files are held.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn walk(&self, root: &Path) -> Vec<WalkEntry> {
        let whole = is_root(root);
        let mut dirs = BTreeSet::new();
        let mut files = Vec::new();

        for path in self.files.keys() {
            if !whole && !path.starts_with(root) {
                continue;
            }
            let mut parent = path.parent();
            while let Some(dir) = parent {
                if dir.as_os_str().is_empty() || (!whole && !dir.starts_with(root)) {
                    break;
                }
                dirs.insert(dir.to_path_buf());
                parent = dir.parent();
            }
            files.push(WalkEntry::file(path));
        }

        if files.is_empty() {
            return Vec::new();
        }

        let mut entries: Vec<WalkEntry> = dirs.into_iter().map(WalkEntry::dir).collect();
        entries.extend(files);
        entries
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&full_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn file_paths(entries: &[WalkEntry]) -> Vec<String> {
        entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    // =========================================================================
    // OsFileSystem
    // =========================================================================

    #[test]
    fn test_os_walk_yields_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "templates/home.tmpl", "home");
        create_file(temp_dir.path(), "templates/admin/index.tmpl", "admin");

        let fs = OsFileSystem::new(temp_dir.path());
        let entries = fs.walk(Path::new("templates"));

        let files = file_paths(&entries);
        assert_eq!(files, vec!["templates/admin/index.tmpl", "templates/home.tmpl"]);
        assert!(entries
            .iter()
            .any(|e| e.is_dir && e.path == Path::new("templates/admin")));
    }

    #[test]
    fn test_os_walk_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new(temp_dir.path());
        assert!(fs.walk(Path::new("nope")).is_empty());
    }

    #[test]
    fn test_os_read_file() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "templates/home.tmpl", "content");

        let fs = OsFileSystem::new(temp_dir.path());
        let bytes = fs.read_file(Path::new("templates/home.tmpl")).unwrap();
        assert_eq!(bytes, b"content");
    }

    #[test]
    fn test_os_read_missing_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let fs = OsFileSystem::new(temp_dir.path());
        let err = fs.read_file(Path::new("missing.tmpl")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    // =========================================================================
    // MemoryFileSystem
    // =========================================================================

    #[test]
    fn test_memory_walk_filters_by_root() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/a.tmpl", "a")
            .with_file("templates/sub/b.tmpl", "b")
            .with_file("other/c.tmpl", "c");

        let entries = fs.walk(Path::new("templates"));
        assert_eq!(
            file_paths(&entries),
            vec!["templates/a.tmpl", "templates/sub/b.tmpl"]
        );
        assert!(entries.contains(&WalkEntry::dir("templates")));
        assert!(entries.contains(&WalkEntry::dir("templates/sub")));
        assert!(!entries.contains(&WalkEntry::dir("other")));
    }

    #[test]
    fn test_memory_walk_root_dot_lists_everything() {
        let fs = MemoryFileSystem::new()
            .with_file("a.tmpl", "a")
            .with_file("dir/b.tmpl", "b");

        let entries = fs.walk(Path::new("."));
        assert_eq!(file_paths(&entries), vec!["a.tmpl", "dir/b.tmpl"]);
    }

    #[test]
    fn test_memory_walk_does_not_match_sibling_prefix() {
        let fs = MemoryFileSystem::new().with_file("templates2/a.tmpl", "a");
        assert!(fs.walk(Path::new("templates")).is_empty());
    }

    #[test]
    fn test_memory_from_entries() {
        let fs = MemoryFileSystem::from_entries("views", &[("home.tmpl", "Hi"), ("x/y.tmpl", "Y")]);
        assert_eq!(fs.len(), 2);
        assert_eq!(fs.read_file(Path::new("views/x/y.tmpl")).unwrap(), b"Y");
    }

    #[test]
    fn test_memory_insert_replaces_and_remove() {
        let mut fs = MemoryFileSystem::new();
        fs.insert("a.tmpl", "one");
        fs.insert("a.tmpl", "two");
        assert_eq!(fs.read_file(Path::new("a.tmpl")).unwrap(), b"two");
        assert_eq!(fs.remove("a.tmpl"), Some(b"two".to_vec()));
        assert!(fs.is_empty());
    }

    #[test]
    fn test_is_root() {
        assert!(is_root(Path::new(".")));
        assert!(is_root(Path::new("")));
        assert!(!is_root(Path::new("templates")));
    }
}
