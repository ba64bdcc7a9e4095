//! Directory operations
//!
//! `DirectoryManager` wraps a root path and performs file-system operations
//! rooted at that path. The root is a starting point, not a sandbox: absolute
//! arguments may point anywhere.
//!
//! Relative arguments resolve against the manager's own working directory,
//! which starts at the root and is changed with the `change_to*` methods. The
//! process working directory is never touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::{set_file_times, FileTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::archive::{self, ArchiveError, ArchiveFormat};

#[derive(Error, Debug)]
pub enum DirError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

pub type Result<T> = std::result::Result<T, DirError>;

impl DirError {
    /// Classify an io error raised while working on `path`
    fn from_io(err: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            _ => Self::Io(err),
        }
    }
}

fn copy_error(err: fs_extra::error::Error) -> DirError {
    DirError::Io(io::Error::other(err.to_string()))
}

/// A path from a recursive listing with its own metadata size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySize {
    pub path: PathBuf,
    /// Directories report the size of their directory entry, not their contents
    pub size: u64,
}

/// Options for copying items into a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    /// Replace files that already exist at the destination
    pub overwrite: bool,
    /// Carry access and modification times over to the copy
    pub preserve_metadata: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            preserve_metadata: false,
        }
    }
}

/// Result of a batch copy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyReport {
    pub total: usize,
    pub copied: Vec<PathBuf>,
    pub errors: Vec<CopyFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub error: String,
}

impl CopyReport {
    /// True when every item was copied
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.copied.len() == self.total
    }
}

/// Path-scoped directory manager
#[derive(Debug, Clone)]
pub struct DirectoryManager {
    root_path: String,
    current_dir: PathBuf,
}

impl DirectoryManager {
    /// Create a manager for `root`. Backslashes are normalized to `/`.
    ///
    /// The root is not checked here; each operation checks what it needs.
    pub fn new(root: impl Into<String>) -> Self {
        let root_path = root.into().replace('\\', "/");
        let current_dir = PathBuf::from(&root_path);
        Self {
            root_path,
            current_dir,
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn root(&self) -> &Path {
        Path::new(&self.root_path)
    }

    /// Directory that relative arguments resolve against
    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Resolve `path` against the current directory unless it is absolute
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).exists()
    }

    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).is_dir()
    }

    /// Make the root the current directory.
    ///
    /// Fails with `NotFound`, `NotADirectory` or `PermissionDenied` and
    /// leaves the current directory unchanged in that case.
    pub fn change_to_root(&mut self) -> Result<()> {
        let root = self.root().to_path_buf();
        check_enterable(&root).inspect_err(|e| {
            tracing::warn!("Cannot change to root {}: {}", root.display(), e);
        })?;

        tracing::debug!("Changed directory to: {}", root.display());
        self.current_dir = root;
        Ok(())
    }

    /// Make `root/child` the current directory and return it
    pub fn change_to_child(&mut self, child: &str) -> Result<PathBuf> {
        let child_path = PathBuf::from(format!("{}/{}", self.root_path, child));
        self.enter(child_path)
    }

    /// Make `destination` the current directory and return it
    pub fn change_to(&mut self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = self.resolve(destination);
        self.enter(destination)
    }

    /// `change_to_root` for operations where the reset is only a side effect
    fn reset_to_root(&mut self) {
        if self.change_to_root().is_err() {
            tracing::debug!("Keeping current directory {}", self.current_dir.display());
        }
    }

    fn enter(&mut self, path: PathBuf) -> Result<PathBuf> {
        require_dir(&path).inspect_err(|e| {
            tracing::warn!("Can't change the current directory: {}", e);
        })?;

        tracing::debug!("Changed directory to: {}", path.display());
        self.current_dir = path.clone();
        Ok(path)
    }

    /// Move the `source` folder into the `destination` folder.
    ///
    /// Both must be existing directories; a file source is rejected. Returns
    /// the folder's new path, `destination/<source name>`.
    pub fn move_folder(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let source = self.resolve(source);
        let destination = self.resolve(destination);

        require_dir(&source).inspect_err(|e| {
            tracing::warn!("Folder to move is unusable: {}", e);
        })?;
        require_dir(&destination).inspect_err(|e| {
            tracing::warn!("Destination folder is unusable: {}", e);
        })?;

        let name = source
            .file_name()
            .ok_or_else(|| DirError::InvalidPath(source.clone()))?;
        let target = destination.join(name);
        if target.exists() {
            return Err(DirError::AlreadyExists(target));
        }

        match fs::rename(&source, &target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!("Cross-device move, copying {} instead", source.display());
                let options = fs_extra::dir::CopyOptions::new();
                fs_extra::dir::move_dir(&source, &destination, &options).map_err(copy_error)?;
            }
            Err(e) => return Err(DirError::from_io(e, &source)),
        }

        tracing::info!("Moved {} into {}", source.display(), destination.display());
        Ok(target)
    }

    /// Names of the root's immediate children, in enumeration order
    pub fn list_top(&self) -> Result<Vec<String>> {
        let root = self.root();
        require_dir(root)?;

        let mut names = Vec::new();
        for entry in fs::read_dir(root).map_err(|e| DirError::from_io(e, root))? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Keep the items whose name contains a match for `pattern`.
    ///
    /// The regex is searched for anywhere in the name, so anchor it with `^`
    /// and `$` for a full match. Also resets the current directory to the
    /// root; an unusable root is logged and the names are filtered anyway.
    pub fn filter_by_pattern<S: AsRef<str>>(
        &mut self,
        pattern: &str,
        items: &[S],
    ) -> Result<Vec<String>> {
        self.reset_to_root();
        let regex = Regex::new(pattern)?;

        Ok(items
            .iter()
            .map(|item| item.as_ref())
            .filter(|item| regex.is_match(item))
            .map(str::to_owned)
            .collect())
    }

    /// Create the directory `root/name` and return its path
    pub fn create(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::create_dir(&path).map_err(|e| DirError::from_io(e, &path))?;

        tracing::info!("Directory '{}' created", path.display());
        Ok(path)
    }

    /// Copy `items` into `destination` with default options
    pub fn copy_into<P: AsRef<Path>>(
        &mut self,
        items: &[P],
        destination: impl AsRef<Path>,
    ) -> Result<CopyReport> {
        self.copy_into_with(items, destination, &CopyOptions::default())
    }

    /// Copy `items` into `destination`.
    ///
    /// Resets the current directory to the root first, so relative items
    /// resolve against the root. If the root is unusable the current
    /// directory is kept. A bad destination fails the whole batch;
    /// per-item failures are collected in the report and copies already made
    /// are kept.
    pub fn copy_into_with<P: AsRef<Path>>(
        &mut self,
        items: &[P],
        destination: impl AsRef<Path>,
        options: &CopyOptions,
    ) -> Result<CopyReport> {
        self.reset_to_root();
        let destination = self.resolve(destination);
        require_dir(&destination).inspect_err(|e| {
            tracing::warn!("Destination folder is unusable: {}", e);
        })?;

        let mut report = CopyReport {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            let source = self.resolve(item);
            match copy_item(&source, &destination, options) {
                Ok(target) => report.copied.push(target),
                Err(e) => {
                    tracing::warn!("Failed to copy {}: {}", source.display(), e);
                    report.errors.push(CopyFailure {
                        path: source,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Copied {}/{} items to {}",
            report.copied.len(),
            report.total,
            destination.display()
        );
        Ok(report)
    }

    /// Delete a file, symlink or whole directory tree
    pub fn delete(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(path);

        let metadata = fs::symlink_metadata(&path).map_err(|e| {
            let err = DirError::from_io(e, &path);
            tracing::warn!("Cannot delete: {}", err);
            err
        })?;

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| DirError::from_io(e, &path))?;

        tracing::info!("Deleted {}", path.display());
        Ok(())
    }

    /// Rename `path` to `new_name` and return the new path.
    ///
    /// `new_name` resolves like any other argument, so a bare name lands in
    /// the current directory.
    pub fn rename(&self, path: impl AsRef<Path>, new_name: impl AsRef<Path>) -> Result<PathBuf> {
        let from = self.resolve(path);
        let to = self.resolve(new_name);

        if !from.exists() {
            tracing::warn!("Path doesn't exist: {}", from.display());
            return Err(DirError::NotFound(from));
        }

        fs::rename(&from, &to).map_err(|e| DirError::from_io(e, &to))?;
        tracing::info!("Renamed {} to {}", from.display(), to.display());
        Ok(to)
    }

    /// Every directory and file below `path`, top-down.
    ///
    /// For each directory visited, its subdirectories are listed first, then
    /// its files, then each subdirectory is walked in turn. Symlinked
    /// directories are listed but not descended into.
    pub fn list_recursive(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        walk_top_down(&self.resolve(path))
    }

    /// `list_recursive` with each entry's own metadata size
    pub fn list_recursive_with_sizes(&self, path: impl AsRef<Path>) -> Result<Vec<EntrySize>> {
        let entries = self.list_recursive(path)?;
        Ok(entries
            .into_iter()
            .map(|path| {
                let size = match fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path)) {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        tracing::warn!("Cannot read size of {}, reporting 0: {}", path.display(), e);
                        0
                    }
                };
                EntrySize { path, size }
            })
            .collect())
    }

    /// Total bytes of all files at or below `path`
    pub fn total_size(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = self.resolve(path);
        if !path.exists() {
            return Err(DirError::NotFound(path));
        }

        let mut total = 0;
        for entry in WalkDir::new(&path) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping entry while sizing {}: {}", path.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok(total)
    }

    /// Zip the contents of `path` into `archive_base.zip`
    pub fn compress(&self, path: impl AsRef<Path>, archive_base: impl AsRef<Path>) -> Result<PathBuf> {
        self.compress_as(path, archive_base, ArchiveFormat::Zip)
    }

    /// Archive the contents of `path` as `archive_base.<format extension>`
    pub fn compress_as(
        &self,
        path: impl AsRef<Path>,
        archive_base: impl AsRef<Path>,
        format: ArchiveFormat,
    ) -> Result<PathBuf> {
        let source = self.resolve(path);
        require_dir(&source)?;

        let archive_path = format.archive_path(&self.resolve(archive_base));
        archive::create_archive(&source, &archive_path, format)?;

        tracing::info!("Compressed {} into {}", source.display(), archive_path.display());
        Ok(archive_path)
    }

    /// Unpack `archive` into `destination`, inferring the format from its extension
    pub fn extract(&self, archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let archive_path = self.resolve(archive);
        let destination = self.resolve(destination);

        if !archive_path.exists() {
            tracing::warn!("Archive doesn't exist: {}", archive_path.display());
            return Err(DirError::NotFound(archive_path));
        }

        archive::unpack_archive(&archive_path, &destination)?;
        tracing::info!("Extracted {} into {}", archive_path.display(), destination.display());
        Ok(destination)
    }
}

// Helper functions

fn require_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        Err(DirError::NotFound(path.to_path_buf()))
    } else if !path.is_dir() {
        Err(DirError::NotADirectory(path.to_path_buf()))
    } else {
        Ok(())
    }
}

/// A directory can be entered if it exists, is a directory and can be read
fn check_enterable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| DirError::from_io(e, path))?;
    if !metadata.is_dir() {
        return Err(DirError::NotADirectory(path.to_path_buf()));
    }
    fs::read_dir(path).map_err(|e| DirError::from_io(e, path))?;
    Ok(())
}

fn copy_item(source: &Path, destination: &Path, options: &CopyOptions) -> Result<PathBuf> {
    if !source.exists() {
        return Err(DirError::NotFound(source.to_path_buf()));
    }

    let name = source
        .file_name()
        .ok_or_else(|| DirError::InvalidPath(source.to_path_buf()))?;
    let target = destination.join(name);
    if target.exists() && !options.overwrite {
        return Err(DirError::AlreadyExists(target));
    }

    if source.is_dir() {
        let mut copy_options = fs_extra::dir::CopyOptions::new();
        copy_options.overwrite = options.overwrite;
        fs_extra::dir::copy(source, destination, &copy_options).map_err(copy_error)?;
    } else {
        fs::copy(source, &target).map_err(|e| DirError::from_io(e, source))?;
    }

    if options.preserve_metadata {
        let metadata = fs::metadata(source)?;
        set_file_times(
            &target,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )?;
    }

    Ok(target)
}

fn walk_top_down(start: &Path) -> Result<Vec<PathBuf>> {
    require_dir(start)?;

    let mut items = Vec::new();
    let mut pending = vec![start.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == start => return Err(DirError::from_io(e, &dir)),
            Err(e) => {
                tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_dir() {
                        dirs.push(path);
                    } else {
                        files.push(path);
                    }
                }
                Err(e) => tracing::warn!("Skipping entry in {}: {}", dir.display(), e),
            }
        }

        // Reversed so the first subdirectory is walked first
        pending.extend(dirs.iter().rev().filter(|p| !p.is_symlink()).cloned());
        items.append(&mut dirs);
        items.append(&mut files);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Root with `a.txt` (10 bytes) and `b/c.txt` (5 bytes)
    fn scenario() -> (TempDir, DirectoryManager) {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "0123456789").unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("b").join("c.txt"), "hello").unwrap();

        let manager = DirectoryManager::new(temp.path().to_string_lossy());
        (temp, manager)
    }

    #[test]
    fn test_root_path_normalized() {
        let manager = DirectoryManager::new(r"C:\Users\me\Documents");
        assert_eq!(manager.root_path(), "C:/Users/me/Documents");
        assert_eq!(manager.current_dir(), Path::new("C:/Users/me/Documents"));
    }

    #[test]
    fn test_exists_and_is_directory() {
        let (temp, manager) = scenario();

        assert!(manager.exists("a.txt"));
        assert!(manager.exists(temp.path().join("b")));
        assert!(!manager.exists("missing"));

        assert!(manager.is_directory("b"));
        assert!(!manager.is_directory("a.txt"));
        assert!(!manager.is_directory("missing"));
    }

    #[test]
    fn test_change_to_root_failures() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        let mut manager = DirectoryManager::new(missing.to_string_lossy());
        manager.current_dir = temp.path().to_path_buf();

        assert!(matches!(manager.change_to_root(), Err(DirError::NotFound(_))));
        assert_eq!(manager.current_dir(), temp.path());

        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let mut manager = DirectoryManager::new(file.to_string_lossy());
        assert!(matches!(manager.change_to_root(), Err(DirError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_change_to_root_unreadable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still read the directory
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut manager = DirectoryManager::new(locked.to_string_lossy());
        manager.current_dir = temp.path().to_path_buf();
        let result = manager.change_to_root();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(DirError::PermissionDenied(_))));
        assert_eq!(manager.current_dir(), temp.path());
    }

    #[test]
    fn test_change_to_child_and_back() {
        let (temp, mut manager) = scenario();

        let child = manager.change_to_child("b").unwrap();
        assert_eq!(child, temp.path().join("b"));
        assert!(manager.exists("c.txt"));

        assert!(matches!(manager.change_to_child("a.txt"), Err(DirError::NotADirectory(_))));
        assert!(matches!(manager.change_to_child("zzz"), Err(DirError::NotFound(_))));
        assert_eq!(manager.current_dir(), temp.path().join("b"));

        manager.change_to_root().unwrap();
        assert_eq!(manager.current_dir(), temp.path());
    }

    #[test]
    fn test_change_to_relative_path() {
        let (temp, mut manager) = scenario();
        fs::create_dir(temp.path().join("b").join("d")).unwrap();

        manager.change_to("b").unwrap();
        let inner = manager.change_to("d").unwrap();
        assert_eq!(inner, temp.path().join("b").join("d"));
        assert!(manager.change_to("missing").is_err());
        assert_eq!(manager.current_dir(), inner);
    }

    #[test]
    fn test_create_then_exists() {
        let (temp, manager) = scenario();

        let created = manager.create("new").unwrap();
        assert_eq!(created, temp.path().join("new"));
        assert!(manager.exists(&created));

        assert!(matches!(manager.create("new"), Err(DirError::AlreadyExists(_))));
    }

    #[test]
    fn test_delete_is_idempotent_in_effect() {
        let (_temp, manager) = scenario();

        manager.delete("b").unwrap();
        assert!(!manager.exists("b"));
        assert!(matches!(manager.delete("b"), Err(DirError::NotFound(_))));

        manager.delete("a.txt").unwrap();
        assert!(!manager.exists("a.txt"));
    }

    #[test]
    fn test_rename() {
        let (temp, manager) = scenario();

        let renamed = manager.rename("a.txt", "z.txt").unwrap();
        assert_eq!(renamed, temp.path().join("z.txt"));
        assert!(!manager.exists("a.txt"));
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "0123456789");

        assert!(matches!(manager.rename("a.txt", "y.txt"), Err(DirError::NotFound(_))));
    }

    #[test]
    fn test_list_top() {
        let (_temp, manager) = scenario();

        let mut names = manager.list_top().unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b"]);

        let missing = DirectoryManager::new("/definitely/not/here");
        assert!(matches!(missing.list_top(), Err(DirError::NotFound(_))));
    }

    #[test]
    fn test_filter_by_pattern_searches() {
        let (temp, mut manager) = scenario();
        manager.change_to_child("b").unwrap();

        let matched = manager
            .filter_by_pattern("^a", &["a.txt", "b.txt", "abc"])
            .unwrap();
        assert_eq!(matched, vec!["a.txt", "abc"]);
        assert_eq!(manager.current_dir(), temp.path());

        let matched = manager.filter_by_pattern("txt", &["a.txt", "b.txt", "abc"]).unwrap();
        assert_eq!(matched, vec!["a.txt", "b.txt"]);

        assert!(matches!(
            manager.filter_by_pattern("(", &["a"]),
            Err(DirError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_filter_by_pattern_with_missing_root() {
        let mut manager = DirectoryManager::new("/definitely/not/here");
        manager.current_dir = PathBuf::from("/tmp");

        let matched = manager
            .filter_by_pattern("^a", &["a.txt", "b.txt", "abc"])
            .unwrap();
        assert_eq!(matched, vec!["a.txt", "abc"]);
        assert_eq!(manager.current_dir(), Path::new("/tmp"));
    }

    #[test]
    fn test_move_folder() {
        let (temp, manager) = scenario();
        fs::create_dir(temp.path().join("other")).unwrap();

        let moved = manager.move_folder("b", "other").unwrap();
        assert_eq!(moved, temp.path().join("other").join("b"));
        assert!(!manager.exists("b"));
        assert!(manager.exists("other/b/c.txt"));
    }

    #[test]
    fn test_move_folder_missing_destination() {
        let (temp, manager) = scenario();
        let other = temp.path().join("elsewhere");

        let err = manager.move_folder("b", &other).unwrap_err();
        assert!(matches!(err, DirError::NotFound(p) if p == other));
        assert!(manager.is_directory("b"));
    }

    #[test]
    fn test_move_folder_rejects_file_source() {
        let (temp, manager) = scenario();
        fs::create_dir(temp.path().join("other")).unwrap();

        assert!(matches!(
            manager.move_folder("a.txt", "other"),
            Err(DirError::NotADirectory(_))
        ));
        assert!(manager.exists("a.txt"));
    }

    #[test]
    fn test_move_folder_occupied_target() {
        let (temp, manager) = scenario();
        fs::create_dir_all(temp.path().join("other").join("b")).unwrap();

        assert!(matches!(
            manager.move_folder("b", "other"),
            Err(DirError::AlreadyExists(_))
        ));
        assert!(manager.exists("b/c.txt"));
    }

    #[test]
    fn test_copy_into() {
        let (temp, mut manager) = scenario();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let report = manager.copy_into(&["a.txt", "b", "missing.txt"], &dest).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.copied, vec![dest.join("a.txt"), dest.join("b")]);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.is_complete());

        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "0123456789");
        assert_eq!(fs::read_to_string(dest.join("b").join("c.txt")).unwrap(), "hello");
        // Sources stay in place
        assert!(manager.exists("a.txt"));
    }

    #[test]
    fn test_copy_into_missing_destination() {
        let (_temp, mut manager) = scenario();

        let err = manager.copy_into(&["a.txt"], "nowhere").unwrap_err();
        assert!(matches!(err, DirError::NotFound(_)));
    }

    #[test]
    fn test_copy_into_with_missing_root() {
        let (temp, _) = scenario();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let mut manager = DirectoryManager::new(temp.path().join("gone").to_string_lossy());
        manager.current_dir = temp.path().to_path_buf();

        let report = manager.copy_into(&["a.txt", "b"], &dest).unwrap();
        assert!(report.is_complete());
        assert!(dest.join("a.txt").exists());
        assert!(dest.join("b").join("c.txt").exists());
        assert_eq!(manager.current_dir(), temp.path());
    }

    #[test]
    fn test_copy_into_without_overwrite() {
        let (temp, mut manager) = scenario();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("a.txt"), "old").unwrap();

        let options = CopyOptions {
            overwrite: false,
            ..Default::default()
        };
        let report = manager.copy_into_with(&["a.txt"], &dest, &options).unwrap();
        assert!(report.copied.is_empty());
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "old");
    }

    #[test]
    fn test_copy_preserves_times() {
        let (temp, mut manager) = scenario();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let stamp = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(temp.path().join("a.txt"), stamp).unwrap();

        let options = CopyOptions {
            preserve_metadata: true,
            ..Default::default()
        };
        manager.copy_into_with(&["a.txt"], &dest, &options).unwrap();

        let copied = fs::metadata(dest.join("a.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), stamp);
    }

    #[test]
    fn test_list_recursive_order() {
        let (temp, manager) = scenario();
        let root = temp.path();

        let items = manager.list_recursive(root).unwrap();
        assert_eq!(
            items,
            vec![root.join("b"), root.join("a.txt"), root.join("b").join("c.txt")]
        );
    }

    #[test]
    fn test_list_recursive_bad_roots() {
        let (_temp, manager) = scenario();

        assert!(matches!(manager.list_recursive("missing"), Err(DirError::NotFound(_))));
        assert!(matches!(manager.list_recursive("a.txt"), Err(DirError::NotADirectory(_))));
    }

    #[test]
    fn test_sizes_match_listing() {
        let (temp, manager) = scenario();
        let root = temp.path();

        let items = manager.list_recursive(root).unwrap();
        let sized = manager.list_recursive_with_sizes(root).unwrap();
        let paths: Vec<PathBuf> = sized.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, items);

        let size_of = |p: PathBuf| sized.iter().find(|e| e.path == p).unwrap().size;
        assert_eq!(size_of(root.join("a.txt")), 10);
        assert_eq!(size_of(root.join("b").join("c.txt")), 5);
        // Directory entries report their own metadata size
        assert_eq!(size_of(root.join("b")), fs::metadata(root.join("b")).unwrap().len());
    }

    #[cfg(unix)]
    #[test]
    fn test_sizes_of_dangling_symlink() {
        let (temp, manager) = scenario();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("vanished"), &link).unwrap();

        let sized = manager.list_recursive_with_sizes(temp.path()).unwrap();
        let entry = sized.iter().find(|e| e.path == link).unwrap();
        assert_eq!(entry.size, fs::symlink_metadata(&link).unwrap().len());
    }

    #[test]
    fn test_total_size() {
        let (_temp, manager) = scenario();

        assert_eq!(manager.total_size(".").unwrap(), 15);
        assert_eq!(manager.total_size("b").unwrap(), 5);
        assert_eq!(manager.total_size("a.txt").unwrap(), 10);
        assert!(manager.total_size("missing").is_err());
    }

    #[test]
    fn test_compress_and_extract() {
        let (temp, manager) = scenario();
        let work = tempdir().unwrap();

        let archive = manager
            .compress(temp.path(), work.path().join("archive"))
            .unwrap();
        assert_eq!(archive, work.path().join("archive.zip"));

        let restored = work.path().join("restored");
        manager.extract(&archive, &restored).unwrap();
        assert_eq!(fs::read(restored.join("a.txt")).unwrap(), b"0123456789");
        assert_eq!(fs::read(restored.join("b").join("c.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_compress_as_tar() {
        let (temp, manager) = scenario();
        let work = tempdir().unwrap();

        let archive = manager
            .compress_as("b", work.path().join("only-b"), ArchiveFormat::Tar)
            .unwrap();
        assert_eq!(archive, work.path().join("only-b.tar"));

        let restored = work.path().join("restored");
        manager.extract(&archive, &restored).unwrap();
        assert_eq!(fs::read_to_string(restored.join("c.txt")).unwrap(), "hello");
        assert!(temp.path().join("b").exists());
    }

    #[test]
    fn test_extract_missing_archive() {
        let (_temp, manager) = scenario();
        assert!(matches!(
            manager.extract("missing.zip", "out"),
            Err(DirError::NotFound(_))
        ));
    }
}
