//! Filesystem access
//!
//! The controller only touches the disk through [`FileSystem`], so every
//! primitive it relies on is listed here. All calls are blocking and report
//! the offending path on failure.

use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{TreeError, TreeResult};

/// Filesystem primitives used by the controller
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create one directory. Fails if it exists or its parent is missing.
    fn create_dir(&self, path: &Path) -> TreeResult<()>;

    /// Create a directory and any missing parents
    fn create_dir_all(&self, path: &Path) -> TreeResult<()>;

    /// Copy a single file, overwriting the destination
    fn copy_file(&self, from: &Path, to: &Path) -> TreeResult<()>;

    /// Copy a directory tree. Fails if the destination exists, and leaves
    /// no destination behind when the copy fails partway.
    fn copy_dir_all(&self, from: &Path, to: &Path) -> TreeResult<()>;

    /// Move a file or directory
    fn rename(&self, from: &Path, to: &Path) -> TreeResult<()>;

    fn remove_file(&self, path: &Path) -> TreeResult<()>;

    fn remove_dir_all(&self, path: &Path) -> TreeResult<()>;
}

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> TreeResult<()> {
        fs::create_dir(path).map_err(|e| TreeError::from_io("create directory", path, e))
    }

    fn create_dir_all(&self, path: &Path) -> TreeResult<()> {
        fs::create_dir_all(path).map_err(|e| TreeError::from_io("create directory", path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> TreeResult<()> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| TreeError::from_io("copy file to", to, e))
    }

    fn copy_dir_all(&self, from: &Path, to: &Path) -> TreeResult<()> {
        if to.exists() {
            return Err(TreeError::from_io(
                "copy directory to",
                to,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }

        copy_tree(from, to).inspect_err(|_| {
            if to.exists() {
                if let Err(e) = fs::remove_dir_all(to) {
                    warn!("Partial copy {:?} could not be deleted: {}", to, e);
                }
            }
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> TreeResult<()> {
        fs::rename(from, to).map_err(|e| TreeError::from_io("move", from, e))
    }

    fn remove_file(&self, path: &Path) -> TreeResult<()> {
        fs::remove_file(path).map_err(|e| TreeError::from_io("delete file", path, e))
    }

    fn remove_dir_all(&self, path: &Path) -> TreeResult<()> {
        fs::remove_dir_all(path).map_err(|e| TreeError::from_io("delete directory", path, e))
    }
}

fn copy_tree(from: &Path, to: &Path) -> TreeResult<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            TreeError::from_io("read directory", path, io::Error::from(e))
        })?;
        let relative = entry.path().strip_prefix(from).map_err(|e| {
            TreeError::from_io(
                "read directory",
                entry.path(),
                io::Error::new(io::ErrorKind::Other, e),
            )
        })?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target).map_err(|e| TreeError::from_io("create directory", &target, e))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| TreeError::from_io("copy file to", &target, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_dir_fails_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("Algebra");

        LocalFileSystem.create_dir(&dir).unwrap();
        assert!(dir.is_dir());

        let err = LocalFileSystem.create_dir(&dir).unwrap_err();
        assert!(err.to_string().contains("Algebra"));
    }

    #[test]
    fn test_create_dir_fails_without_parent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("missing").join("Algebra");

        assert!(matches!(
            LocalFileSystem.create_dir(&dir),
            Err(TreeError::Io { .. })
        ));
    }

    #[test]
    fn test_copy_dir_all_copies_nested_tree() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        fs::create_dir_all(from.join("child").join("grandchild")).unwrap();
        fs::write(from.join("a.txt"), "a").unwrap();
        fs::write(from.join("child").join("b.txt"), "b").unwrap();

        let to = temp_dir.path().join("to");
        LocalFileSystem.copy_dir_all(&from, &to).unwrap();

        assert_eq!(fs::read_to_string(to.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(to.join("child").join("b.txt")).unwrap(), "b");
        assert!(to.join("child").join("grandchild").is_dir());
        assert!(from.join("a.txt").exists());
    }

    #[test]
    fn test_copy_dir_all_refuses_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        let to = temp_dir.path().join("to");
        fs::create_dir(&from).unwrap();
        fs::create_dir(&to).unwrap();

        let err = LocalFileSystem.copy_dir_all(&from, &to).unwrap_err();
        assert!(matches!(err, TreeError::Io { ref source, .. }
            if source.kind() == io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_copy_dir_all_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = LocalFileSystem.copy_dir_all(
            &temp_dir.path().join("nope"),
            &temp_dir.path().join("to"),
        );
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_all_failure_leaves_no_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        fs::create_dir_all(from.join("child")).unwrap();
        fs::write(from.join("child").join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), from.join("zz_broken")).unwrap();

        let to = temp_dir.path().join("to");
        assert!(LocalFileSystem.copy_dir_all(&from, &to).is_err());
        assert!(!to.exists());

        fs::remove_file(from.join("zz_broken")).unwrap();
        LocalFileSystem.copy_dir_all(&from, &to).unwrap();
        assert!(to.join("child").join("a.txt").is_file());
    }

    #[test]
    fn test_rename_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        fs::write(&a, b"png").unwrap();

        LocalFileSystem.rename(&a, &b).unwrap();
        assert!(!LocalFileSystem.exists(&a));
        assert!(LocalFileSystem.exists(&b));

        LocalFileSystem.remove_file(&b).unwrap();
        assert!(!b.exists());
        assert!(LocalFileSystem.remove_file(&b).is_err());
    }
}
