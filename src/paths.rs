//! Validated file path value objects.
//!
//! [`FilePath`] wraps an absolute, normalized path together with the
//! validation its construction performed (existence, file vs directory).
//! Operations never mutate a `FilePath`; they return new instances, so a
//! path that validated once stays trustworthy for the rest of the run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OpResult, OperationError};

/// The kind of entry a path is expected to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Either a file or a directory.
    Any,
}

/// An absolute, normalized filesystem path.
///
/// Equality and hashing are by the normalized path, so two `FilePath`s built
/// from different relative spellings of the same location compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath {
    path: PathBuf,
}

impl FilePath {
    /// Creates a path that must exist, of any kind.
    pub fn new(path: impl AsRef<Path>) -> OpResult<Self> {
        Self::with_kind(path, PathKind::Any)
    }

    /// Creates a path that must exist and be a regular file.
    pub fn file(path: impl AsRef<Path>) -> OpResult<Self> {
        Self::with_kind(path, PathKind::File)
    }

    /// Creates a path that must exist and be a directory.
    pub fn directory(path: impl AsRef<Path>) -> OpResult<Self> {
        Self::with_kind(path, PathKind::Directory)
    }

    /// Creates a path that need not exist yet (e.g. a planned destination).
    pub fn assume(path: impl AsRef<Path>) -> Self {
        Self {
            path: normalize(path.as_ref()),
        }
    }

    fn with_kind(path: impl AsRef<Path>, kind: PathKind) -> OpResult<Self> {
        let path = path.as_ref();
        let normalized = normalize(path);

        if !normalized.exists() {
            return Err(OperationError::not_found(&normalized));
        }

        match kind {
            PathKind::File if !normalized.is_file() => Err(OperationError::invalid_path(
                format!("Expected a file but got a directory: {}", normalized.display()),
                &normalized,
            )),
            PathKind::Directory if !normalized.is_dir() => Err(OperationError::invalid_path(
                format!("Expected a directory but got a file: {}", normalized.display()),
                &normalized,
            )),
            _ => Ok(Self { path: normalized }),
        }
    }

    /// The underlying path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Consumes the value and returns the owned path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    /// Whether the path currently exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether the path is a regular file.
    pub fn is_file(&self) -> bool {
        self.path.is_file()
    }

    /// Whether the path is a directory.
    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    /// The final path component as a string (lossy for non-UTF-8 names).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The file name without its extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The extension without the leading dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }

    /// The parent directory, if the path has one.
    pub fn parent(&self) -> Option<FilePath> {
        self.path.parent().map(|p| FilePath {
            path: p.to_path_buf(),
        })
    }

    /// Joins additional components onto this path.
    pub fn join(&self, part: impl AsRef<Path>) -> FilePath {
        FilePath {
            path: self.path.join(part),
        }
    }

    /// Returns a sibling path with a different file name.
    pub fn with_file_name(&self, name: impl AsRef<str>) -> FilePath {
        FilePath {
            path: self.path.with_file_name(name.as_ref()),
        }
    }

    /// Lists the regular files directly inside this directory.
    pub fn list_files(&self) -> OpResult<Vec<FilePath>> {
        self.list_entries(|entry| entry.is_file())
    }

    /// Lists the subdirectories directly inside this directory.
    pub fn list_dirs(&self) -> OpResult<Vec<FilePath>> {
        self.list_entries(|entry| entry.is_dir())
    }

    fn list_entries(&self, keep: impl Fn(&Path) -> bool) -> OpResult<Vec<FilePath>> {
        if !self.is_dir() {
            return Err(OperationError::invalid_path(
                format!("Not a directory: {}", self.path.display()),
                &self.path,
            ));
        }

        let entries =
            fs::read_dir(&self.path).map_err(|e| OperationError::from_io(e, &self.path))?;

        let mut results = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OperationError::from_io(e, &self.path))?;
            let path = entry.path();
            if keep(&path) {
                results.push(FilePath { path });
            }
        }

        // Stable ordering keeps batch runs reproducible across platforms.
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    /// This path relative to `base`.
    pub fn relative_to(&self, base: &FilePath) -> OpResult<PathBuf> {
        self.path
            .strip_prefix(&base.path)
            .map(Path::to_path_buf)
            .map_err(|_| {
                OperationError::invalid_path(
                    format!(
                        "{} is not inside {}",
                        self.path.display(),
                        base.path.display()
                    ),
                    &self.path,
                )
            })
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Makes a path absolute and resolves symlinks where possible.
///
/// Paths that do not exist yet cannot be canonicalized, so they are only
/// anchored to the current directory.
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_new_requires_existence() {
        let result = FilePath::new("/definitely/not/a/real/path");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_file_rejects_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = FilePath::file(temp_dir.path());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidPath);
    }

    #[test]
    fn test_directory_rejects_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").expect("Failed to write file");

        let result = FilePath::directory(&file);
        assert!(result.is_err());
    }

    #[test]
    fn test_equality_by_normalized_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").expect("Failed to write file");

        let direct = FilePath::new(&file).expect("direct path");
        let indirect =
            FilePath::new(temp_dir.path().join(".").join("a.txt")).expect("indirect path");
        assert_eq!(direct, indirect);
    }

    #[test]
    fn test_list_files_and_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("one.txt"), "1").expect("Failed to write file");
        fs::write(temp_dir.path().join("two.txt"), "2").expect("Failed to write file");
        fs::create_dir(temp_dir.path().join("sub")).expect("Failed to create dir");

        let dir = FilePath::directory(temp_dir.path()).expect("dir path");
        assert_eq!(dir.list_files().expect("list files").len(), 2);
        assert_eq!(dir.list_dirs().expect("list dirs").len(), 1);
    }

    #[test]
    fn test_relative_to() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("a").join("b.txt");
        fs::create_dir_all(nested.parent().unwrap()).expect("Failed to create dirs");
        fs::write(&nested, "x").expect("Failed to write file");

        let base = FilePath::directory(temp_dir.path()).expect("base");
        let leaf = FilePath::file(&nested).expect("leaf");
        assert_eq!(
            leaf.relative_to(&base).expect("relative"),
            PathBuf::from("a/b.txt")
        );
    }

    #[test]
    fn test_assume_does_not_require_existence() {
        let planned = FilePath::assume("/tmp/colsort-planned-destination");
        assert!(!planned.exists());
        assert_eq!(planned.name(), "colsort-planned-destination");
    }
}
