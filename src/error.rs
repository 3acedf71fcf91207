//! Error types shared by every file operation in colsort.
//!
//! All expected failure modes (missing files, permission problems, invalid
//! destinations, cancelled prompts) travel through [`OperationError`] and the
//! [`OpResult`] alias rather than panics, so callers can branch on the error
//! kind and batch runs can aggregate failures per item.

use std::io;
use std::path::{Path, PathBuf};

/// Classification of an operation failure.
///
/// The kind is derived from the triggering condition at the failure site,
/// never left as a raw platform error once past the operation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source path that was expected to exist does not.
    NotFound,
    /// The operating system denied access to a path.
    PermissionDenied,
    /// A destination already exists where it must not.
    AlreadyExists,
    /// Any other I/O failure.
    Io,
    /// A path is structurally unusable (wrong kind, no file name, ...).
    InvalidPath,
    /// An operation started but could not be completed.
    OperationFailed,
    /// The user cancelled an interactive prompt.
    UserCancelled,
    /// Bad parameters detected before any filesystem work.
    Validation,
    /// Anything that defies classification.
    Unknown,
}

impl ErrorKind {
    /// Short uppercase label used in error rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::InvalidPath => "INVALID_PATH",
            ErrorKind::OperationFailed => "OPERATION_FAILED",
            ErrorKind::UserCancelled => "USER_CANCELLED",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from a single file operation.
#[derive(Debug)]
pub struct OperationError {
    /// What went wrong, as a branchable classification.
    pub kind: ErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
    /// The offending path, when one is known.
    pub path: Option<PathBuf>,
    /// Underlying I/O error, when one triggered this failure.
    pub source: Option<io::Error>,
}

impl OperationError {
    /// Creates an error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Attaches the offending path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A missing-source error for the given path.
    pub fn not_found(path: &Path) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("Path does not exist: {}", path.display()),
        )
        .with_path(path)
    }

    /// A structurally-invalid-path error.
    pub fn invalid_path(message: impl Into<String>, path: &Path) -> Self {
        Self::new(ErrorKind::InvalidPath, message).with_path(path)
    }

    /// A bad-parameters error detected before any filesystem work.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A mid-operation failure for the given path.
    pub fn operation_failed(message: impl Into<String>, path: &Path) -> Self {
        Self::new(ErrorKind::OperationFailed, message).with_path(path)
    }

    /// A cancelled-by-user error.
    pub fn user_cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserCancelled, message)
    }

    /// Classifies an I/O error against the path it occurred on.
    pub fn from_io(error: io::Error, path: &Path) -> Self {
        let kind = match error.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            _ => ErrorKind::Io,
        };
        Self {
            kind,
            message: error.to_string(),
            path: Some(path.to_path_buf()),
            source: Some(error),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for file operations.
pub type OpResult<T> = Result<T, OperationError>;

/// Collects individual results into one: all successes, or every failure.
///
/// Unlike `Iterator::collect::<Result<Vec<_>, _>>()`, this does not stop at
/// the first failure; a batch caller gets the complete error list.
pub fn collect_results<T, E>(results: Vec<Result<T, E>>) -> Result<Vec<T>, Vec<E>> {
    let mut values = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let op_err = OperationError::from_io(err, Path::new("/tmp/missing"));
        assert_eq!(op_err.kind, ErrorKind::NotFound);
        assert_eq!(op_err.path, Some(PathBuf::from("/tmp/missing")));
    }

    #[test]
    fn test_from_io_classifies_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let op_err = OperationError::from_io(err, Path::new("/root/secret"));
        assert_eq!(op_err.kind, ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_from_io_classifies_other_as_io() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let op_err = OperationError::from_io(err, Path::new("/tmp/f"));
        assert_eq!(op_err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_display_includes_kind_and_path() {
        let err = OperationError::not_found(Path::new("/tmp/x"));
        let text = err.to_string();
        assert!(text.starts_with("NOT_FOUND:"));
        assert!(text.contains("/tmp/x"));
    }

    #[test]
    fn test_collect_results_all_success() {
        let results: Vec<Result<i32, String>> = vec![Ok(1), Ok(2), Ok(3)];
        assert_eq!(collect_results(results), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_collect_results_gathers_every_failure() {
        let results: Vec<Result<i32, &str>> = vec![Ok(1), Err("a"), Ok(2), Err("b")];
        assert_eq!(collect_results(results), Err(vec!["a", "b"]));
    }
}
