//! The file-operation verbs: move, copy, rename, delete.
//!
//! Each verb validates its source, consults the [`DuplicateHandler`] for the
//! final destination, and is dry-run aware: under dry-run it logs the
//! intended effect and returns the computed destination without touching the
//! filesystem. Archive verbs live in [`crate::archive`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::duplicates::DuplicateHandler;
use crate::error::{OpResult, OperationError};

/// Moves a file to a new location.
///
/// Missing parent directories of the destination are created first. When the
/// destination collides and resolution says skip, the pre-existing path is
/// returned without any effect.
pub fn move_file(
    source: &Path,
    destination: &Path,
    handler: &mut DuplicateHandler,
) -> OpResult<PathBuf> {
    require_file(source)?;
    let dry_run = handler.dry_run();

    let resolved = handler.resolve(
        destination,
        None,
        &format!("Moving {}", source.display()),
    )?;
    if resolved.skip {
        info!("Skipping duplicate file: {}", source.display());
        return Ok(resolved.path);
    }

    ensure_parent(&resolved.path, dry_run)?;

    if dry_run {
        info!(
            "Would move: {} -> {}",
            source.display(),
            resolved.path.display()
        );
        return Ok(resolved.path);
    }

    transfer(source, &resolved.path, true)
        .map_err(|e| OperationError::from_io(e, source))?;
    info!("Moved: {} -> {}", source.display(), resolved.path.display());
    Ok(resolved.path)
}

/// Copies a file to a new location.
pub fn copy_file(
    source: &Path,
    destination: &Path,
    handler: &mut DuplicateHandler,
) -> OpResult<PathBuf> {
    require_file(source)?;
    let dry_run = handler.dry_run();

    let resolved = handler.resolve(
        destination,
        None,
        &format!("Copying {}", source.display()),
    )?;
    if resolved.skip {
        info!("Skipping duplicate file: {}", source.display());
        return Ok(resolved.path);
    }

    ensure_parent(&resolved.path, dry_run)?;

    if dry_run {
        info!(
            "Would copy: {} -> {}",
            source.display(),
            resolved.path.display()
        );
        return Ok(resolved.path);
    }

    transfer(source, &resolved.path, false)
        .map_err(|e| OperationError::from_io(e, source))?;
    info!("Copied: {} -> {}", source.display(), resolved.path.display());
    Ok(resolved.path)
}

/// Renames a file or directory.
///
/// A bare name (no path separator) renames within the source's own
/// directory; anything path-like is treated as a full destination.
pub fn rename_entry(
    source: &Path,
    new_name: &str,
    handler: &mut DuplicateHandler,
) -> OpResult<PathBuf> {
    if !source.exists() {
        return Err(OperationError::not_found(source));
    }
    let dry_run = handler.dry_run();

    let destination = if new_name.contains('/') || new_name.contains('\\') {
        PathBuf::from(new_name)
    } else {
        source
            .parent()
            .map(|p| p.join(new_name))
            .unwrap_or_else(|| PathBuf::from(new_name))
    };

    if destination == source {
        return Ok(destination);
    }

    let resolved = handler.resolve(
        &destination,
        None,
        &format!("Renaming {}", source.display()),
    )?;
    if resolved.skip {
        info!("Skipping rename due to duplicate: {}", source.display());
        return Ok(source.to_path_buf());
    }

    ensure_parent(&resolved.path, dry_run)?;

    if dry_run {
        info!(
            "Would rename: {} -> {}",
            source.display(),
            resolved.path.display()
        );
        return Ok(resolved.path);
    }

    fs::rename(source, &resolved.path).map_err(|e| OperationError::from_io(e, source))?;
    info!(
        "Renamed: {} -> {}",
        source.display(),
        resolved.path.display()
    );
    Ok(resolved.path)
}

/// Deletes a single file.
pub fn delete_file(path: &Path, dry_run: bool) -> OpResult<PathBuf> {
    require_file(path)?;

    if dry_run {
        info!("Would delete file: {}", path.display());
        return Ok(path.to_path_buf());
    }

    fs::remove_file(path).map_err(|e| OperationError::from_io(e, path))?;
    info!("Deleted file: {}", path.display());
    Ok(path.to_path_buf())
}

/// Deletes a directory, recursively or only when empty.
pub fn delete_directory(path: &Path, recursive: bool, dry_run: bool) -> OpResult<PathBuf> {
    if !path.exists() {
        return Err(OperationError::not_found(path));
    }
    if !path.is_dir() {
        return Err(OperationError::invalid_path(
            format!("Not a directory: {}", path.display()),
            path,
        ));
    }

    if dry_run {
        info!("Would delete directory: {}", path.display());
        return Ok(path.to_path_buf());
    }

    if recursive {
        fs::remove_dir_all(path).map_err(|e| OperationError::from_io(e, path))?;
    } else {
        fs::remove_dir(path).map_err(|e| OperationError::from_io(e, path))?;
    }
    info!("Deleted directory: {}", path.display());
    Ok(path.to_path_buf())
}

fn require_file(path: &Path) -> OpResult<()> {
    if !path.exists() {
        return Err(OperationError::not_found(path));
    }
    if !path.is_file() {
        return Err(OperationError::invalid_path(
            format!("Not a file: {}", path.display()),
            path,
        ));
    }
    Ok(())
}

fn ensure_parent(path: &Path, dry_run: bool) -> OpResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if dry_run {
                info!("Would create directory: {}", parent.display());
            } else {
                fs::create_dir_all(parent).map_err(|e| OperationError::from_io(e, parent))?;
            }
        }
    }
    Ok(())
}

/// Renames, falling back to copy-and-remove across filesystems.
fn transfer(source: &Path, destination: &Path, remove_source: bool) -> io::Result<()> {
    if remove_source {
        match fs::rename(source, destination) {
            Ok(()) => return Ok(()),
            Err(_) => {
                fs::copy(source, destination)?;
                fs::remove_file(source)?;
                return Ok(());
            }
        }
    }
    fs::copy(source, destination).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::DuplicateStrategy;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn handler(strategy: DuplicateStrategy, dry_run: bool) -> DuplicateHandler {
        DuplicateHandler::new(strategy, None, false, dry_run)
    }

    #[test]
    fn test_move_file_creates_parents_and_moves() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, "payload").expect("Failed to write file");
        let destination = temp_dir.path().join("nested").join("deep").join("a.txt");

        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let moved = move_file(&source, &destination, &mut h).expect("move");
        assert_eq!(moved, destination);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "payload");
    }

    #[test]
    fn test_move_missing_source_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let result = move_file(
            &temp_dir.path().join("ghost.txt"),
            &temp_dir.path().join("out.txt"),
            &mut h,
        );
        assert_eq!(result.unwrap_err().kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_move_skip_leaves_both_files_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("b.txt");
        fs::write(&source, "new").expect("Failed to write file");
        fs::write(&destination, "old").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::Skip, false);
        let result = move_file(&source, &destination, &mut h).expect("move");
        assert_eq!(result, destination);
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&destination).expect("read"), "old");
    }

    #[test]
    fn test_move_rename_new_on_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("b.txt");
        fs::write(&source, "new").expect("Failed to write file");
        fs::write(&destination, "old").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let result = move_file(&source, &destination, &mut h).expect("move");
        assert_eq!(result, temp_dir.path().join("b_1.txt"));
        assert_eq!(fs::read_to_string(&destination).expect("read"), "old");
        assert_eq!(fs::read_to_string(&result).expect("read"), "new");
    }

    #[test]
    fn test_copy_overwrite_replaces_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("b.txt");
        fs::write(&source, "new").expect("Failed to write file");
        fs::write(&destination, "old").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::Overwrite, false);
        let result = copy_file(&source, &destination, &mut h).expect("copy");
        assert_eq!(result, destination);
        assert_eq!(fs::read_to_string(&destination).expect("read"), "new");
        assert!(source.exists());
    }

    #[test]
    fn test_dry_run_move_changes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("sub").join("a.txt");
        fs::write(&source, "payload").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameNew, true);
        let result = move_file(&source, &destination, &mut h).expect("move");
        assert_eq!(result, destination);
        assert!(source.exists());
        assert!(!destination.exists());
        assert!(!temp_dir.path().join("sub").exists());
    }

    #[test]
    fn test_rename_bare_name_stays_in_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("old.txt");
        fs::write(&source, "payload").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let renamed = rename_entry(&source, "new.txt", &mut h).expect("rename");
        assert_eq!(renamed, temp_dir.path().join("new.txt"));
        assert!(!source.exists());
        assert!(renamed.exists());
    }

    #[test]
    fn test_rename_pathlike_moves_to_full_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("old.txt");
        fs::write(&source, "payload").expect("Failed to write file");
        let target = temp_dir.path().join("elsewhere").join("new.txt");

        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let renamed =
            rename_entry(&source, target.to_str().unwrap(), &mut h).expect("rename");
        assert_eq!(renamed, target);
        assert!(target.exists());
    }

    #[test]
    fn test_rename_to_same_name_is_a_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("same.txt");
        fs::write(&source, "payload").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let renamed = rename_entry(&source, "same.txt", &mut h).expect("rename");
        assert_eq!(renamed, source);
        assert!(source.exists());
    }

    #[test]
    fn test_delete_file_and_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").expect("Failed to write file");
        let dir = temp_dir.path().join("sub");
        fs::create_dir(&dir).expect("Failed to create dir");
        fs::write(dir.join("inner.txt"), "y").expect("Failed to write file");

        delete_file(&file, false).expect("delete file");
        assert!(!file.exists());

        let non_recursive = delete_directory(&dir, false, false);
        assert!(non_recursive.is_err(), "non-empty dir needs recursive mode");

        delete_directory(&dir, true, false).expect("delete dir");
        assert!(!dir.exists());
    }

    #[test]
    fn test_delete_dry_run_keeps_everything() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").expect("Failed to write file");

        delete_file(&file, true).expect("dry delete");
        assert!(file.exists());
    }
}
