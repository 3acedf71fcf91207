//! Processing skeletons for single files and directory trees.
//!
//! [`FileProcessor`] and [`DirectoryProcessor`] sequence the fixed steps
//! every operation shares: validate the source, prepare the destination,
//! resolve duplicates, execute the verb, then recurse or post-process.
//! Directory recursion runs on an explicit worklist so deep trees cannot
//! exhaust the stack, and verbs are closed enums so adding one is a
//! compile-checked change.

use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::archive;
use crate::duplicates::DuplicateHandler;
use crate::error::{OpResult, OperationError};
use crate::operations;
use crate::paths::FilePath;

/// Verbs a [`FileProcessor`] can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Move the file into the destination.
    Move,
    /// Copy the file into the destination.
    Copy,
}

/// Verbs a [`DirectoryProcessor`] can perform.
#[derive(Debug, Clone)]
pub enum DirectoryAction {
    /// Move the directory's contents into the destination tree.
    Move,
    /// Copy the directory's contents into the destination tree.
    Copy,
    /// Pack the directory into a ZIP next to the mirrored destination path.
    Archive {
        /// Explicit archive name; the directory's own name when `None`.
        archive_name: Option<String>,
        /// Deflate level, 0-9.
        compression_level: u32,
        /// Remove the source tree after the archive is written.
        remove_source: bool,
    },
}

/// Fixed-skeleton processor for a single file.
#[derive(Debug, Clone, Copy)]
pub struct FileProcessor {
    action: FileAction,
}

impl FileProcessor {
    /// Creates a processor for the given verb.
    pub fn new(action: FileAction) -> Self {
        Self { action }
    }

    /// The verb this processor performs.
    pub fn action(&self) -> FileAction {
        self.action
    }

    /// Runs the skeleton for one file.
    ///
    /// Duplicate resolution happens inside the verb itself; a skip outcome
    /// returns the pre-existing path untouched.
    pub fn process(
        &self,
        source: &FilePath,
        destination: &FilePath,
        handler: &mut DuplicateHandler,
    ) -> OpResult<PathBuf> {
        if !source.exists() {
            return Err(OperationError::not_found(source.as_path()));
        }
        if source == destination {
            return Err(OperationError::new(
                crate::error::ErrorKind::AlreadyExists,
                "Source and destination are the same file",
            )
            .with_path(destination.as_path()));
        }

        match self.action {
            FileAction::Move => {
                operations::move_file(source.as_path(), destination.as_path(), handler)
            }
            FileAction::Copy => {
                operations::copy_file(source.as_path(), destination.as_path(), handler)
            }
        }
    }
}

/// Fixed-skeleton processor for a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryProcessor {
    action: DirectoryAction,
    recursive: bool,
}

impl DirectoryProcessor {
    /// Creates a processor for the given verb.
    ///
    /// The archive verb captures the whole tree in a single pass, so it
    /// never recurses regardless of `recursive`.
    pub fn new(action: DirectoryAction, recursive: bool) -> Self {
        let recursive = match action {
            DirectoryAction::Archive { .. } => false,
            _ => recursive,
        };
        Self { action, recursive }
    }

    /// The verb this processor performs.
    pub fn action(&self) -> &DirectoryAction {
        &self.action
    }

    /// Runs the skeleton for one directory item.
    ///
    /// `destination` is the mirrored path of `source` under the destination
    /// root. Failures in the top-level item are returned; failures deeper in
    /// the tree are logged and the remaining levels continue.
    pub fn process(
        &self,
        source: &FilePath,
        destination: &FilePath,
        handler: &mut DuplicateHandler,
    ) -> OpResult<PathBuf> {
        let top_result = match &self.action {
            DirectoryAction::Archive {
                archive_name,
                compression_level,
                remove_source,
            } => {
                return self.archive_tree(
                    source,
                    destination,
                    archive_name.as_deref(),
                    *compression_level,
                    *remove_source,
                    handler,
                );
            }
            DirectoryAction::Move | DirectoryAction::Copy => {
                self.transfer_tree(source, destination, handler)
            }
        };
        top_result.map(|_| destination.as_path().to_path_buf())
    }

    fn archive_tree(
        &self,
        source: &FilePath,
        destination: &FilePath,
        archive_name: Option<&str>,
        compression_level: u32,
        remove_source: bool,
        handler: &mut DuplicateHandler,
    ) -> OpResult<PathBuf> {
        validate_directory_pair(source, destination)?;

        // The archive replaces the mirrored directory: it lands next to
        // where the directory itself would have gone.
        let parent = destination
            .parent()
            .ok_or_else(|| {
                OperationError::invalid_path("Destination has no parent", destination.as_path())
            })?;
        let name = archive_name
            .map(str::to_string)
            .unwrap_or_else(|| destination.name());

        let archive_path = archive::archive_directory(
            source.as_path(),
            Some(parent.as_path()),
            Some(&name),
            compression_level,
            handler,
        )?;

        if remove_source {
            if let Err(error) =
                operations::delete_directory(source.as_path(), true, handler.dry_run())
            {
                // The archive exists; losing the cleanup is not fatal.
                warn!(
                    "Failed to remove source after archiving {}: {}",
                    source, error
                );
            }
        }

        Ok(archive_path)
    }

    /// Moves or copies a tree level by level using an explicit worklist.
    fn transfer_tree(
        &self,
        source: &FilePath,
        destination: &FilePath,
        handler: &mut DuplicateHandler,
    ) -> OpResult<()> {
        let dry_run = handler.dry_run();
        let moving = matches!(self.action, DirectoryAction::Move);

        let mut worklist: Vec<(FilePath, FilePath)> = vec![(source.clone(), destination.clone())];
        let mut moved_dirs: Vec<PathBuf> = Vec::new();
        let mut first = true;

        while let Some((src, dest)) = worklist.pop() {
            let unit_result =
                self.transfer_level(&src, &dest, moving, dry_run, handler, &mut worklist);

            match unit_result {
                Ok(()) => {
                    if moving {
                        moved_dirs.push(src.as_path().to_path_buf());
                    }
                }
                Err(error) if first => return Err(error),
                Err(error) => {
                    warn!("Failed to process subdirectory {}: {}", src, error);
                }
            }
            first = false;
        }

        // Emptied source directories are swept deepest-first once every
        // level has been processed.
        if moving && !dry_run {
            for dir in moved_dirs.iter().rev() {
                if dir.exists() && fs::remove_dir(dir).is_ok() {
                    info!("Removed empty source directory: {}", dir.display());
                }
            }
        }

        Ok(())
    }

    fn transfer_level(
        &self,
        src: &FilePath,
        dest: &FilePath,
        moving: bool,
        dry_run: bool,
        handler: &mut DuplicateHandler,
        worklist: &mut Vec<(FilePath, FilePath)>,
    ) -> OpResult<()> {
        validate_directory_pair(src, dest)?;

        // A move into a vacant destination is a single rename of the whole
        // subtree; nothing below it needs visiting.
        if moving && !dest.exists() {
            if dry_run {
                info!("Would move directory: {} -> {}", src, dest);
                return Ok(());
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent.as_path())
                    .map_err(|e| OperationError::from_io(e, parent.as_path()))?;
            }
            match fs::rename(src.as_path(), dest.as_path()) {
                Ok(()) => {
                    info!("Moved directory: {} -> {}", src, dest);
                    return Ok(());
                }
                // Cross-device moves fall through to the per-file path.
                Err(_) => {}
            }
        }

        if dry_run {
            if !dest.exists() {
                info!("Would create directory: {}", dest);
            }
        } else {
            fs::create_dir_all(dest.as_path())
                .map_err(|e| OperationError::from_io(e, dest.as_path()))?;
        }

        for file in src.list_files()? {
            let dest_file = dest.join(file.name());
            if moving {
                operations::move_file(file.as_path(), dest_file.as_path(), handler)?;
            } else {
                operations::copy_file(file.as_path(), dest_file.as_path(), handler)?;
            }
        }

        if self.recursive {
            for subdir in src.list_dirs()? {
                let dest_subdir = dest.join(subdir.name());
                worklist.push((subdir, dest_subdir));
            }
        }

        Ok(())
    }
}

fn validate_directory_pair(source: &FilePath, destination: &FilePath) -> OpResult<()> {
    if !source.exists() {
        return Err(OperationError::not_found(source.as_path()));
    }
    if !source.is_dir() {
        return Err(OperationError::invalid_path(
            format!("Source is not a directory: {}", source),
            source.as_path(),
        ));
    }
    if source == destination {
        return Err(OperationError::new(
            crate::error::ErrorKind::AlreadyExists,
            "Source and destination are the same directory",
        )
        .with_path(destination.as_path()));
    }
    if destination.exists() && !destination.is_dir() {
        return Err(OperationError::invalid_path(
            format!("Destination exists but is not a directory: {}", destination),
            destination.as_path(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::DuplicateStrategy;
    use std::fs;
    use tempfile::TempDir;

    fn handler(strategy: DuplicateStrategy, dry_run: bool) -> DuplicateHandler {
        DuplicateHandler::new(strategy, None, false, dry_run)
    }

    fn build_tree(root: &std::path::Path) {
        fs::create_dir_all(root.join("sub").join("deeper")).expect("Failed to create dirs");
        fs::write(root.join("top.txt"), "top").expect("Failed to write file");
        fs::write(root.join("sub").join("mid.txt"), "mid").expect("Failed to write file");
        fs::write(root.join("sub").join("deeper").join("low.txt"), "low")
            .expect("Failed to write file");
    }

    #[test]
    fn test_copy_directory_recurses_through_worklist() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src_root = temp_dir.path().join("src");
        build_tree(&src_root);
        let dest_root = temp_dir.path().join("dest");

        let processor = DirectoryProcessor::new(DirectoryAction::Copy, true);
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let source = FilePath::directory(&src_root).expect("source");
        let destination = FilePath::assume(&dest_root);
        processor
            .process(&source, &destination, &mut h)
            .expect("copy");

        assert!(dest_root.join("top.txt").exists());
        assert!(dest_root.join("sub").join("mid.txt").exists());
        assert!(dest_root.join("sub").join("deeper").join("low.txt").exists());
        assert!(src_root.join("top.txt").exists(), "copy keeps the source");
    }

    #[test]
    fn test_move_directory_into_vacant_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src_root = temp_dir.path().join("src");
        build_tree(&src_root);
        let dest_root = temp_dir.path().join("dest");

        let processor = DirectoryProcessor::new(DirectoryAction::Move, true);
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let source = FilePath::directory(&src_root).expect("source");
        processor
            .process(&source, &FilePath::assume(&dest_root), &mut h)
            .expect("move");

        assert!(!src_root.exists());
        assert!(dest_root.join("sub").join("deeper").join("low.txt").exists());
    }

    #[test]
    fn test_move_directory_merges_into_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src_root = temp_dir.path().join("src");
        build_tree(&src_root);
        let dest_root = temp_dir.path().join("dest");
        fs::create_dir_all(&dest_root).expect("Failed to create dir");
        fs::write(dest_root.join("already.txt"), "kept").expect("Failed to write file");

        let processor = DirectoryProcessor::new(DirectoryAction::Move, true);
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let source = FilePath::directory(&src_root).expect("source");
        processor
            .process(&source, &FilePath::assume(&dest_root), &mut h)
            .expect("move");

        assert!(dest_root.join("already.txt").exists());
        assert!(dest_root.join("top.txt").exists());
        assert!(dest_root.join("sub").join("mid.txt").exists());
        assert!(!src_root.exists(), "emptied source tree is swept");
    }

    #[test]
    fn test_archive_action_lands_next_to_mirrored_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src_root = temp_dir.path().join("collection");
        build_tree(&src_root);
        let dest_root = temp_dir.path().join("out");
        fs::create_dir_all(&dest_root).expect("Failed to create dir");

        let processor = DirectoryProcessor::new(
            DirectoryAction::Archive {
                archive_name: None,
                compression_level: 6,
                remove_source: false,
            },
            true,
        );
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let source = FilePath::directory(&src_root).expect("source");
        let mirrored = FilePath::assume(dest_root.join("collection"));
        let archive_path = processor.process(&source, &mirrored, &mut h).expect("zip");

        assert_eq!(archive_path, dest_root.join("collection.zip"));
        assert!(archive_path.exists());
        assert!(src_root.exists());
    }

    #[test]
    fn test_archive_action_remove_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src_root = temp_dir.path().join("collection");
        build_tree(&src_root);
        let dest_root = temp_dir.path().join("out");
        fs::create_dir_all(&dest_root).expect("Failed to create dir");

        let processor = DirectoryProcessor::new(
            DirectoryAction::Archive {
                archive_name: None,
                compression_level: 6,
                remove_source: true,
            },
            true,
        );
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let source = FilePath::directory(&src_root).expect("source");
        let mirrored = FilePath::assume(dest_root.join("collection"));
        processor.process(&source, &mirrored, &mut h).expect("zip");

        assert!(!src_root.exists());
    }

    #[test]
    fn test_file_processor_rejects_same_source_and_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").expect("Failed to write file");

        let processor = FileProcessor::new(FileAction::Move);
        let mut h = handler(DuplicateStrategy::RenameNew, false);
        let path = FilePath::file(&file).expect("file");
        let result = processor.process(&path, &path.clone(), &mut h);
        assert!(result.is_err());
    }
}
