//! Batch processing over heterogeneous sources.
//!
//! A [`BatchProcessor`] drives the file and directory skeletons over a list
//! of sources sharing one destination root, aggregating per-item results
//! into run statistics. With `continue_on_error` the batch records failures
//! and keeps going, finishing as "completed with errors"; without it the
//! first failure aborts the run.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::duplicates::DuplicateHandler;
use crate::error::{ErrorKind, OperationError};
use crate::paths::FilePath;
use crate::templates::{DirectoryAction, DirectoryProcessor, FileAction, FileProcessor};

/// Counters for one batch run. Monotonically incremented, never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Items that completed their operation.
    pub processed: usize,
    /// Files given a new name.
    pub renamed: usize,
    /// Directories packed into archives.
    pub archived: usize,
    /// Entries moved (including sources removed after archiving).
    pub moved: usize,
    /// Failures recorded along the way.
    pub errors: usize,
}

impl BatchStats {
    /// Folds another run's counters into this one.
    pub fn merge(&mut self, other: &BatchStats) {
        self.processed += other.processed;
        self.renamed += other.renamed;
        self.archived += other.archived;
        self.moved += other.moved;
        self.errors += other.errors;
    }
}

/// Everything a batch run hands back to its caller.
#[derive(Debug)]
pub struct BatchReport {
    /// Aggregated counters.
    pub stats: BatchStats,
    /// Final path of every item that completed.
    pub completed: Vec<PathBuf>,
    /// Failures recorded while continuing past errors.
    pub errors: Vec<OperationError>,
}

/// Drives per-item processors over a list of sources.
#[derive(Debug)]
pub struct BatchProcessor {
    file_processor: Option<FileProcessor>,
    directory_processor: Option<DirectoryProcessor>,
    continue_on_error: bool,
}

impl BatchProcessor {
    /// Creates a batch processor from the per-kind skeletons it dispatches to.
    pub fn new(
        file_processor: Option<FileProcessor>,
        directory_processor: Option<DirectoryProcessor>,
        continue_on_error: bool,
    ) -> Self {
        Self {
            file_processor,
            directory_processor,
            continue_on_error,
        }
    }

    /// Processes every source against one destination root.
    ///
    /// Sources are handled strictly in input order. A missing source is a
    /// per-item `not-found` failure subject to `continue_on_error`; the
    /// batch fails outright only when nothing was processed successfully.
    /// A user-cancelled prompt aborts the remaining items unconditionally.
    pub fn process(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        handler: &mut DuplicateHandler,
    ) -> Result<BatchReport, Vec<OperationError>> {
        if sources.is_empty() {
            return Err(vec![OperationError::validation("No source paths provided")]);
        }

        self.prepare_destination(destination, handler.dry_run())
            .map_err(|e| vec![e])?;
        let dest_root = FilePath::assume(destination);

        let mut stats = BatchStats::default();
        let mut completed = Vec::new();
        let mut errors: Vec<OperationError> = Vec::new();

        for source in sources {
            let item_result = self.process_item(source, &dest_root, handler, &mut stats);

            match item_result {
                Ok(path) => {
                    stats.processed += 1;
                    completed.push(path);
                }
                Err(error) => {
                    warn!("Failed to process {}: {}", source.display(), error);
                    let cancelled = error.kind == ErrorKind::UserCancelled;
                    stats.errors += 1;
                    errors.push(error);
                    if cancelled || !self.continue_on_error {
                        return Err(errors);
                    }
                }
            }
        }

        if completed.is_empty() && !errors.is_empty() {
            return Err(errors);
        }

        if !errors.is_empty() {
            warn!("Batch completed with {} errors", errors.len());
        }
        Ok(BatchReport {
            stats,
            completed,
            errors,
        })
    }

    fn process_item(
        &self,
        source: &Path,
        dest_root: &FilePath,
        handler: &mut DuplicateHandler,
        stats: &mut BatchStats,
    ) -> Result<PathBuf, OperationError> {
        if !source.exists() {
            return Err(OperationError::not_found(source));
        }

        if source.is_file() {
            let processor = self.file_processor.as_ref().ok_or_else(|| {
                OperationError::operation_failed("No file processor available", source)
            })?;
            let source = FilePath::file(source)?;
            let destination = dest_root.join(source.name());
            let path = processor.process(&source, &destination, handler)?;
            if processor.action() == FileAction::Move {
                stats.moved += 1;
            }
            Ok(path)
        } else if source.is_dir() {
            let processor = self.directory_processor.as_ref().ok_or_else(|| {
                OperationError::operation_failed("No directory processor available", source)
            })?;
            let source = FilePath::directory(source)?;
            let destination = dest_root.join(source.name());
            let path = processor.process(&source, &destination, handler)?;
            match processor.action() {
                DirectoryAction::Move => stats.moved += 1,
                DirectoryAction::Archive { remove_source, .. } => {
                    stats.archived += 1;
                    if *remove_source {
                        stats.moved += 1;
                    }
                }
                DirectoryAction::Copy => {}
            }
            Ok(path)
        } else {
            Err(OperationError::invalid_path(
                format!(
                    "Source is neither a file nor a directory: {}",
                    source.display()
                ),
                source,
            ))
        }
    }

    fn prepare_destination(&self, destination: &Path, dry_run: bool) -> Result<(), OperationError> {
        if !destination.exists() {
            if dry_run {
                info!("Would create directory: {}", destination.display());
            } else {
                fs::create_dir_all(destination)
                    .map_err(|e| OperationError::from_io(e, destination))?;
            }
        } else if !destination.is_dir() {
            return Err(OperationError::validation(format!(
                "Destination exists but is not a directory: {}",
                destination.display()
            ))
            .with_path(destination));
        }
        Ok(())
    }
}
