//! Command-line interface module for colsort.
//!
//! This module handles all CLI-related functionality including:
//! - Command and flag parsing
//! - Configuration merging (flags override file values)
//! - Per-command orchestration of the processors
//! - Progress display and the end-of-run summary

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::archive;
use crate::batch::{BatchProcessor, BatchReport, BatchStats};
use crate::config::AppConfig;
use crate::duplicates::{DuplicateHandler, DuplicateStrategy};
use crate::error::{ErrorKind, OperationError};
use crate::manga::{MangaOptions, MangaProcessor};
use crate::operations;
use crate::output::OutputFormatter;
use crate::rename::RenameProcessor;
use crate::templates::{DirectoryAction, DirectoryProcessor};
use crate::video::VideoRenamer;

/// Sort loosely-named manga, video, and media collections.
#[derive(Debug, Parser)]
#[command(name = "colsort", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Simulate operations without changing the filesystem.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Ask how to handle each duplicate.
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// Strategy for colliding destinations
    /// (skip, rename_new, rename_existing, overwrite, move_to_duplicates, ask).
    #[arg(long, global = true)]
    pub duplicate_strategy: Option<DuplicateStrategy>,

    /// Directory that move_to_duplicates diverts collisions into.
    #[arg(long, global = true)]
    pub duplicates_dir: Option<PathBuf>,
}

/// The available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sort manga collection directories under per-author folders.
    Manga {
        /// Source directories holding collection folders.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination library root.
        #[arg(short, long)]
        destination: PathBuf,

        /// Pack each collection into a ZIP archive.
        #[arg(long)]
        archive: bool,

        /// Remove sources after processing.
        #[arg(long = "move")]
        move_source: bool,

        /// Treat each source as a single author's folder.
        #[arg(long)]
        author_folders: bool,

        /// ZIP compression level, 0-9.
        #[arg(long)]
        compression_level: Option<u32>,
    },

    /// Rename files according to the configured pattern table.
    Rename {
        /// Source files or directories.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory for the renamed files.
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Descend into subdirectories.
        #[arg(short, long)]
        recursive: bool,

        /// Remove sources instead of copying.
        #[arg(long = "move")]
        move_source: bool,
    },

    /// Rename video episodes to the canonical "Title - SxxEyy" form.
    Video {
        /// Source video files or directories.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory for the renamed files.
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },

    /// Archive each source directory into a ZIP.
    Zip {
        /// Source directories to archive.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory for the archives (in place when omitted).
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Remove sources after successful archiving.
        #[arg(long = "move")]
        move_source: bool,

        /// ZIP compression level, 0-9.
        #[arg(long)]
        compression_level: Option<u32>,
    },
}

/// Runs the parsed command to completion.
///
/// Returns a displayable error when the run failed outright; a run that
/// merely recorded per-item errors still succeeds and reports them.
pub fn run(cli: Cli) -> Result<(), String> {
    let mut config = AppConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;

    if cli.dry_run {
        config.collection.dry_run = true;
    }
    if cli.interactive {
        config.collection.interactive = true;
    }
    if let Some(strategy) = cli.duplicate_strategy {
        config.collection.duplicate_strategy = strategy;
    }
    if let Some(dir) = cli.duplicates_dir.clone() {
        config.collection.duplicates_dir = Some(dir);
    }
    config.validate().map_err(|e| e.to_string())?;

    if config.collection.dry_run {
        OutputFormatter::dry_run_notice("Simulation only, nothing will be written");
    }

    let mut handler = DuplicateHandler::new(
        config.collection.duplicate_strategy,
        config.collection.duplicates_dir.clone(),
        config.collection.interactive,
        config.collection.dry_run,
    );

    let outcome = match cli.command {
        Command::Manga {
            ref sources,
            ref destination,
            archive,
            move_source,
            author_folders,
            compression_level,
        } => run_manga(
            sources,
            destination,
            MangaOptions {
                archive,
                move_source,
                author_folders,
                compression_level: compression_level
                    .unwrap_or(config.collection.compression_level),
            },
            &mut handler,
        ),
        Command::Rename {
            ref sources,
            ref destination,
            recursive,
            move_source,
        } => run_rename(
            sources,
            destination.as_deref(),
            &config,
            recursive || config.collection.recursive,
            move_source || config.collection.move_source,
            &mut handler,
        ),
        Command::Video {
            ref sources,
            ref destination,
        } => run_video(sources, destination.as_deref(), &config, &mut handler),
        Command::Zip {
            ref sources,
            ref destination,
            move_source,
            compression_level,
        } => run_zip(
            sources,
            destination.as_deref(),
            move_source || config.collection.move_source,
            compression_level.unwrap_or(config.collection.compression_level),
            &config,
            &mut handler,
        ),
    };

    match outcome {
        Ok((stats, errors)) => {
            for error in &errors {
                OutputFormatter::warning(&error.to_string());
            }
            OutputFormatter::summary_table(&stats);
            if errors.is_empty() {
                OutputFormatter::success("Done");
            } else {
                OutputFormatter::warning(&format!("Completed with {} errors", errors.len()));
            }
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                OutputFormatter::error(&error.to_string());
            }
            Err(format!("{} operation(s) failed", errors.len()))
        }
    }
}

type RunOutcome = Result<(BatchStats, Vec<OperationError>), Vec<OperationError>>;

/// Folds per-source reports together, aborting only on user cancellation.
fn fold_reports<F>(sources: &[PathBuf], mut run_one: F) -> RunOutcome
where
    F: FnMut(&PathBuf) -> Result<BatchReport, Vec<OperationError>>,
{
    let mut stats = BatchStats::default();
    let mut errors: Vec<OperationError> = Vec::new();
    let progress = (sources.len() > 1)
        .then(|| OutputFormatter::create_progress_bar(sources.len() as u64));

    for source in sources {
        match run_one(source) {
            Ok(report) => {
                stats.merge(&report.stats);
                errors.extend(report.errors);
            }
            Err(source_errors) => {
                let cancelled = source_errors
                    .iter()
                    .any(|e| e.kind == ErrorKind::UserCancelled);
                stats.errors += source_errors.len();
                errors.extend(source_errors);
                if cancelled {
                    if let Some(pb) = &progress {
                        pb.abandon();
                    }
                    return Err(errors);
                }
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = &progress {
        pb.finish_with_message("done");
    }

    if stats.processed == 0 && !errors.is_empty() {
        return Err(errors);
    }
    Ok((stats, errors))
}

fn run_manga(
    sources: &[PathBuf],
    destination: &PathBuf,
    options: MangaOptions,
    handler: &mut DuplicateHandler,
) -> RunOutcome {
    fold_reports(sources, |source| {
        let mut processor =
            MangaProcessor::new(source, destination, options, handler).map_err(|e| vec![e])?;
        processor.execute()
    })
}

fn run_rename(
    sources: &[PathBuf],
    destination: Option<&std::path::Path>,
    config: &AppConfig,
    recursive: bool,
    move_source: bool,
    handler: &mut DuplicateHandler,
) -> RunOutcome {
    let patterns = config.rename.pattern_pairs();
    fold_reports(sources, |source| {
        let mut processor = RenameProcessor::new(
            source,
            destination,
            &patterns,
            recursive,
            move_source,
            handler,
        )?;
        processor.execute()
    })
}

fn run_video(
    sources: &[PathBuf],
    destination: Option<&std::path::Path>,
    config: &AppConfig,
    handler: &mut DuplicateHandler,
) -> RunOutcome {
    fold_reports(sources, |source| {
        let mut renamer = VideoRenamer::new(
            source,
            destination,
            &config.video.video_extensions,
            &config.video.subtitle_extensions,
            handler,
        )
        .map_err(|e| vec![e])?;
        renamer.execute()
    })
}

fn run_zip(
    sources: &[PathBuf],
    destination: Option<&std::path::Path>,
    move_source: bool,
    compression_level: u32,
    config: &AppConfig,
    handler: &mut DuplicateHandler,
) -> RunOutcome {
    archive::check_compression_level(compression_level).map_err(|e| vec![e])?;

    // With a destination root the generic batch pipeline does the work;
    // without one each source is archived in place next to itself.
    if let Some(dest) = destination {
        let processor = BatchProcessor::new(
            None,
            Some(DirectoryProcessor::new(
                DirectoryAction::Archive {
                    archive_name: None,
                    compression_level,
                    remove_source: move_source,
                },
                config.collection.recursive,
            )),
            true,
        );
        let report = processor.process(sources, dest, handler)?;
        return Ok((report.stats, report.errors));
    }

    fold_reports(sources, |source| {
        let archive_path =
            archive::archive_directory(source, None, None, compression_level, handler)
                .map_err(|e| vec![e])?;
        let mut stats = BatchStats {
            processed: 1,
            archived: 1,
            ..BatchStats::default()
        };
        if move_source {
            match operations::delete_directory(source, true, handler.dry_run()) {
                Ok(_) => stats.moved += 1,
                Err(error) => {
                    log::warn!("Failed to remove source after archiving: {}", error);
                }
            }
        }
        Ok(BatchReport {
            stats,
            completed: vec![archive_path],
            errors: Vec::new(),
        })
    })
}
