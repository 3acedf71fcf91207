//! Manga collection name parsing and organizing.
//!
//! Collection folders in the wild look like
//! `(C90) [Moonweaver Studio (Starlight)] Mystic Forest Symphony [English]`.
//! [`MangaParser`] decomposes such a name into author, circle/group, title,
//! and trailing tags; [`MangaProcessor`] uses the result to sort whole
//! collections under per-author directories, moving, copying, or archiving
//! each one.

use std::path::Path;

use log::warn;
use regex::Regex;

use crate::archive;
use crate::batch::{BatchReport, BatchStats};
use crate::duplicates::DuplicateHandler;
use crate::error::{OpResult, OperationError};
use crate::operations;
use crate::paths::FilePath;
use crate::templates::{DirectoryAction, DirectoryProcessor};

const BRACKETS: [char; 6] = ['(', ')', '[', ']', '{', '}'];

/// Structured metadata extracted from one collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangaInfo {
    /// The author. Always present; falls back to the leading-non-digit
    /// heuristic when no bracket tag is found.
    pub author: String,
    /// The circle/group when the bracket tag reads `Group (Author)`.
    pub group: Option<String>,
    /// The human-readable title.
    pub name: String,
    /// Trailing delimiter-wrapped tags, in order of appearance.
    pub tags: Vec<String>,
}

/// Parser for collection names, with its patterns compiled once.
#[derive(Debug)]
pub struct MangaParser {
    author_re: Regex,
    name_re: Regex,
}

impl Default for MangaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MangaParser {
    /// Creates a parser with compiled patterns.
    pub fn new() -> Self {
        Self {
            author_re: Regex::new(r"(.+)\s?_?\((.+)\)").expect("author pattern is valid"),
            name_re: Regex::new(r"[\w !~'\\-]+").expect("name pattern is valid"),
        }
    }

    /// Parses one collection name.
    ///
    /// A leading parenthesized event tag (e.g. `(C90)`) may precede the
    /// bracketed author tag; the bracket still counts as "at the start" when
    /// it follows within two characters.
    pub fn parse(&self, filename: &str) -> MangaInfo {
        let info_end = filename.find(')');
        let info_at_start = info_end.is_some() && filename.find('(') == Some(0);

        let author_start = filename.find('[');
        let author_end = filename.find(']');

        let mut author: Option<String> = None;
        let mut group: Option<String> = None;

        let manga_data = match (author_start, author_end) {
            (Some(start), Some(end)) if author_tag_at_start(start, info_at_start, info_end) => {
                let author_data = if start + 1 <= end {
                    filename[start + 1..end].trim()
                } else {
                    ""
                };
                let (parsed_author, parsed_group) = self.extract_author(author_data);
                author = Some(parsed_author);
                group = parsed_group;
                &filename[end + 1..]
            }
            _ => filename,
        };

        let (name, tags) = self.extract_name_and_tags(manga_data);
        let author = author.unwrap_or_else(|| monthly_author(&name));

        MangaInfo {
            author,
            group,
            name,
            tags,
        }
    }

    /// Splits a bracket tag's contents into author and optional group.
    ///
    /// `Group (Author)` yields both; comma-separated author lists are
    /// re-joined without surrounding whitespace; periods inside author names
    /// are stripped.
    fn extract_author(&self, author_data: &str) -> (String, Option<String>) {
        let mut group = None;
        let mut author = match self.author_re.captures(author_data) {
            Some(caps) => {
                group = Some(caps[1].trim().to_string());
                let inner = &caps[2];
                let joined = if inner.contains(',') {
                    inner
                        .split(',')
                        .map(str::trim)
                        .collect::<Vec<_>>()
                        .join(",")
                } else {
                    inner.to_string()
                };
                joined.trim().to_string()
            }
            None => author_data.trim().to_string(),
        };

        if author.contains('.') {
            author = author.replace('.', "");
        }

        (author, group)
    }

    /// Splits the remainder into a readable title and trailing tags.
    fn extract_name_and_tags(&self, manga_data: &str) -> (String, Vec<String>) {
        match self.name_re.find(manga_data) {
            Some(found) => {
                let tag_string = &manga_data[found.end()..];
                (
                    found.as_str().trim().to_string(),
                    extract_tags(tag_string),
                )
            }
            None => (manga_data.trim().to_string(), Vec::new()),
        }
    }
}

fn author_tag_at_start(author_start: usize, info_at_start: bool, info_end: Option<usize>) -> bool {
    if author_start == 0 {
        return true;
    }
    match (info_at_start, info_end) {
        (true, Some(end)) => author_start as isize - end as isize <= 2,
        _ => false,
    }
}

/// Extracts delimiter-wrapped tags by pairing delimiter positions.
///
/// Any trailing opener with no closing delimiter is simply not emitted.
fn extract_tags(tag_string: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut open: Option<usize> = None;

    for (index, letter) in tag_string.char_indices() {
        if BRACKETS.contains(&letter) {
            match open {
                None => open = Some(index),
                Some(first) => {
                    tags.push(tag_string[first + 1..index].trim().to_string());
                    open = None;
                }
            }
        }
    }

    tags
}

/// The monthly-release fallback: the author is everything before the first
/// digit (exclusive of the separating character).
fn monthly_author(name: &str) -> String {
    let mut previous = 0;
    for (index, character) in name.char_indices() {
        if character.is_ascii_digit() {
            return name[..previous].trim().to_string();
        }
        previous = index;
    }
    name.trim().to_string()
}

/// Formats parsed info into a canonical collection name:
/// `[Group (Author)] Name` or `[Author] Name`.
pub fn format_collection_name(info: &MangaInfo) -> String {
    let name = info.name.split_whitespace().collect::<Vec<_>>().join(" ");
    match &info.group {
        Some(group) => format!("[{} ({})] {}", group, info.author, name),
        None => format!("[{}] {}", info.author, name),
    }
}

/// Options for one manga organizing run.
#[derive(Debug, Clone, Copy)]
pub struct MangaOptions {
    /// Pack each collection into a ZIP instead of moving/copying it.
    pub archive: bool,
    /// Remove sources after a successful archive, or move instead of copy.
    pub move_source: bool,
    /// Treat the source as a single author's folder and keep original names.
    pub author_folders: bool,
    /// Deflate level for archives.
    pub compression_level: u32,
}

/// Organizes the collection directories inside a source tree.
///
/// The duplicate handler is borrowed for the processor's lifetime so one
/// handler (and its interaction history) spans every source of a run.
#[derive(Debug)]
pub struct MangaProcessor<'a> {
    source: FilePath,
    destination: FilePath,
    options: MangaOptions,
    parser: MangaParser,
    handler: &'a mut DuplicateHandler,
}

impl<'a> MangaProcessor<'a> {
    /// Creates a processor, validating parameters before any filesystem work.
    pub fn new(
        source: &Path,
        destination: &Path,
        options: MangaOptions,
        handler: &'a mut DuplicateHandler,
    ) -> OpResult<Self> {
        let source = FilePath::directory(source)?;
        archive::check_compression_level(options.compression_level)?;

        Ok(Self {
            source,
            destination: FilePath::assume(destination),
            options,
            parser: MangaParser::new(),
            handler,
        })
    }

    /// Runs the organizing pass.
    ///
    /// Failures on individual collections are recorded and the remaining
    /// collections still run; the whole pass fails only when nothing could
    /// be processed.
    pub fn execute(&mut self) -> Result<BatchReport, Vec<OperationError>> {
        let dry_run = self.handler.dry_run();

        if !self.destination.exists() && !dry_run {
            std::fs::create_dir_all(self.destination.as_path())
                .map_err(|e| vec![OperationError::from_io(e, self.destination.as_path())])?;
        }

        let collections = self.source.list_dirs().map_err(|e| vec![e])?;
        if collections.is_empty() {
            warn!("No collection directories found in {}", self.source);
            return Ok(BatchReport {
                stats: BatchStats::default(),
                completed: Vec::new(),
                errors: Vec::new(),
            });
        }

        if self.options.author_folders {
            return self.process_author_folder(&collections);
        }

        let mut stats = BatchStats::default();
        let mut completed = Vec::new();
        let mut errors = Vec::new();

        for collection in &collections {
            match self.process_collection(collection) {
                Ok(path) => {
                    stats.processed += 1;
                    if self.options.archive {
                        stats.archived += 1;
                    }
                    if self.options.move_source {
                        stats.moved += 1;
                    }
                    completed.push(path);
                }
                Err(error) => {
                    warn!("Failed to process collection {}: {}", collection, error);
                    stats.errors += 1;
                    errors.push(error);
                }
            }
        }

        if completed.is_empty() && !errors.is_empty() {
            return Err(errors);
        }
        Ok(BatchReport {
            stats,
            completed,
            errors,
        })
    }

    fn process_collection(&mut self, collection: &FilePath) -> OpResult<std::path::PathBuf> {
        let info = self.parser.parse(&collection.name());
        let author_dir = self.destination.join(&info.author);
        if !author_dir.exists() && !self.handler.dry_run() {
            std::fs::create_dir_all(author_dir.as_path())
                .map_err(|e| OperationError::from_io(e, author_dir.as_path()))?;
        }

        let new_name = format_collection_name(&info);

        if self.options.archive {
            let archive_path = archive::archive_directory(
                collection.as_path(),
                Some(author_dir.as_path()),
                Some(&new_name),
                self.options.compression_level,
                &mut self.handler,
            )?;
            if self.options.move_source {
                if let Err(error) = operations::delete_directory(
                    collection.as_path(),
                    true,
                    self.handler.dry_run(),
                ) {
                    warn!(
                        "Failed to remove source after archiving {}: {}",
                        collection, error
                    );
                }
            }
            return Ok(archive_path);
        }

        let action = if self.options.move_source {
            DirectoryAction::Move
        } else {
            DirectoryAction::Copy
        };
        let processor = DirectoryProcessor::new(action, true);
        processor.process(collection, &author_dir.join(&new_name), &mut self.handler)
    }

    /// Author-folder mode: the source is one author's folder, collections
    /// keep their names (the text after the final bracket when archiving).
    fn process_author_folder(
        &mut self,
        collections: &[FilePath],
    ) -> Result<BatchReport, Vec<OperationError>> {
        let dry_run = self.handler.dry_run();
        let author_dest = self.destination.join(self.source.name());
        let mut stats = BatchStats::default();
        let mut completed = Vec::new();
        let mut errors = Vec::new();

        if !self.options.archive {
            // Without archiving the folder transfers wholesale.
            let action = if self.options.move_source {
                DirectoryAction::Move
            } else {
                DirectoryAction::Copy
            };
            let processor = DirectoryProcessor::new(action, true);
            return match processor.process(&self.source, &author_dest, &mut self.handler) {
                Ok(path) => {
                    stats.processed = 1;
                    if self.options.move_source {
                        stats.moved = 1;
                    }
                    completed.push(path);
                    Ok(BatchReport {
                        stats,
                        completed,
                        errors,
                    })
                }
                Err(error) => Err(vec![error]),
            };
        }

        if !author_dest.exists() && !dry_run {
            std::fs::create_dir_all(author_dest.as_path())
                .map_err(|e| vec![OperationError::from_io(e, author_dest.as_path())])?;
        }

        for collection in collections {
            let collection_name = collection.name();
            let archive_stem = collection_name
                .rsplit(']')
                .next()
                .unwrap_or(&collection_name)
                .trim()
                .to_string();

            match self.archive_preserving_layout(collection, &author_dest, &archive_stem) {
                Ok(path) => {
                    stats.processed += 1;
                    stats.archived += 1;
                    completed.push(path);
                }
                Err(error) => {
                    warn!("Failed to archive collection {}: {}", collection, error);
                    stats.errors += 1;
                    errors.push(error);
                }
            }
        }

        if self.options.move_source && errors.is_empty() {
            if let Err(error) =
                operations::delete_directory(self.source.as_path(), true, dry_run)
            {
                warn!(
                    "Failed to remove source after archiving {}: {}",
                    self.source, error
                );
            } else {
                stats.moved += 1;
            }
        }

        if completed.is_empty() && !errors.is_empty() {
            return Err(errors);
        }
        Ok(BatchReport {
            stats,
            completed,
            errors,
        })
    }

    /// Archives one collection without a wrapping root folder inside the ZIP.
    fn archive_preserving_layout(
        &mut self,
        collection: &FilePath,
        dest_dir: &FilePath,
        stem: &str,
    ) -> OpResult<std::path::PathBuf> {
        let archive_path = dest_dir.join(format!("{}.zip", stem));
        let resolved = self.handler.resolve(
            archive_path.as_path(),
            None,
            &format!("Creating archive for {}", collection),
        )?;
        if resolved.skip {
            return Ok(resolved.path);
        }

        if self.handler.dry_run() {
            log::info!("Would archive: {} -> {}", collection, resolved.path.display());
            return Ok(resolved.path);
        }

        archive::pack_tree(
            collection.as_path(),
            &resolved.path,
            None,
            self.options.compression_level,
        )?;
        log::info!("Archived: {} -> {}", collection, resolved.path.display());
        Ok(resolved.path)
    }
}
