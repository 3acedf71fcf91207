//! Video episode name parsing and renaming.
//!
//! Episode files arrive as `Show Name S01E01 [1080p].mkv`,
//! `Show.Name.1x01.mkv`, or `Show Name - 01.mkv`. [`VideoParser`] extracts
//! the title, season, and episode; [`VideoRenamer`] rewrites files to the
//! canonical `Title - SxxEyy` form, renaming subtitle companions in
//! lockstep.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::batch::{BatchReport, BatchStats};
use crate::duplicates::DuplicateHandler;
use crate::error::{ErrorKind, OpResult, OperationError};
use crate::paths::FilePath;

/// Structured metadata extracted from one episode file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Cleaned title: bracketed/parenthesized noise removed, underscores
    /// collapsed to spaces.
    pub title: String,
    /// Season number, when the name carries one.
    pub season: Option<u32>,
    /// Episode number. A season without an episode is never produced.
    pub episode: Option<u32>,
}

/// Parser for episode names, with its patterns compiled once.
///
/// Pattern precedence is fixed: `S<season>E<episode>` (case-insensitive),
/// then `<season>x<episode>`, then a standalone ` - <episode>` token. The
/// first match wins and everything before it is the raw title.
#[derive(Debug)]
pub struct VideoParser {
    season_episode: Regex,
    season_x_episode: Regex,
    bare_episode: Regex,
    parenthesized: Regex,
    bracketed: Regex,
    underscores: Regex,
    whitespace: Regex,
}

impl Default for VideoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoParser {
    /// Creates a parser with compiled patterns.
    pub fn new() -> Self {
        Self {
            season_episode: Regex::new(r"(?i)S(\d+)E(\d+)").expect("pattern is valid"),
            season_x_episode: Regex::new(r"(\d+)x(\d+)").expect("pattern is valid"),
            bare_episode: Regex::new(r" - (\d+)").expect("pattern is valid"),
            parenthesized: Regex::new(r"\([^\)]*\)").expect("pattern is valid"),
            bracketed: Regex::new(r"\[[^\]]*\]").expect("pattern is valid"),
            underscores: Regex::new(r"_+").expect("pattern is valid"),
            whitespace: Regex::new(r"\s+").expect("pattern is valid"),
        }
    }

    /// Parses one file name (the extension is ignored).
    pub fn parse(&self, filename: &str) -> VideoInfo {
        let name = filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(filename);

        let mut season = None;
        let mut episode = None;
        let mut raw_title = name;

        if let Some(caps) = self.season_episode.captures(name) {
            season = caps[1].parse().ok();
            episode = caps[2].parse().ok();
            raw_title = &name[..caps.get(0).expect("whole match").start()];
        } else if let Some(caps) = self.season_x_episode.captures(name) {
            season = caps[1].parse().ok();
            episode = caps[2].parse().ok();
            raw_title = &name[..caps.get(0).expect("whole match").start()];
        } else if let Some(caps) = self.bare_episode.captures(name) {
            episode = caps[1].parse().ok();
            raw_title = &name[..caps.get(0).expect("whole match").start()];
        }

        VideoInfo {
            title: self.clean_title(raw_title),
            season,
            episode,
        }
    }

    fn clean_title(&self, raw: &str) -> String {
        let cleaned = self.parenthesized.replace_all(raw, "");
        let cleaned = self.bracketed.replace_all(&cleaned, "");
        let cleaned = self.underscores.replace_all(&cleaned, " ");
        let cleaned = self.whitespace.replace_all(&cleaned, " ");
        cleaned.trim().to_string()
    }
}

/// Formats parsed info back into a canonical file name.
///
/// `extension` includes its dot (e.g. `.mkv`) and may be empty.
pub fn format_episode_name(info: &VideoInfo, extension: &str) -> String {
    match (info.season, info.episode) {
        (Some(season), Some(episode)) => format!(
            "{} - S{:02}E{:02}{}",
            info.title, season, episode, extension
        ),
        (None, Some(episode)) => format!("{} - {:02}{}", info.title, episode, extension),
        _ => format!("{}{}", info.title, extension),
    }
}

/// Locates subtitle companions of a video file: same directory, same stem,
/// any of the given extensions.
pub fn find_subtitles(video: &Path, subtitle_extensions: &[String]) -> Vec<PathBuf> {
    let Some(parent) = video.parent() else {
        return Vec::new();
    };
    let Some(stem) = video.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for extension in subtitle_extensions {
        let candidate = parent.join(format!("{}.{}", stem, extension.trim_start_matches('.')));
        if candidate.exists() {
            found.push(candidate);
        }
    }
    found
}

/// Renames video files (and their subtitles) to the canonical form.
///
/// The duplicate handler is borrowed for the renamer's lifetime so one
/// handler (and its interaction history) spans every source of a run.
#[derive(Debug)]
pub struct VideoRenamer<'a> {
    source: FilePath,
    destination: Option<FilePath>,
    video_extensions: Vec<String>,
    subtitle_extensions: Vec<String>,
    parser: VideoParser,
    handler: &'a mut DuplicateHandler,
}

impl<'a> VideoRenamer<'a> {
    /// Creates a renamer, validating parameters before any filesystem work.
    ///
    /// Extension sets are stored lowercase without their dots. A single-file
    /// source must carry one of the video extensions.
    pub fn new(
        source: &Path,
        destination: Option<&Path>,
        video_extensions: &[String],
        subtitle_extensions: &[String],
        handler: &'a mut DuplicateHandler,
    ) -> OpResult<Self> {
        let source = FilePath::new(source)?;
        let video_extensions = normalize_extensions(video_extensions);
        let subtitle_extensions = normalize_extensions(subtitle_extensions);

        if video_extensions.is_empty() {
            return Err(OperationError::validation("No video extensions configured"));
        }
        if source.is_file() && !has_extension(source.as_path(), &video_extensions) {
            return Err(OperationError::validation(format!(
                "Source file is not a recognized video: {}",
                source
            ))
            .with_path(source.as_path()));
        }

        Ok(Self {
            source,
            destination: destination.map(FilePath::assume),
            video_extensions,
            subtitle_extensions,
            parser: VideoParser::new(),
            handler,
        })
    }

    /// Runs the renaming pass over every collected video file.
    pub fn execute(&mut self) -> Result<BatchReport, Vec<OperationError>> {
        let files = self.collect_videos();
        let mut stats = BatchStats::default();
        let mut completed = Vec::new();
        let mut errors: Vec<OperationError> = Vec::new();

        if files.is_empty() {
            info!("No video files found in {}", self.source);
            return Ok(BatchReport {
                stats,
                completed,
                errors,
            });
        }

        for file in files {
            stats.processed += 1;
            match self.rename_one(&file, &mut stats) {
                Ok(path) => completed.push(path),
                Err(error) => {
                    warn!("Failed to process {}: {}", file.display(), error);
                    let cancelled = error.kind == ErrorKind::UserCancelled;
                    stats.errors += 1;
                    errors.push(error);
                    if cancelled {
                        return Err(errors);
                    }
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

    fn collect_videos(&self) -> Vec<PathBuf> {
        if self.source.is_file() {
            return vec![self.source.as_path().to_path_buf()];
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(self.source.as_path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && has_extension(entry.path(), &self.video_extensions) {
                files.push(entry.path().to_path_buf());
            }
        }
        files
    }

    fn rename_one(&mut self, file: &Path, stats: &mut BatchStats) -> OpResult<PathBuf> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| OperationError::invalid_path("File has no name", file))?;
        let extension = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let info = self.parser.parse(&file_name);
        let new_name = format_episode_name(&info, &extension);
        if new_name == file_name {
            return Ok(file.to_path_buf());
        }

        let dest_dir = match &self.destination {
            Some(dir) => dir.as_path().to_path_buf(),
            None => file
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| OperationError::invalid_path("File has no parent", file))?,
        };
        let new_path = dest_dir.join(&new_name);

        let subtitles = find_subtitles(file, &self.subtitle_extensions);

        let resolved = self.handler.resolve(
            &new_path,
            None,
            &format!("Renaming {}", file.display()),
        )?;
        if resolved.skip {
            info!("Skipping duplicate video: {}", file.display());
            return Ok(file.to_path_buf());
        }

        if self.handler.dry_run() {
            info!(
                "Would rename: {} -> {}",
                file.display(),
                resolved.path.display()
            );
            for subtitle in &subtitles {
                info!(
                    "Would rename subtitle: {} -> {}",
                    subtitle.display(),
                    self.subtitle_target(&resolved.path, subtitle).display()
                );
            }
            stats.renamed += 1;
            return Ok(resolved.path);
        }

        if let Some(parent) = resolved.path.parent() {
            fs::create_dir_all(parent).map_err(|e| OperationError::from_io(e, parent))?;
        }

        fs::rename(file, &resolved.path).map_err(|e| {
            OperationError::operation_failed(
                format!(
                    "Failed to rename {} to {}: {}",
                    file.display(),
                    resolved.path.display(),
                    e
                ),
                file,
            )
        })?;
        info!("Renamed: {} -> {}", file.display(), resolved.path.display());
        stats.renamed += 1;

        for subtitle in &subtitles {
            let target = self.subtitle_target(&resolved.path, subtitle);
            match fs::rename(subtitle, &target) {
                Ok(()) => info!(
                    "Renamed subtitle: {} -> {}",
                    subtitle.display(),
                    target.display()
                ),
                Err(error) => warn!(
                    "Failed to rename subtitle {}: {}",
                    subtitle.display(),
                    error
                ),
            }
        }

        Ok(resolved.path)
    }

    /// A subtitle follows its video: new stem, its own extension.
    fn subtitle_target(&self, renamed_video: &Path, subtitle: &Path) -> PathBuf {
        let stem = renamed_video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = subtitle
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = renamed_video.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{}.{}", stem, extension))
    }
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| extensions.contains(&e.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}
