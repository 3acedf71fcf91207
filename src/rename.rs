//! Pattern-driven mass renaming.
//!
//! A rename run carries an ordered table of regex → replacement rules; the
//! first rule matching a file name is applied. Files matching no rule get
//! the default cleanup (bracketed noise and `(YYYY)` years removed,
//! underscore runs collapsed, ` - ` spacing normalized). Unchanged names are
//! left alone.

use std::path::{Path, PathBuf};

use log::{info, warn};
use regex::Regex;

use crate::batch::{BatchReport, BatchStats};
use crate::duplicates::DuplicateHandler;
use crate::error::{ErrorKind, OperationError};
use crate::operations;
use crate::paths::FilePath;

/// An ordered, pre-compiled regex → replacement table.
#[derive(Debug)]
pub struct RenamePatterns {
    rules: Vec<(Regex, String)>,
}

impl RenamePatterns {
    /// Compiles a pattern table, gathering every invalid pattern as a
    /// validation error so bad configuration surfaces before any renaming.
    pub fn compile(pairs: &[(String, String)]) -> Result<Self, Vec<OperationError>> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for (pattern, replacement) in pairs {
            match Regex::new(pattern) {
                Ok(regex) => rules.push((regex, replacement.clone())),
                Err(error) => errors.push(OperationError::validation(format!(
                    "Invalid rename pattern '{}': {}",
                    pattern, error
                ))),
            }
        }

        if errors.is_empty() {
            Ok(Self { rules })
        } else {
            Err(errors)
        }
    }

    /// Applies the first matching rule, or `None` when no rule matches.
    pub fn apply(&self, name: &str) -> Option<String> {
        for (regex, replacement) in &self.rules {
            if regex.is_match(name) {
                return Some(regex.replace_all(name, replacement.as_str()).into_owned());
            }
        }
        None
    }
}

/// Default cleanup applied to names no pattern matched.
#[derive(Debug)]
pub struct NameCleaner {
    bracketed: Regex,
    year: Regex,
    underscores: Regex,
    hyphen_between_words: Regex,
    hyphen_spacing: Regex,
}

impl Default for NameCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCleaner {
    /// Creates a cleaner with compiled patterns.
    pub fn new() -> Self {
        Self {
            bracketed: Regex::new(r"\[[^\]]*\]").expect("pattern is valid"),
            year: Regex::new(r"\([0-9]{4}\)").expect("pattern is valid"),
            underscores: Regex::new(r"_+").expect("pattern is valid"),
            hyphen_between_words: Regex::new(r"(\w)-(\w)").expect("pattern is valid"),
            hyphen_spacing: Regex::new(r"\s*-\s*").expect("pattern is valid"),
        }
    }

    /// Cleans one file name, preserving its extension.
    pub fn clean(&self, filename: &str) -> String {
        let (name, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (filename, None),
        };

        let cleaned = self.bracketed.replace_all(name, "");
        let cleaned = self.year.replace_all(&cleaned, "");
        let cleaned = self.underscores.replace_all(&cleaned, "_");
        let cleaned = cleaned.trim_matches('_').trim().to_string();
        let cleaned = self.hyphen_between_words.replace_all(&cleaned, "$1 - $2");
        let cleaned = self.hyphen_spacing.replace_all(&cleaned, " - ");

        match extension {
            Some(ext) => format!("{}.{}", cleaned, ext),
            None => cleaned.into_owned(),
        }
    }
}

/// Renames files under a source according to the pattern table.
///
/// The duplicate handler is borrowed for the processor's lifetime so one
/// handler (and its interaction history) spans every source of a run.
#[derive(Debug)]
pub struct RenameProcessor<'a> {
    source: FilePath,
    destination: Option<FilePath>,
    patterns: RenamePatterns,
    cleaner: NameCleaner,
    recursive: bool,
    move_source: bool,
    handler: &'a mut DuplicateHandler,
}

impl<'a> RenameProcessor<'a> {
    /// Creates a processor, compiling the pattern table eagerly.
    pub fn new(
        source: &Path,
        destination: Option<&Path>,
        patterns: &[(String, String)],
        recursive: bool,
        move_source: bool,
        handler: &'a mut DuplicateHandler,
    ) -> Result<Self, Vec<OperationError>> {
        let source = FilePath::new(source).map_err(|e| vec![e])?;
        let patterns = RenamePatterns::compile(patterns)?;

        Ok(Self {
            source,
            destination: destination.map(FilePath::assume),
            patterns,
            cleaner: NameCleaner::new(),
            recursive,
            move_source,
            handler,
        })
    }

    /// Runs the renaming pass.
    pub fn execute(&mut self) -> Result<BatchReport, Vec<OperationError>> {
        let files = self.collect_files().map_err(|e| vec![e])?;
        let mut stats = BatchStats::default();
        let mut completed = Vec::new();
        let mut errors: Vec<OperationError> = Vec::new();

        if files.is_empty() {
            info!("No files found to process in {}", self.source);
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

    fn collect_files(&self) -> Result<Vec<PathBuf>, OperationError> {
        if self.source.is_file() {
            return Ok(vec![self.source.as_path().to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut worklist = vec![self.source.clone()];
        while let Some(dir) = worklist.pop() {
            for file in dir.list_files()? {
                files.push(file.as_path().to_path_buf());
            }
            if self.recursive {
                worklist.extend(dir.list_dirs()?);
            }
        }
        files.sort();
        Ok(files)
    }

    fn rename_one(&mut self, file: &Path, stats: &mut BatchStats) -> Result<PathBuf, OperationError> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| OperationError::invalid_path("File has no name", file))?;

        let new_name = self
            .patterns
            .apply(&file_name)
            .unwrap_or_else(|| self.cleaner.clean(&file_name));

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

        let renamed = if self.move_source {
            operations::move_file(file, &new_path, &mut self.handler)?
        } else {
            operations::copy_file(file, &new_path, &mut self.handler)?
        };
        stats.renamed += 1;
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::DuplicateStrategy;
    use std::fs;
    use tempfile::TempDir;

    fn handler(dry_run: bool) -> DuplicateHandler {
        DuplicateHandler::new(DuplicateStrategy::RenameNew, None, false, dry_run)
    }

    #[test]
    fn test_patterns_apply_first_match_only() {
        let patterns = RenamePatterns::compile(&[
            (r"^ep(\d+)".to_string(), "Episode $1".to_string()),
            (r"ep".to_string(), "XX".to_string()),
        ])
        .expect("compile");

        assert_eq!(
            patterns.apply("ep01.mkv"),
            Some("Episode 01.mkv".to_string())
        );
        assert_eq!(patterns.apply("nothing.txt"), None);
    }

    #[test]
    fn test_invalid_pattern_is_a_validation_error() {
        let result = RenamePatterns::compile(&[("[invalid(".to_string(), "x".to_string())]);
        let errors = result.expect_err("bad pattern");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Validation);
    }

    #[test]
    fn test_cleaner_strips_brackets_years_and_underscores() {
        let cleaner = NameCleaner::new();
        assert_eq!(
            cleaner.clean("Show_Name_[WebRip]_(2021).mkv"),
            "Show_Name.mkv"
        );
        assert_eq!(cleaner.clean("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_cleaner_normalizes_hyphen_spacing() {
        let cleaner = NameCleaner::new();
        assert_eq!(cleaner.clean("alpha-beta.txt"), "alpha - beta.txt");
        assert_eq!(cleaner.clean("alpha -  beta.txt"), "alpha - beta.txt");
    }

    #[test]
    fn test_processor_applies_patterns_and_moves() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("ep01.mkv");
        fs::write(&file, "x").expect("Failed to write file");

        let mut h = handler(false);
        let mut processor = RenameProcessor::new(
            temp_dir.path(),
            None,
            &[(r"^ep(\d+)".to_string(), "Episode $1".to_string())],
            false,
            true,
            &mut h,
        )
        .expect("processor");
        let report = processor.execute().expect("execute");

        assert_eq!(report.stats.renamed, 1);
        assert!(temp_dir.path().join("Episode 01.mkv").exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_processor_copies_by_default() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("Show_[x].txt");
        fs::write(&file, "x").expect("Failed to write file");

        let mut h = handler(false);
        let mut processor = RenameProcessor::new(
            temp_dir.path(),
            None,
            &[],
            false,
            false,
            &mut h,
        )
        .expect("processor");
        let report = processor.execute().expect("execute");

        assert_eq!(report.stats.renamed, 1);
        assert!(file.exists(), "copy keeps the original");
        assert!(temp_dir.path().join("Show.txt").exists());
    }

    #[test]
    fn test_processor_skips_unchanged_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("alreadyclean.txt");
        fs::write(&file, "x").expect("Failed to write file");

        let mut h = handler(false);
        let mut processor = RenameProcessor::new(
            temp_dir.path(),
            None,
            &[],
            false,
            true,
            &mut h,
        )
        .expect("processor");
        let report = processor.execute().expect("execute");

        assert_eq!(report.stats.processed, 1);
        assert_eq!(report.stats.renamed, 0);
        assert!(file.exists());
    }

    #[test]
    fn test_processor_recurses_when_asked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("season1");
        fs::create_dir(&nested).expect("Failed to create dir");
        let file = nested.join("ep02.mkv");
        fs::write(&file, "x").expect("Failed to write file");

        let mut h = handler(false);
        let mut processor = RenameProcessor::new(
            temp_dir.path(),
            None,
            &[(r"^ep(\d+)".to_string(), "Episode $1".to_string())],
            true,
            true,
            &mut h,
        )
        .expect("processor");
        let report = processor.execute().expect("execute");

        assert_eq!(report.stats.renamed, 1);
        assert!(nested.join("Episode 02.mkv").exists());
    }
}
