//! Destination-collision handling for file operations.
//!
//! Every operation that is about to write to a path consults a
//! [`DuplicateHandler`] first. The handler decides what the final
//! destination is (skip, rename one side, overwrite, or divert into a
//! duplicates directory) and remembers interactive answers for the rest of
//! the session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{OpResult, OperationError};
use crate::paths::normalize;

/// Policy applied when a destination path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    /// Leave the existing entry alone and do not process the new one.
    Skip,
    /// Give the incoming entry a fresh sibling name.
    RenameNew,
    /// Rename the entry currently occupying the destination.
    RenameExisting,
    /// Let the caller's write replace the existing content.
    Overwrite,
    /// Divert the incoming entry into a configured duplicates directory.
    MoveToDuplicates,
    /// Ask interactively, once per path.
    Ask,
}

impl DuplicateStrategy {
    /// Every concrete (non-interactive) strategy, in prompt order.
    const CONCRETE: [DuplicateStrategy; 5] = [
        DuplicateStrategy::Skip,
        DuplicateStrategy::RenameNew,
        DuplicateStrategy::RenameExisting,
        DuplicateStrategy::Overwrite,
        DuplicateStrategy::MoveToDuplicates,
    ];

    fn describe(&self) -> &'static str {
        match self {
            DuplicateStrategy::Skip => "Skip (don't process this file)",
            DuplicateStrategy::RenameNew => "Rename the new file",
            DuplicateStrategy::RenameExisting => "Rename the existing file",
            DuplicateStrategy::Overwrite => "Overwrite the existing file",
            DuplicateStrategy::MoveToDuplicates => "Move to the duplicates folder",
            DuplicateStrategy::Ask => "Ask for each duplicate",
        }
    }
}

impl std::fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DuplicateStrategy::Skip => "skip",
            DuplicateStrategy::RenameNew => "rename_new",
            DuplicateStrategy::RenameExisting => "rename_existing",
            DuplicateStrategy::Overwrite => "overwrite",
            DuplicateStrategy::MoveToDuplicates => "move_to_duplicates",
            DuplicateStrategy::Ask => "ask",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DuplicateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(DuplicateStrategy::Skip),
            "rename_new" | "rename-new" => Ok(DuplicateStrategy::RenameNew),
            "rename_existing" | "rename-existing" => Ok(DuplicateStrategy::RenameExisting),
            "overwrite" => Ok(DuplicateStrategy::Overwrite),
            "move_to_duplicates" | "move-to-duplicates" => Ok(DuplicateStrategy::MoveToDuplicates),
            "ask" => Ok(DuplicateStrategy::Ask),
            other => Err(format!("Unknown duplicate strategy: {}", other)),
        }
    }
}

/// The outcome of resolving one potential collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The path the caller should write to (or the existing path on skip).
    pub path: PathBuf,
    /// Whether a collision was present at all.
    pub was_duplicate: bool,
    /// Whether the caller must do nothing for this entry.
    pub skip: bool,
}

impl ResolvedPath {
    fn no_collision(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            was_duplicate: false,
            skip: false,
        }
    }

    fn proceed(path: PathBuf) -> Self {
        Self {
            path,
            was_duplicate: true,
            skip: false,
        }
    }
}

/// Session-scoped duplicate resolver.
///
/// One handler is created per command invocation and shared by every
/// operation in the run; its interaction history grows monotonically and is
/// discarded when the run ends.
#[derive(Debug)]
pub struct DuplicateHandler {
    strategy: DuplicateStrategy,
    duplicates_dir: Option<PathBuf>,
    dry_run: bool,
    history: HashMap<PathBuf, DuplicateStrategy>,
}

impl DuplicateHandler {
    /// Creates a handler for one run.
    ///
    /// `interactive` forces the `ask` strategy regardless of `strategy`.
    /// The duplicates directory only matters for `move_to_duplicates`.
    pub fn new(
        strategy: DuplicateStrategy,
        duplicates_dir: Option<PathBuf>,
        interactive: bool,
        dry_run: bool,
    ) -> Self {
        let strategy = if interactive {
            DuplicateStrategy::Ask
        } else {
            strategy
        };
        Self {
            strategy,
            duplicates_dir,
            dry_run,
            history: HashMap::new(),
        }
    }

    /// The currently configured strategy.
    ///
    /// An interactive "apply to all remaining" answer overwrites this for
    /// the rest of the run.
    pub fn strategy(&self) -> DuplicateStrategy {
        self.strategy
    }

    /// Whether this handler simulates instead of mutating the filesystem.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolves a potential collision at `candidate`.
    ///
    /// When `existing` is `None` and the candidate path is free there is no
    /// collision and the candidate comes back unchanged. Otherwise the
    /// effective strategy decides the final path; `skip` and `overwrite`
    /// never touch the filesystem here, they only signal the caller's next
    /// step.
    pub fn resolve(
        &mut self,
        candidate: &Path,
        existing: Option<&Path>,
        context: &str,
    ) -> OpResult<ResolvedPath> {
        let existing: PathBuf = match existing {
            Some(path) => path.to_path_buf(),
            None => {
                if !candidate.exists() {
                    return Ok(ResolvedPath::no_collision(candidate));
                }
                candidate.to_path_buf()
            }
        };

        let strategy = self.effective_strategy(candidate, &existing, context)?;

        match strategy {
            DuplicateStrategy::Skip => {
                info!("Skipping duplicate: {}", candidate.display());
                Ok(ResolvedPath {
                    path: existing,
                    was_duplicate: true,
                    skip: true,
                })
            }
            DuplicateStrategy::RenameNew => {
                let renamed = unique_sibling(candidate);
                info!("Renaming new entry to avoid duplicate: {}", renamed.display());
                Ok(ResolvedPath::proceed(renamed))
            }
            DuplicateStrategy::RenameExisting => {
                if self.dry_run {
                    info!(
                        "Would rename existing entry to avoid duplicate: {}",
                        existing.display()
                    );
                } else {
                    let backup = backup_sibling(&existing);
                    fs::rename(&existing, &backup).map_err(|e| {
                        OperationError::operation_failed(
                            format!("Failed to rename existing entry: {}", e),
                            &existing,
                        )
                    })?;
                    info!(
                        "Renamed existing entry to avoid duplicate: {}",
                        backup.display()
                    );
                }
                Ok(ResolvedPath::proceed(candidate.to_path_buf()))
            }
            DuplicateStrategy::Overwrite => {
                info!("Will overwrite existing entry: {}", existing.display());
                Ok(ResolvedPath::proceed(candidate.to_path_buf()))
            }
            DuplicateStrategy::MoveToDuplicates => {
                let Some(dir) = self.duplicates_dir.clone() else {
                    warn!("No duplicates directory configured, falling back to renaming");
                    return Ok(ResolvedPath::proceed(unique_sibling(candidate)));
                };

                if !self.dry_run {
                    fs::create_dir_all(&dir).map_err(|e| OperationError::from_io(e, &dir))?;
                }

                let name = candidate.file_name().ok_or_else(|| {
                    OperationError::invalid_path("Candidate has no file name", candidate)
                })?;
                let mut diverted = dir.join(name);
                if diverted.exists() {
                    diverted = unique_sibling(&diverted);
                }
                info!("Diverting duplicate to: {}", diverted.display());
                Ok(ResolvedPath::proceed(diverted))
            }
            // effective_strategy never yields Ask.
            DuplicateStrategy::Ask => Ok(ResolvedPath::proceed(candidate.to_path_buf())),
        }
    }

    fn effective_strategy(
        &mut self,
        candidate: &Path,
        existing: &Path,
        context: &str,
    ) -> OpResult<DuplicateStrategy> {
        if self.strategy != DuplicateStrategy::Ask {
            return Ok(self.strategy);
        }

        let key = normalize(candidate);
        if let Some(answer) = self.history.get(&key) {
            return Ok(*answer);
        }

        self.ask_user(candidate, existing, context)
    }

    /// Prompts for a strategy, remembering the answer for this path.
    ///
    /// The extra "apply to all remaining" choice permanently overwrites the
    /// session strategy and every recorded per-path answer.
    fn ask_user(
        &mut self,
        candidate: &Path,
        existing: &Path,
        context: &str,
    ) -> OpResult<DuplicateStrategy> {
        let prompt = format!(
            "Duplicate detected{}{}\n  existing: {}\n  new:      {}\nHow should it be handled?",
            if context.is_empty() { "" } else { ": " },
            context,
            existing.display(),
            candidate.display(),
        );

        let mut items: Vec<&str> = DuplicateStrategy::CONCRETE
            .iter()
            .map(DuplicateStrategy::describe)
            .collect();
        items.push("Apply one choice to all remaining duplicates");

        let choice = prompt_selection(&prompt, &items)?;

        if choice < DuplicateStrategy::CONCRETE.len() {
            let strategy = DuplicateStrategy::CONCRETE[choice];
            self.history.insert(normalize(candidate), strategy);
            return Ok(strategy);
        }

        let sub_items: Vec<&str> = DuplicateStrategy::CONCRETE
            .iter()
            .map(DuplicateStrategy::describe)
            .collect();
        let sub_choice = prompt_selection("Strategy to apply to all duplicates", &sub_items)?;
        let strategy = DuplicateStrategy::CONCRETE[sub_choice];

        self.strategy = strategy;
        for answer in self.history.values_mut() {
            *answer = strategy;
        }
        Ok(strategy)
    }
}

fn prompt_selection(prompt: &str, items: &[&str]) -> OpResult<usize> {
    dialoguer::Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .map_err(|e| {
            OperationError::user_cancelled(format!("Duplicate resolution interrupted: {}", e))
        })?
        .ok_or_else(|| OperationError::user_cancelled("Duplicate resolution cancelled by user"))
}

/// Synthesizes a free sibling name by appending a counter.
///
/// `photo.jpg` becomes `photo_1.jpg`, then `photo_2.jpg`, until a name with
/// no entry on disk is found.
pub fn unique_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dot_ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{}_{}{}", stem, counter, dot_ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Backup name for a displaced existing entry: `name_20250807-101500.ext`.
fn backup_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dot_ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");

    let backup = path.with_file_name(format!("{}_{}{}", stem, timestamp, dot_ext));
    if backup.exists() {
        unique_sibling(&backup)
    } else {
        backup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn handler(strategy: DuplicateStrategy) -> DuplicateHandler {
        DuplicateHandler::new(strategy, None, false, false)
    }

    #[test]
    fn test_no_collision_returns_candidate_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("fresh.txt");

        let mut h = handler(DuplicateStrategy::Skip);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, candidate);
        assert!(!resolved.was_duplicate);
        assert!(!resolved.skip);
    }

    #[test]
    fn test_skip_signals_without_touching_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::Skip);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, candidate);
        assert!(resolved.was_duplicate);
        assert!(resolved.skip);
        assert_eq!(
            fs::read_to_string(&candidate).expect("read"),
            "existing",
            "skip must not modify the existing entry"
        );
    }

    #[test]
    fn test_rename_new_synthesizes_free_sibling() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");
        fs::write(temp_dir.path().join("taken_1.txt"), "also taken").expect("Failed to write");

        let mut h = handler(DuplicateStrategy::RenameNew);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, temp_dir.path().join("taken_2.txt"));
        assert!(resolved.was_duplicate);
        assert!(!resolved.skip);
    }

    #[test]
    fn test_fixed_strategy_is_deterministic() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameNew);
        let first = h.resolve(&candidate, None, "test").expect("first");
        let second = h.resolve(&candidate, None, "test").expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrite_keeps_candidate_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::Overwrite);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, candidate);
        assert!(resolved.was_duplicate);
        assert!(!resolved.skip);
        assert_eq!(fs::read_to_string(&candidate).expect("read"), "existing");
    }

    #[test]
    fn test_rename_existing_moves_occupant_aside() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::RenameExisting);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, candidate);
        assert!(
            !candidate.exists(),
            "existing entry should have been renamed away"
        );

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_rename_existing_dry_run_leaves_disk_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = DuplicateHandler::new(DuplicateStrategy::RenameExisting, None, false, true);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, candidate);
        assert!(candidate.exists());
        assert_eq!(fs::read_to_string(&candidate).expect("read"), "existing");
    }

    #[test]
    fn test_move_to_duplicates_uses_configured_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dup_dir = temp_dir.path().join("dupes");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = DuplicateHandler::new(
            DuplicateStrategy::MoveToDuplicates,
            Some(dup_dir.clone()),
            false,
            false,
        );
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, dup_dir.join("taken.txt"));
        assert!(dup_dir.exists(), "duplicates directory should be created");
    }

    #[test]
    fn test_move_to_duplicates_without_directory_falls_back_to_rename() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let candidate = temp_dir.path().join("taken.txt");
        fs::write(&candidate, "existing").expect("Failed to write file");

        let mut h = handler(DuplicateStrategy::MoveToDuplicates);
        let resolved = h.resolve(&candidate, None, "test").expect("resolve");
        assert_eq!(resolved.path, temp_dir.path().join("taken_1.txt"));
    }

    #[test]
    fn test_interactive_flag_forces_ask() {
        let h = DuplicateHandler::new(DuplicateStrategy::Skip, None, true, false);
        assert_eq!(h.strategy(), DuplicateStrategy::Ask);
    }

    #[test]
    fn test_strategy_parses_from_str() {
        assert_eq!(
            "rename_new".parse::<DuplicateStrategy>(),
            Ok(DuplicateStrategy::RenameNew)
        );
        assert_eq!(
            "move-to-duplicates".parse::<DuplicateStrategy>(),
            Ok(DuplicateStrategy::MoveToDuplicates)
        );
        assert!("explode".parse::<DuplicateStrategy>().is_err());
    }
}
