//! colsort - sort loosely-named media collections
//!
//! This library organizes manga archive folders, video episode files, and
//! arbitrary renamable trees: filename-parsing heuristics decide destination
//! names, a pluggable set of file-operation verbs performs the effects, a
//! duplicate-resolution engine mediates collisions, and a batch pipeline
//! drives everything with partial-failure semantics and a dry-run mode.

pub mod archive;
pub mod batch;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod manga;
pub mod operations;
pub mod output;
pub mod paths;
pub mod rename;
pub mod templates;
pub mod video;

pub use batch::{BatchProcessor, BatchReport, BatchStats};
pub use config::{AppConfig, ConfigError};
pub use duplicates::{DuplicateHandler, DuplicateStrategy, ResolvedPath};
pub use error::{ErrorKind, OpResult, OperationError, collect_results};
pub use manga::{MangaInfo, MangaParser, MangaProcessor};
pub use paths::{FilePath, PathKind};
pub use rename::RenameProcessor;
pub use templates::{DirectoryAction, DirectoryProcessor, FileAction, FileProcessor};
pub use video::{VideoInfo, VideoParser, VideoRenamer};

pub use cli::{Cli, run};
