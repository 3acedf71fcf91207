//! ZIP packing and unpacking verbs.
//!
//! Archives use standard deflate compression at a configurable level. Entry
//! paths inside an archive are rooted under the explicit archive name when
//! one is given, or under the source directory's own name otherwise, so an
//! extracted archive reproduces the original tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::duplicates::DuplicateHandler;
use crate::error::{OpResult, OperationError};

/// Whether a path looks like an archive this crate can extract.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Validates a deflate compression level.
pub fn check_compression_level(level: u32) -> OpResult<()> {
    if level > 9 {
        return Err(OperationError::validation(format!(
            "Compression level must be between 0 and 9, got {}",
            level
        )));
    }
    Ok(())
}

/// Archives a directory into a ZIP file.
///
/// The archive lands in `destination` (the source's parent when omitted) as
/// `<name>.zip`, where `name` is the explicit `archive_name` or the source
/// directory's own name. Duplicate resolution applies to the archive path
/// itself before any writing begins.
pub fn archive_directory(
    source: &Path,
    destination: Option<&Path>,
    archive_name: Option<&str>,
    compression_level: u32,
    handler: &mut DuplicateHandler,
) -> OpResult<PathBuf> {
    if !source.exists() {
        return Err(OperationError::not_found(source));
    }
    if !source.is_dir() {
        return Err(OperationError::invalid_path(
            format!("Not a directory: {}", source.display()),
            source,
        ));
    }
    check_compression_level(compression_level)?;
    let dry_run = handler.dry_run();

    let name = match archive_name {
        Some(name) => name.to_string(),
        None => source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| OperationError::invalid_path("Source has no name", source))?,
    };

    let dest_dir = match destination {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| OperationError::invalid_path("Source has no parent", source))?,
    };
    let archive_path = dest_dir.join(format!("{}.zip", name));

    let resolved = handler.resolve(
        &archive_path,
        None,
        &format!("Creating archive for {}", source.display()),
    )?;
    if resolved.skip {
        info!("Skipping duplicate archive: {}", archive_path.display());
        return Ok(resolved.path);
    }

    if dry_run {
        info!(
            "Would archive: {} -> {}",
            source.display(),
            resolved.path.display()
        );
        return Ok(resolved.path);
    }

    if let Some(parent) = resolved.path.parent() {
        fs::create_dir_all(parent).map_err(|e| OperationError::from_io(e, parent))?;
    }

    pack_tree(source, &resolved.path, Some(&name), compression_level)?;
    info!(
        "Archived: {} -> {}",
        source.display(),
        resolved.path.display()
    );
    Ok(resolved.path)
}

/// Writes every regular file under `source` into a new ZIP at `archive_path`.
///
/// Entries are stored relative to `source`, prefixed with `root` when given.
pub fn pack_tree(
    source: &Path,
    archive_path: &Path,
    root: Option<&str>,
    compression_level: u32,
) -> OpResult<()> {
    let file =
        fs::File::create(archive_path).map_err(|e| OperationError::from_io(e, archive_path))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(i64::from(compression_level)));

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            OperationError::operation_failed(format!("Failed to walk source tree: {}", e), source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| OperationError::invalid_path("Entry escaped source tree", entry.path()))?;
        let entry_name = match root {
            Some(root) => format!("{}/{}", root, zip_entry_name(relative)),
            None => zip_entry_name(relative),
        };

        writer
            .start_file(entry_name, options)
            .map_err(|e| zip_error(e, archive_path))?;
        let mut input =
            fs::File::open(entry.path()).map_err(|e| OperationError::from_io(e, entry.path()))?;
        io::copy(&mut input, &mut writer)
            .map_err(|e| OperationError::from_io(e, entry.path()))?;
    }

    writer.finish().map_err(|e| zip_error(e, archive_path))?;
    Ok(())
}

/// Extracts a ZIP archive.
///
/// The destination defaults to a sibling directory named after the archive's
/// base name; duplicate resolution applies to that directory.
pub fn extract_archive(
    source: &Path,
    destination: Option<&Path>,
    handler: &mut DuplicateHandler,
) -> OpResult<PathBuf> {
    if !source.exists() {
        return Err(OperationError::not_found(source));
    }
    if !source.is_file() {
        return Err(OperationError::invalid_path(
            format!("Not a file: {}", source.display()),
            source,
        ));
    }
    if !is_archive(source) {
        return Err(OperationError::validation(format!(
            "Not a ZIP archive: {}",
            source.display()
        ))
        .with_path(source));
    }
    let dry_run = handler.dry_run();

    let dest_dir = match destination {
        Some(dir) => dir.to_path_buf(),
        None => {
            let stem = source
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| OperationError::invalid_path("Archive has no name", source))?;
            source
                .parent()
                .map(|p| p.join(stem))
                .ok_or_else(|| OperationError::invalid_path("Archive has no parent", source))?
        }
    };

    let resolved = handler.resolve(
        &dest_dir,
        None,
        &format!("Extracting archive {}", source.display()),
    )?;
    if resolved.skip {
        info!(
            "Skipping extraction to existing directory: {}",
            dest_dir.display()
        );
        return Ok(resolved.path);
    }

    if dry_run {
        info!(
            "Would extract: {} -> {}",
            source.display(),
            resolved.path.display()
        );
        return Ok(resolved.path);
    }

    fs::create_dir_all(&resolved.path).map_err(|e| OperationError::from_io(e, &resolved.path))?;

    let file = fs::File::open(source).map_err(|e| OperationError::from_io(e, source))?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(e, source))?;
    archive
        .extract(&resolved.path)
        .map_err(|e| zip_error(e, source))?;

    info!(
        "Extracted: {} -> {}",
        source.display(),
        resolved.path.display()
    );
    Ok(resolved.path)
}

/// Archive entry names always use forward slashes.
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn zip_error(error: zip::result::ZipError, path: &Path) -> OperationError {
    match error {
        zip::result::ZipError::Io(io_error) => OperationError::from_io(io_error, path),
        other => OperationError::operation_failed(format!("Archive error: {}", other), path),
    }
}
