//! Source folder traversal

use std::fs;
use std::path::Path;

use intunewin_core::SourceEntry;

use crate::error::{PackError, PackResult, Stage};

/// Collect every directory and regular file below `dir`.
///
/// Depth-first, each directory's children in lexical name order, so the same
/// tree always produces the same entry list. The root itself is not emitted.
/// A symlink to a regular file inside `dir` is packaged as that file's
/// content; other symlinks and special files are refused.
pub fn walk_source_dir(dir: &Path) -> PackResult<Vec<SourceEntry>> {
    let meta = fs::symlink_metadata(dir).map_err(PackError::io(Stage::Archiving, dir))?;
    if meta.file_type().is_symlink() {
        return Err(PackError::InvalidInput(format!(
            "refusing to package symlinked source folder: {}",
            dir.display()
        )));
    }
    if !meta.is_dir() {
        return Err(PackError::InvalidInput(format!(
            "source is not a directory: {}",
            dir.display()
        )));
    }

    let root = fs::canonicalize(dir).map_err(PackError::io(Stage::Archiving, dir))?;
    let mut entries = Vec::new();
    walk(dir, &root, dir, &mut entries)?;
    Ok(entries)
}

fn walk(base: &Path, root: &Path, dir: &Path, out: &mut Vec<SourceEntry>) -> PackResult<()> {
    let mut children = fs::read_dir(dir)
        .map_err(PackError::io(Stage::Archiving, dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(PackError::io(Stage::Archiving, dir))?;
    children.sort();

    for path in children {
        let meta = fs::symlink_metadata(&path).map_err(PackError::io(Stage::Archiving, &path))?;
        let rel = path
            .strip_prefix(base)
            .map_err(|_| {
                PackError::InvalidInput(format!("{} escapes the source folder", path.display()))
            })?
            .to_path_buf();

        let file_type = meta.file_type();
        if file_type.is_symlink() {
            check_file_symlink(root, &path)?;
            out.push(SourceEntry::file(rel, path));
        } else if file_type.is_dir() {
            out.push(SourceEntry::directory(rel));
            walk(base, root, &path, out)?;
        } else if file_type.is_file() {
            out.push(SourceEntry::file(rel, path));
        } else {
            return Err(PackError::InvalidInput(format!(
                "source folder contains a special file (refused): {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Accept a symlink only if it resolves to a regular file under `root`.
fn check_file_symlink(root: &Path, link: &Path) -> PackResult<()> {
    let target = fs::canonicalize(link).map_err(PackError::io(Stage::Archiving, link))?;
    if !target.starts_with(root) {
        return Err(PackError::InvalidInput(format!(
            "symlink points outside the source folder (refused): {}",
            link.display()
        )));
    }
    if !target.is_file() {
        return Err(PackError::InvalidInput(format!(
            "symlink to a non-file (refused): {}",
            link.display()
        )));
    }
    Ok(())
}

/// Application name for a source folder: its base name.
///
/// Falls back to `"app"` for paths with no final component (`/`, `..`).
pub fn app_name_for(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "app".to_string())
}
