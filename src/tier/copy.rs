//! Non-destructive directory copy used to move artifacts between tiers

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::tier::error::TierError;

/// Suffix of build-system marker files that are never carried across tiers.
pub const STAMP_SUFFIX: &str = "stamp";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Merge into destination entries that already exist instead of skipping
    /// them, so a copy interrupted part way completes on the next run.
    pub resume_partial: bool,
}

/// Copies the children of `from` into `to` without overwriting anything.
///
/// Top-level entries whose names end in `stamp` are ignored. A top-level entry
/// that already exists at the destination blocks that entry entirely unless
/// [`CopyOptions::resume_partial`] is set, in which case only the files
/// missing beneath it are copied. Returns the number of files written.
pub fn copy_dir(from: &Path, to: &Path, options: CopyOptions) -> Result<usize, TierError> {
    fs::create_dir_all(to).map_err(TierError::io(to))?;

    let mut entries: Vec<_> = fs::read_dir(from)
        .map_err(TierError::io(from))?
        .collect::<Result<_, _>>()
        .map_err(TierError::io(from))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut copied = 0;
    for entry in entries {
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(STAMP_SUFFIX) {
            continue;
        }

        let from_path = entry.path();
        let to_path = to.join(&name);

        if to_path.symlink_metadata().is_ok() {
            if options.resume_partial && from_path.is_dir() && to_path.is_dir() {
                copied += copy_tree(&from_path, &to_path)?;
            } else {
                debug!("Skipping existing {:?}", to_path);
            }
            continue;
        }

        if from_path.is_file() {
            fs::copy(&from_path, &to_path).map_err(TierError::io(&to_path))?;
            copied += 1;
        } else {
            copied += copy_tree(&from_path, &to_path)?;
        }
    }

    Ok(copied)
}

/// Recursively copies `from` to `to`, writing only files missing at `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<usize, TierError> {
    let mut copied = 0;

    for entry in WalkDir::new(from)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        let Ok(rel_path) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(TierError::io(&target))?;
        } else if target.symlink_metadata().is_err() {
            fs::copy(entry.path(), &target).map_err(TierError::io(&target))?;
            copied += 1;
        }
    }

    Ok(copied)
}
