//! Version retention for the archive (online) and the build tree (offline)
//!
//! Online, the full stable history is kept along with any pre-release newer
//! than the newest stable. Offline, disk is bounded to the newest stable and
//! the newest pre-release.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Mode;
use crate::tier::error::TierError;
use crate::tier::locator::list_versions;
use crate::version::types::Version;

/// Outcome of a retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub kept: BTreeSet<Version>,
    pub deleted: Vec<Version>,
    /// Versions whose removal failed, with the error text
    pub failed: Vec<(Version, String)>,
}

/// Computes which of `local` survive a retention pass.
pub fn compute_keep_set(
    local: &BTreeSet<Version>,
    catalog: &BTreeSet<Version>,
    mode: Mode,
) -> BTreeSet<Version> {
    let stable: BTreeSet<Version> = local.intersection(catalog).cloned().collect();
    let other: BTreeSet<Version> = local.difference(&stable).cloned().collect();
    let latest_stable = stable.last();

    let mut keep = BTreeSet::new();
    match mode {
        Mode::Online => {
            keep.extend(stable.iter().cloned());
            match latest_stable {
                None => keep.extend(other.iter().cloned()),
                Some(latest) => keep.extend(other.iter().filter(|v| *v > latest).cloned()),
            }
        }
        Mode::Offline => {
            keep.extend(latest_stable.cloned());
            keep.extend(other.last().cloned());
        }
    }
    keep
}

/// Deletes every version directory under `root` not in the keep set.
///
/// Removal is best-effort: a version that cannot be removed is recorded in
/// the report and the remaining versions are still processed. Only failing to
/// list `root` is an error.
pub fn delete_old_versions(
    root: &Path,
    catalog: &BTreeSet<Version>,
    mode: Mode,
) -> Result<RetentionReport, TierError> {
    let local: BTreeSet<Version> = list_versions(root)?.into_iter().collect();
    let kept = compute_keep_set(&local, catalog, mode);

    let mut report = RetentionReport {
        kept,
        ..RetentionReport::default()
    };

    for version in local.difference(&report.kept) {
        match mode {
            Mode::Online => info!("Deleting {}", version),
            Mode::Offline => info!("Deleting {} build directory", version),
        }

        let path = root.join(version.as_str());
        match remove_forcibly(&path) {
            Ok(()) => report.deleted.push(version.clone()),
            Err(e) => {
                warn!("Failed to delete {:?}: {}", path, e);
                report.failed.push((version.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Removes a file or directory tree, clearing read-only bits when the first
/// attempt is refused.
pub fn remove_forcibly(path: &Path) -> io::Result<()> {
    let remove = |path: &Path| -> io::Result<()> {
        if path.symlink_metadata()?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    };

    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => {
            make_writable_recursive(path)?;
            remove(path)
        }
    }
}

fn make_writable_recursive(path: &Path) -> io::Result<()> {
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_symlink() {
            continue;
        }
        make_writable(entry.path())?;
    }
    Ok(())
}

fn make_writable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode();
        if mode & 0o200 == 0 {
            perms.set_mode(mode | 0o200);
            fs::set_permissions(path, perms)?;
        }
    }
    #[cfg(not(unix))]
    {
        if perms.readonly() {
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
        }
    }
    Ok(())
}
