//! Classifies what each version directory in a tier holds

use std::fs;
use std::path::Path;

use crate::tier::error::TierError;
use crate::version::types::{Version, is_version_string};

/// Files that mark a version's source as fetched and ready to build.
pub const SOURCE_FILES: [&str; 3] = ["chromium.tgz", "depot_tools.tgz", "docker.tar"];

/// Files that mark a version as built and analysed, one per architecture.
pub const BUILD_FILES: [&str; 2] = ["libmonochrome32.so.i64", "libmonochrome64.so.i64"];

/// Named group of files that together mark a pipeline stage as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSet {
    Source,
    Build,
}

impl ArtifactSet {
    pub fn required_files(&self) -> &'static [&'static str] {
        match self {
            ArtifactSet::Source => &SOURCE_FILES,
            ArtifactSet::Build => &BUILD_FILES,
        }
    }

    /// All-or-nothing: a partial set counts as absent.
    pub fn is_present_in(&self, dir: &Path) -> bool {
        has_files(dir, self.required_files())
    }
}

/// Returns true only if every one of `filenames` exists under `dir`.
pub fn has_files(dir: &Path, filenames: &[&str]) -> bool {
    filenames.iter().all(|name| dir.join(name).exists())
}

/// Every child of `dir` whose name parses as a version, ascending.
pub fn list_versions(dir: &Path) -> Result<Vec<Version>, TierError> {
    let mut versions = Vec::new();

    for entry in fs::read_dir(dir).map_err(TierError::io(dir))? {
        let entry = entry.map_err(TierError::io(dir))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !is_version_string(&name) {
            continue;
        }
        if let Ok(version) = name.parse::<Version>() {
            versions.push(version);
        }
    }

    versions.sort();
    Ok(versions)
}
