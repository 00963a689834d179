//! Propagates source and build artifacts between the archive, the bridge
//! drive and the offline build tree
//!
//! Each direction only copies what the destination lacks, so every operation
//! is idempotent. When the bridge drive is not mounted every operation is a
//! no-op.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::tier::copy::{CopyOptions, copy_dir};
use crate::tier::error::TierError;
use crate::tier::locator::{ArtifactSet, list_versions};
use crate::version::types::Version;

pub struct TierSynchronizer {
    archive_root: PathBuf,
    bridge_root: PathBuf,
    build_root: PathBuf,
    copy_options: CopyOptions,
}

impl TierSynchronizer {
    pub fn new(
        archive_root: impl Into<PathBuf>,
        bridge_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
        copy_options: CopyOptions,
    ) -> Self {
        Self {
            archive_root: archive_root.into(),
            bridge_root: bridge_root.into(),
            build_root: build_root.into(),
            copy_options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.archive_root,
            &config.bridge_root,
            &config.build_root,
            CopyOptions {
                resume_partial: config.resume_partial_copies,
            },
        )
    }

    /// Whether the removable bridge drive is currently reachable.
    pub fn bridge_mounted(&self) -> bool {
        self.bridge_root.exists()
    }

    pub fn bridge_root(&self) -> &Path {
        &self.bridge_root
    }

    /// Archive → bridge, source artifacts.
    pub fn archive_to_bridge_source(
        &self,
        only: Option<&Version>,
    ) -> Result<Vec<Version>, TierError> {
        self.propagate(&self.archive_root, only, |version| {
            let archive_dir = self.archive_root.join(version.as_str());
            let bridge_dir = self.bridge_root.join(version.as_str());

            let wanted = !ArtifactSet::Build.is_present_in(&archive_dir)
                && !ArtifactSet::Build.is_present_in(&bridge_dir)
                && !ArtifactSet::Source.is_present_in(&bridge_dir);
            wanted.then(|| Transfer::new(archive_dir, bridge_dir, "source to bridge"))
        })
    }

    /// Bridge → build tree, source artifacts.
    pub fn bridge_to_build_source(
        &self,
        only: Option<&Version>,
    ) -> Result<Vec<Version>, TierError> {
        self.propagate(&self.bridge_root, only, |version| {
            let bridge_dir = self.bridge_root.join(version.as_str());
            let archive_dir = self.archive_root.join(version.as_str());
            let build_dir = self.build_root.join(version.as_str());

            let wanted = !ArtifactSet::Build.is_present_in(&bridge_dir)
                && !ArtifactSet::Build.is_present_in(&archive_dir)
                && !ArtifactSet::Source.is_present_in(&build_dir);
            wanted.then(|| Transfer::new(bridge_dir, build_dir, "source from bridge"))
        })
    }

    /// Archive → bridge, build artifacts. Only versions whose source came
    /// over on the bridge are sent back.
    pub fn archive_to_bridge_build(
        &self,
        only: Option<&Version>,
    ) -> Result<Vec<Version>, TierError> {
        self.propagate(&self.archive_root, only, |version| {
            let archive_dir = self.archive_root.join(version.as_str());
            let bridge_dir = self.bridge_root.join(version.as_str());

            let wanted = ArtifactSet::Build.is_present_in(&archive_dir)
                && ArtifactSet::Source.is_present_in(&bridge_dir)
                && !ArtifactSet::Build.is_present_in(&bridge_dir);
            wanted.then(|| Transfer::new(archive_dir, bridge_dir, "builds to bridge"))
        })
    }

    /// Bridge → archive, build artifacts.
    pub fn bridge_to_archive_build(
        &self,
        only: Option<&Version>,
    ) -> Result<Vec<Version>, TierError> {
        self.propagate(&self.bridge_root, only, |version| {
            let bridge_dir = self.bridge_root.join(version.as_str());
            let archive_dir = self.archive_root.join(version.as_str());

            let wanted = ArtifactSet::Build.is_present_in(&bridge_dir)
                && !ArtifactSet::Build.is_present_in(&archive_dir);
            wanted.then(|| Transfer::new(bridge_dir, archive_dir, "builds from bridge"))
        })
    }

    fn propagate<F>(
        &self,
        source_root: &Path,
        only: Option<&Version>,
        plan: F,
    ) -> Result<Vec<Version>, TierError>
    where
        F: Fn(&Version) -> Option<Transfer>,
    {
        if !self.bridge_mounted() {
            debug!("Bridge {:?} not mounted, nothing to sync", self.bridge_root);
            return Ok(Vec::new());
        }

        let mut copied = Vec::new();
        for version in candidate_versions(source_root, only)? {
            let Some(transfer) = plan(&version) else {
                continue;
            };
            if !transfer.from.is_dir() {
                debug!("{} has no directory under {:?}", version, source_root);
                continue;
            }

            let files = copy_dir(&transfer.from, &transfer.to, self.copy_options)?;
            if files == 0 {
                debug!("Nothing new to copy for {} {}", version, transfer.label);
                continue;
            }

            info!("Copied {} {} ({} files)", version, transfer.label, files);
            copied.push(version);
        }

        Ok(copied)
    }
}

struct Transfer {
    from: PathBuf,
    to: PathBuf,
    label: &'static str,
}

impl Transfer {
    fn new(from: PathBuf, to: PathBuf, label: &'static str) -> Self {
        Self { from, to, label }
    }
}

fn candidate_versions(root: &Path, only: Option<&Version>) -> Result<Vec<Version>, TierError> {
    match only {
        Some(version) => Ok(vec![version.clone()]),
        None if root.is_dir() => list_versions(root),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::locator::{BUILD_FILES, SOURCE_FILES};
    use std::fs;
    use tempfile::TempDir;

    struct Tiers {
        _temp_dir: TempDir,
        archive: PathBuf,
        bridge: PathBuf,
        build: PathBuf,
    }

    impl Tiers {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let archive = temp_dir.path().join("archive");
            let bridge = temp_dir.path().join("bridge");
            let build = temp_dir.path().join("build");
            for dir in [&archive, &bridge, &build] {
                fs::create_dir_all(dir).unwrap();
            }
            Self {
                _temp_dir: temp_dir,
                archive,
                bridge,
                build,
            }
        }

        fn sync(&self) -> TierSynchronizer {
            TierSynchronizer::new(
                &self.archive,
                &self.bridge,
                &self.build,
                CopyOptions::default(),
            )
        }
    }

    fn put(root: &Path, version: &str, files: &[&str]) {
        let dir = root.join(version);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), version).unwrap();
        }
    }

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn archive_source_goes_to_bridge_once() {
        let tiers = Tiers::new();
        put(&tiers.archive, "120.0.6099.5", &SOURCE_FILES);
        let sync = tiers.sync();

        assert_eq!(
            sync.archive_to_bridge_source(None).unwrap(),
            vec![v("120.0.6099.5")]
        );
        assert!(ArtifactSet::Source.is_present_in(&tiers.bridge.join("120.0.6099.5")));

        assert!(sync.archive_to_bridge_source(None).unwrap().is_empty());
    }

    #[test]
    fn archive_source_skipped_when_already_built() {
        let tiers = Tiers::new();
        put(&tiers.archive, "119.0.6045.66", &SOURCE_FILES);
        put(&tiers.archive, "119.0.6045.66", &BUILD_FILES);
        put(&tiers.archive, "120.0.6099.5", &SOURCE_FILES);
        put(&tiers.bridge, "120.0.6099.5", &BUILD_FILES);

        let copied = tiers.sync().archive_to_bridge_source(None).unwrap();

        assert!(copied.is_empty());
        assert!(!tiers.bridge.join("119.0.6045.66").exists());
    }

    #[test]
    fn bridge_source_goes_to_build_tree_in_version_order() {
        let tiers = Tiers::new();
        put(&tiers.bridge, "10.0.0.0", &SOURCE_FILES);
        put(&tiers.bridge, "9.0.0.1", &SOURCE_FILES);
        let sync = tiers.sync();

        assert_eq!(
            sync.bridge_to_build_source(None).unwrap(),
            vec![v("9.0.0.1"), v("10.0.0.0")]
        );
        assert!(ArtifactSet::Source.is_present_in(&tiers.build.join("9.0.0.1")));
        assert!(sync.bridge_to_build_source(None).unwrap().is_empty());
    }

    #[test]
    fn bridge_source_skipped_when_built_anywhere() {
        let tiers = Tiers::new();
        put(&tiers.bridge, "1.0.0.0", &SOURCE_FILES);
        put(&tiers.archive, "1.0.0.0", &BUILD_FILES);
        put(&tiers.bridge, "2.0.0.0", &SOURCE_FILES);
        put(&tiers.bridge, "2.0.0.0", &BUILD_FILES);

        let copied = tiers.sync().bridge_to_build_source(None).unwrap();

        assert!(copied.is_empty());
        assert!(!tiers.build.join("1.0.0.0").exists());
    }

    #[test]
    fn archive_builds_go_back_only_for_versions_sourced_from_bridge() {
        let tiers = Tiers::new();
        put(&tiers.archive, "1.0.0.0", &BUILD_FILES);
        put(&tiers.bridge, "1.0.0.0", &SOURCE_FILES);
        put(&tiers.archive, "2.0.0.0", &BUILD_FILES);
        let sync = tiers.sync();

        assert_eq!(
            sync.archive_to_bridge_build(None).unwrap(),
            vec![v("1.0.0.0")]
        );
        assert!(ArtifactSet::Build.is_present_in(&tiers.bridge.join("1.0.0.0")));
        assert!(!tiers.bridge.join("2.0.0.0").exists());

        assert!(sync.archive_to_bridge_build(None).unwrap().is_empty());
    }

    #[test]
    fn bridge_builds_go_to_archive_once() {
        let tiers = Tiers::new();
        put(&tiers.bridge, "1.0.0.0", &SOURCE_FILES);
        put(&tiers.bridge, "1.0.0.0", &BUILD_FILES);
        put(&tiers.archive, "1.0.0.0", &SOURCE_FILES);
        let sync = tiers.sync();

        assert_eq!(
            sync.bridge_to_archive_build(None).unwrap(),
            vec![v("1.0.0.0")]
        );
        assert!(ArtifactSet::Build.is_present_in(&tiers.archive.join("1.0.0.0")));
        assert!(sync.bridge_to_archive_build(None).unwrap().is_empty());
    }

    #[test]
    fn partial_source_set_is_not_reported_again() {
        let tiers = Tiers::new();
        put(&tiers.archive, "1.0.0.0", &["docker.tar"]);
        let sync = tiers.sync();

        assert_eq!(
            sync.archive_to_bridge_source(None).unwrap(),
            vec![v("1.0.0.0")]
        );
        assert!(sync.archive_to_bridge_source(None).unwrap().is_empty());
        assert!(!ArtifactSet::Source.is_present_in(&tiers.bridge.join("1.0.0.0")));
    }

    #[test]
    fn version_filter_limits_propagation() {
        let tiers = Tiers::new();
        put(&tiers.archive, "1.0.0.0", &SOURCE_FILES);
        put(&tiers.archive, "2.0.0.0", &SOURCE_FILES);

        let copied = tiers
            .sync()
            .archive_to_bridge_source(Some(&v("2.0.0.0")))
            .unwrap();

        assert_eq!(copied, vec![v("2.0.0.0")]);
        assert!(!tiers.bridge.join("1.0.0.0").exists());
    }

    #[test]
    fn filtered_version_missing_from_source_is_skipped() {
        let tiers = Tiers::new();

        let copied = tiers
            .sync()
            .archive_to_bridge_source(Some(&v("3.0.0.0")))
            .unwrap();

        assert!(copied.is_empty());
        assert!(!tiers.bridge.join("3.0.0.0").exists());
    }

    #[test]
    fn unmounted_bridge_makes_every_direction_a_no_op() {
        let tiers = Tiers::new();
        put(&tiers.archive, "1.0.0.0", &SOURCE_FILES);
        put(&tiers.archive, "2.0.0.0", &BUILD_FILES);
        fs::remove_dir_all(&tiers.bridge).unwrap();
        let sync = tiers.sync();

        assert!(!sync.bridge_mounted());
        assert!(sync.archive_to_bridge_source(None).unwrap().is_empty());
        assert!(sync.bridge_to_build_source(None).unwrap().is_empty());
        assert!(sync.archive_to_bridge_build(None).unwrap().is_empty());
        assert!(sync.bridge_to_archive_build(None).unwrap().is_empty());
        assert!(!tiers.bridge.exists());
        assert!(fs::read_dir(&tiers.build).unwrap().next().is_none());
    }
}
