//! End-to-end cycle: sync tiers, refresh the catalog, clean old versions and
//! download (online) or build (offline) whatever is missing

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{Config, Mode};
use crate::pipeline::build::Builder;
use crate::pipeline::download::Downloader;
use crate::pipeline::error::PipelineError;
use crate::pipeline::runner::CommandRunner;
use crate::tier::locator::{ArtifactSet, list_versions};
use crate::tier::retention::{RetentionReport, delete_old_versions};
use crate::tier::sync::TierSynchronizer;
use crate::version::catalog::{VersionCatalog, latest_live};
use crate::version::registry::ReleaseRegistry;
use crate::version::types::{Channel, DownloadTarget, Version};

/// One top-level action selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the mode's two sync directions; the bridge must be mounted
    Sync,
    /// Delete versions outside the retention policy
    Clean,
    /// Online only: download one version and push its source to the bridge
    Download(DownloadTarget),
    /// Offline only: build one version and push its artifacts to the bridge
    Build(Version),
    /// The full cycle for the configured mode
    Cycle,
}

pub struct Pipeline {
    config: Config,
    registry: Arc<dyn ReleaseRegistry>,
    runner: Arc<dyn CommandRunner>,
    sync: TierSynchronizer,
    catalog: VersionCatalog,
}

impl Pipeline {
    pub fn new(
        config: Config,
        registry: Arc<dyn ReleaseRegistry>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let sync = TierSynchronizer::from_config(&config);
        let catalog = VersionCatalog::new(config.catalog_path());
        Self {
            config,
            registry,
            runner,
            sync,
            catalog,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn execute(&self, action: &Action) -> Result<(), PipelineError> {
        match action {
            Action::Sync => self.sync_tiers(),
            Action::Clean => self.clean().await.map(drop),
            Action::Download(target) => self.download(target).await.map(drop),
            Action::Build(version) => self.build(version),
            Action::Cycle => match self.config.mode {
                Mode::Online => self.run_online().await,
                Mode::Offline => self.run_offline(),
            },
        }
    }

    pub fn sync_tiers(&self) -> Result<(), PipelineError> {
        self.require_bridge()?;

        match self.config.mode {
            Mode::Online => {
                self.sync.bridge_to_archive_build(None)?;
                self.sync.archive_to_bridge_source(None)?;
            }
            Mode::Offline => {
                self.sync.archive_to_bridge_build(None)?;
                self.sync.bridge_to_build_source(None)?;
            }
        }
        Ok(())
    }

    pub async fn clean(&self) -> Result<RetentionReport, PipelineError> {
        self.require_bridge()?;

        if self.config.is_online() {
            self.catalog.refresh(self.registry.as_ref()).await?;
        }
        self.apply_retention()
    }

    /// Downloads `target` and pushes its source to the bridge. Returns the
    /// concrete version the target resolved to.
    pub async fn download(&self, target: &DownloadTarget) -> Result<Version, PipelineError> {
        self.require_mode(Mode::Online, "download")?;

        self.catalog.refresh(self.registry.as_ref()).await?;
        let version = self.resolve(target).await?;
        self.download_and_push(&version)?;
        Ok(version)
    }

    pub fn build(&self, version: &Version) -> Result<(), PipelineError> {
        self.require_mode(Mode::Offline, "build")?;

        self.sync.bridge_to_build_source(Some(version))?;
        Builder::new(&self.config, self.runner.as_ref()).build(version)?;
        self.sync.archive_to_bridge_build(Some(version))?;
        Ok(())
    }

    async fn run_online(&self) -> Result<(), PipelineError> {
        self.sync.bridge_to_archive_build(None)?;
        self.sync.archive_to_bridge_source(None)?;

        let catalog = self.catalog.refresh(self.registry.as_ref()).await?;
        self.apply_retention()?;

        let archived = self.archived_versions()?;
        let new_stables = find_new_stable_versions(&catalog, &archived);
        for version in &new_stables {
            self.download_and_push(version)?;
        }

        if !new_stables.is_empty() {
            let canary = latest_live(self.registry.as_ref(), Channel::Canary).await?;
            info!("Downloading version {} ({})", canary, Channel::Canary);
            self.download_and_push(&canary)?;
        }
        Ok(())
    }

    fn run_offline(&self) -> Result<(), PipelineError> {
        self.sync.archive_to_bridge_build(None)?;
        self.sync.bridge_to_build_source(None)?;
        self.retain_if_history()?;

        if !self.sync.bridge_mounted() {
            info!("Bridge not mounted, nothing to build");
            return Ok(());
        }

        let builder = Builder::new(&self.config, self.runner.as_ref());
        for version in list_versions(self.sync.bridge_root())? {
            if ArtifactSet::Build.is_present_in(&self.sync.bridge_root().join(version.as_str())) {
                continue;
            }

            info!("Building {}", version);
            match builder.build(&version) {
                Ok(_) => {}
                Err(e @ PipelineError::MissingSource(_)) => {
                    error!("{}", e);
                    continue;
                }
                Err(e) => return Err(e),
            }

            self.sync.archive_to_bridge_build(Some(&version))?;
            self.retain_if_history()?;
        }
        Ok(())
    }

    async fn resolve(&self, target: &DownloadTarget) -> Result<Version, PipelineError> {
        let version = match target {
            DownloadTarget::Exact(version) => version.clone(),
            DownloadTarget::Latest(Channel::Stable) => self.catalog.latest()?,
            DownloadTarget::Latest(channel) => {
                latest_live(self.registry.as_ref(), *channel).await?
            }
        };
        if let DownloadTarget::Latest(channel) = target {
            info!("Latest {} version is {}", channel, version);
        }
        Ok(version)
    }

    fn download_and_push(&self, version: &Version) -> Result<(), PipelineError> {
        Downloader::new(&self.config, self.runner.as_ref()).download(version)?;
        self.sync.archive_to_bridge_source(Some(version))?;
        Ok(())
    }

    fn apply_retention(&self) -> Result<RetentionReport, PipelineError> {
        if !self.catalog.exists() {
            return Err(PipelineError::NoVersionHistory(self.catalog.path().to_path_buf()));
        }
        let catalog = self.catalog.load_set()?;

        let root = match self.config.mode {
            Mode::Online => &self.config.archive_root,
            Mode::Offline => &self.config.build_root,
        };
        if !root.is_dir() {
            return Ok(RetentionReport::default());
        }

        let report = delete_old_versions(root, &catalog, self.config.mode)?;
        if !report.failed.is_empty() {
            warn!("{} versions could not be deleted", report.failed.len());
        }
        Ok(report)
    }

    /// Retention inside the offline cycle, which may run before the bridge
    /// has ever carried a snapshot over.
    fn retain_if_history(&self) -> Result<(), PipelineError> {
        match self.apply_retention() {
            Ok(_) => Ok(()),
            Err(PipelineError::NoVersionHistory(path)) => {
                warn!("No chrome version history at {:?}, skipping cleanup", path);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn archived_versions(&self) -> Result<BTreeSet<Version>, PipelineError> {
        let root = &self.config.archive_root;
        if !root.is_dir() {
            return Ok(BTreeSet::new());
        }
        Ok(list_versions(root)?.into_iter().collect())
    }

    fn require_bridge(&self) -> Result<(), PipelineError> {
        if self.sync.bridge_mounted() {
            Ok(())
        } else {
            Err(PipelineError::BridgeNotMounted(self.sync.bridge_root().to_path_buf()))
        }
    }

    fn require_mode(&self, required: Mode, action: &'static str) -> Result<(), PipelineError> {
        if self.config.mode == required {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedInMode { action, required })
        }
    }
}

/// Stable versions whose major is newer than anything archived, newest
/// first, one (the highest) per major.
///
/// Only archived versions that appear in the catalog count as archived
/// stables. With none archived, the newest catalog version is returned alone.
pub fn find_new_stable_versions(catalog: &[Version], archived: &BTreeSet<Version>) -> Vec<Version> {
    let catalog_set: BTreeSet<&Version> = catalog.iter().collect();
    let latest_archived_major = archived
        .iter()
        .filter(|version| catalog_set.contains(version))
        .map(Version::major)
        .max();

    let newest_first = catalog_set.iter().rev();
    let Some(latest_archived_major) = latest_archived_major else {
        return newest_first.take(1).map(|v| (*v).clone()).collect();
    };

    let mut seen_majors = BTreeSet::new();
    newest_first
        .filter(|version| version.major() > latest_archived_major)
        .filter(|version| seen_majors.insert(version.major()))
        .map(|v| (*v).clone())
        .collect()
}
