//! Persisted snapshot of every version ever released on the stable channel

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::version::error::CatalogError;
use crate::version::registry::ReleaseRegistry;
use crate::version::types::{Channel, Version};

/// Stable release history stored as a JSON array of version strings.
///
/// Only the stable channel is persisted. Callers that need the newest
/// beta/dev/canary query the registry directly with [`latest_live`].
pub struct VersionCatalog {
    path: PathBuf,
}

impl VersionCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the snapshot back, sorted ascending.
    pub fn load(&self) -> Result<Vec<Version>, CatalogError> {
        let content = fs::read_to_string(&self.path).map_err(CatalogError::io(&self.path))?;
        let mut versions: Vec<Version> =
            serde_json::from_str(&content).map_err(CatalogError::json(&self.path))?;
        versions.sort();
        versions.dedup();

        debug!("Loaded {} versions from {:?}", versions.len(), self.path);
        Ok(versions)
    }

    pub fn load_set(&self) -> Result<BTreeSet<Version>, CatalogError> {
        Ok(self.load()?.into_iter().collect())
    }

    /// Newest stable version in the snapshot.
    pub fn latest(&self) -> Result<Version, CatalogError> {
        self.load()?
            .pop()
            .ok_or_else(|| CatalogError::Empty(Channel::Stable.to_string()))
    }

    pub fn save(&self, versions: &[Version]) -> Result<(), CatalogError> {
        let json = serde_json::to_string(versions).map_err(CatalogError::json(&self.path))?;
        fs::write(&self.path, json).map_err(CatalogError::io(&self.path))
    }

    /// Fetches the full stable history and replaces the snapshot with it.
    pub async fn refresh(
        &self,
        registry: &dyn ReleaseRegistry,
    ) -> Result<Vec<Version>, CatalogError> {
        let versions = registry.fetch_versions(Channel::Stable, true).await?;
        self.save(&versions)?;

        info!(
            "Saved {} stable versions to {:?}",
            versions.len(),
            self.path
        );
        Ok(versions)
    }
}

/// Newest currently-live release on `channel`, fetched fresh every call.
pub async fn latest_live(
    registry: &dyn ReleaseRegistry,
    channel: Channel,
) -> Result<Version, CatalogError> {
    registry
        .fetch_versions(channel, false)
        .await?
        .pop()
        .ok_or_else(|| CatalogError::Empty(channel.to_string()))
}
