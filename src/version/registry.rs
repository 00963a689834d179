//! Registry trait for fetching published Chromium releases

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::{Channel, Version};

/// Trait for querying the remote release-metadata service
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseRegistry: Send + Sync {
    /// Fetches the versions released on a channel
    ///
    /// # Arguments
    /// * `channel` - Release track to query
    /// * `include_historical` - When false, only releases that are still live
    ///   (no end time) are returned
    ///
    /// # Returns
    /// * `Ok(Vec<Version>)` - Distinct versions, oldest first
    /// * `Err(RegistryError)` - If the request fails or the body is malformed
    async fn fetch_versions(
        &self,
        channel: Channel,
        include_historical: bool,
    ) -> Result<Vec<Version>, RegistryError>;
}
