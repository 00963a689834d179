//! Chrome version history API implementation

use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::ReleaseRegistry;
use crate::version::types::{Channel, Version, sorted_versions};

/// Default base URL for the version history API
pub const DEFAULT_BASE_URL: &str = "https://versionhistory.googleapis.com";

/// Releases response from the version history API
#[derive(Debug, Deserialize)]
struct ReleasesResponse {
    releases: Option<Vec<Release>>,
}

#[derive(Debug, Deserialize)]
struct Release {
    version: Option<String>,
}

/// Registry implementation for the Chrome version history API (Android platform)
pub struct VersionHistoryRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl VersionHistoryRegistry {
    /// Creates a new VersionHistoryRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("chromium-ferry")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn releases_path(channel: Channel) -> String {
        format!("/v1/chrome/platforms/android/channels/{channel}/versions/all/releases")
    }
}

impl Default for VersionHistoryRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl ReleaseRegistry for VersionHistoryRegistry {
    async fn fetch_versions(
        &self,
        channel: Channel,
        include_historical: bool,
    ) -> Result<Vec<Version>, RegistryError> {
        let mut url = format!("{}{}", self.base_url, Self::releases_path(channel));
        if !include_historical {
            url.push_str("?filter=endtime=none");
        }

        debug!("Fetching {} releases from {}", channel, url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("version history api returned status {}: {}", status, url);
            return Err(RegistryError::UnexpectedStatus(status.as_u16()));
        }

        let body: ReleasesResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse version history response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let releases = body
            .releases
            .filter(|releases| !releases.is_empty())
            .ok_or_else(|| RegistryError::InvalidResponse("\"releases\" not found".into()))?;

        let raw = releases
            .into_iter()
            .map(|release| {
                release
                    .version
                    .ok_or_else(|| RegistryError::InvalidResponse("\"version\" not found".into()))
            })
            .collect::<Result<Vec<String>, _>>()?;

        if let Some(bad) = raw.iter().find(|v| v.parse::<Version>().is_err()) {
            return Err(RegistryError::InvalidResponse(format!("malformed version {bad:?}")));
        }

        Ok(sorted_versions(raw))
    }
}
