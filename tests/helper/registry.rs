//! Registry test utilities

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use chromium_ferry::version::error::RegistryError;
use chromium_ferry::version::registry::ReleaseRegistry;
use chromium_ferry::version::types::{Channel, Version, sorted_versions};

/// In-memory release registry
#[derive(Default)]
pub struct FakeRegistry {
    history: HashMap<Channel, Vec<String>>,
    live: HashMap<Channel, Vec<String>>,
    calls: Mutex<Vec<(Channel, bool)>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full release history of `channel`.
    pub fn with_history(mut self, channel: Channel, versions: &[&str]) -> Self {
        self.history
            .insert(channel, versions.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Releases of `channel` that are currently live.
    pub fn with_live(mut self, channel: Channel, versions: &[&str]) -> Self {
        self.live
            .insert(channel, versions.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<(Channel, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseRegistry for FakeRegistry {
    async fn fetch_versions(
        &self,
        channel: Channel,
        include_historical: bool,
    ) -> Result<Vec<Version>, RegistryError> {
        self.calls
            .lock()
            .unwrap()
            .push((channel, include_historical));

        let source = if include_historical {
            &self.history
        } else {
            &self.live
        };
        match source.get(&channel) {
            Some(versions) if !versions.is_empty() => Ok(sorted_versions(versions)),
            _ => Err(RegistryError::InvalidResponse(format!("no releases for {channel}"))),
        }
    }
}
