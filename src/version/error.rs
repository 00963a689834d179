use std::path::PathBuf;

use thiserror::Error;

/// Text that is not a four-component Chromium version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a four-component version: {0:?}")]
pub struct InvalidVersion(pub String);

/// Failure talking to the remote release-metadata service.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Version history api returned status code {0}")]
    UnexpectedStatus(u16),

    #[error("Version history response error: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to access version snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed version snapshot {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No versions published on the {0} channel")]
    Empty(String),
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CatalogError::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| CatalogError::Json { path, source }
    }
}
