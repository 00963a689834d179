use std::path::PathBuf;

use thiserror::Error;

use crate::config::Mode;
use crate::pipeline::runner::CommandError;
use crate::tier::error::TierError;
use crate::version::error::CatalogError;
use crate::version::types::Version;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No source found for {0}")]
    MissingSource(Version),

    #[error("Container {0} already exists")]
    ContainerNameCollision(String),

    #[error("{0}")]
    EnvironmentPrecondition(String),

    #[error("USB directory not found: {0:?}")]
    BridgeNotMounted(PathBuf),

    #[error("No chrome version history at {0:?}")]
    NoVersionHistory(PathBuf),

    #[error("--{action} is only available in {required:?} mode")]
    UnsupportedInMode {
        action: &'static str,
        required: Mode,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Tier(#[from] TierError),

    #[error("Filesystem error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Io { path, source }
    }
}
