use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TierError {
    #[error("Filesystem error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl TierError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| TierError::Io { path, source }
    }
}
