//! Domain-specific errors for download operations

use thiserror::Error;

use crate::core::gomod::ParseError;
use crate::io::download::FetchError;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("you must provide one or more modules to download")]
    NoModules,

    #[error("failed to get latest version for module {module}: {source}")]
    Latest {
        module: String,
        #[source]
        source: RegistryError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to download {module} manifest: {source}")]
    FetchManifest {
        module: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to read file {path}: {source}")]
    ReadManifest {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest for {module}: {source}")]
    ParseManifest {
        module: String,
        #[source]
        source: ParseError,
    },

    #[error("one or more modules failed to download")]
    Incomplete,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DownloadError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DownloadError>() {
            Ok(err) => err,
            Err(err) => Self::Other(format!("{err:#}")),
        }
    }
}
