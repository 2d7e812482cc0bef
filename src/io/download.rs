//! Artifact download into the local store.
//!
//! The destination file is created with exclusive-create semantics: the
//! first writer wins and everyone else treats the existing file as already
//! fetched. Every failure after creation removes the partial file, so an
//! artifact on disk is always a complete, verified copy.

use std::io::ErrorKind;
use std::path::Path;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::io::http::{self, HttpError};
use crate::sumdb::{self, SumDbError};
use crate::types::Artifact;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot build proxy url for {0}")]
    Url(String),

    #[error("failed to create output directory for {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create destination file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("could not download {url}: {source}")]
    Write {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("error closing {path}: {source}")]
    Close {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error validating {path}: {source}")]
    Verify {
        path: String,
        #[source]
        source: SumDbError,
    },
}

/// Download one artifact from the proxy into `out_dir` and verify it.
///
/// Returns success without touching the network when the destination file
/// already exists.
pub async fn fetch(
    http: &reqwest::Client,
    artifact: &Artifact,
    proxy: &Url,
    out_dir: &Path,
    db: &sumdb::Client,
) -> Result<(), FetchError> {
    let dest = out_dir.join(&artifact.file_path);
    let url = proxy
        .join(&artifact.proxy_path)
        .map_err(|_| FetchError::Url(artifact.proxy_path.clone()))?;

    if let Some(parent) = dest.parent() {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder
            .create(parent)
            .await
            .map_err(|source| FetchError::CreateDir {
                path: dest.display().to_string(),
                source,
            })?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = match options.open(&dest).await {
        Ok(file) => file,
        // Somebody already fetched this artifact; the store keeps only
        // complete files, so there is nothing left to do.
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(()),
        Err(source) => {
            return Err(FetchError::Create {
                path: dest.display().to_string(),
                source,
            })
        }
    };

    let response = match http::get(http, url.clone()).await {
        Ok(response) => response,
        Err(err) => {
            remove_partial(&mut file, &dest).await;
            return Err(err.into());
        }
    };

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(source) => {
                remove_partial(&mut file, &dest).await;
                return Err(FetchError::Write {
                    url,
                    source: std::io::Error::other(source),
                });
            }
        };
        if let Err(source) = file.write_all(&chunk).await {
            remove_partial(&mut file, &dest).await;
            return Err(FetchError::Write { url, source });
        }
    }

    if let Err(source) = file.flush().await {
        remove_partial(&mut file, &dest).await;
        return Err(FetchError::Close {
            path: dest.display().to_string(),
            source,
        });
    }
    drop(file);

    if let Err(source) = sumdb::verify::check(artifact, out_dir, db).await {
        let _ = tokio::fs::remove_file(&dest).await;
        return Err(FetchError::Verify {
            path: dest.display().to_string(),
            source,
        });
    }

    Ok(())
}

/// Best-effort cleanup of a partially written destination.
async fn remove_partial(file: &mut tokio::fs::File, dest: &Path) {
    let _ = file.flush().await;
    let _ = tokio::fs::remove_file(dest).await;
}
