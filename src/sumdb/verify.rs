//! Artifact verification against the checksum database.

use std::path::Path;

use crate::types::{Artifact, ArtifactKind};

use super::{dirhash, Client, SumDbError};

/// Verify a downloaded artifact's canonical hash.
///
/// Manifests hash as a one-file directory under the version's `/go.mod`
/// hash name; archives hash over their zip entries under the bare version.
/// Info files carry no checksum and always pass.
pub async fn check(artifact: &Artifact, out_dir: &Path, db: &Client) -> Result<(), SumDbError> {
    let file_path = out_dir.join(&artifact.file_path);

    let (hash_version, hash) = match artifact.kind {
        ArtifactKind::Info => return Ok(()),
        ArtifactKind::Mod => {
            let content = tokio::fs::read(&file_path).await?;
            (
                format!("{}/go.mod", artifact.module.version),
                dirhash::hash_go_mod(&content),
            )
        }
        ArtifactKind::Zip => {
            let hash = tokio::task::spawn_blocking(move || dirhash::hash_zip(&file_path))
                .await
                .map_err(|e| SumDbError::Io(std::io::Error::other(e)))??;
            (artifact.module.version.clone(), hash)
        }
    };

    let candidate = format!("{} {} {}", artifact.module.path, hash_version, hash);
    let known = db.lookup(&artifact.module.path, &hash_version).await?;

    if known.iter().any(|line| line == &candidate) {
        return Ok(());
    }

    Err(SumDbError::HashMismatch { candidate, known })
}
