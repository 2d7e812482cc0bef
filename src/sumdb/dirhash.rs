//! Canonical content hashes.
//!
//! The checksum database records the "H1" directory hash: per file, the
//! SHA-256 of its content rendered as `"<hex>  <name>\n"`; the lines are
//! sorted by file name, concatenated, hashed again with SHA-256, and the
//! result is `"h1:" + base64(digest)`. A manifest is hashed as a directory
//! holding a single `go.mod` entry; a source archive is hashed over its
//! zip entries.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use super::SumDbError;

/// H1 hash of a manifest's bytes, as a directory of one `go.mod` file.
pub fn hash_go_mod(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    h1(vec![(hex::encode(digest), "go.mod".to_string())])
}

/// H1 hash over every file entry of a zip archive.
pub fn hash_zip(path: &Path) -> Result<String, SumDbError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut hasher = Sha256::new();
        std::io::copy(&mut entry, &mut hasher)?;
        entries.push((hex::encode(hasher.finalize()), entry.name().to_string()));
    }

    Ok(h1(entries))
}

fn h1(mut entries: Vec<(String, String)>) -> String {
    entries.sort_by(|a, b| a.1.cmp(&b.1));

    let mut hasher = Sha256::new();
    for (hash, name) in &entries {
        hasher.update(format!("{hash}  {name}\n").as_bytes());
    }
    format!("h1:{}", BASE64.encode(hasher.finalize()))
}
