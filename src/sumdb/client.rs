//! Lookup client for the checksum database.
//!
//! The client talks to the log through five storage callbacks so that the
//! backing (network, key material, memoization) stays swappable. The
//! shipped backing is [`MemoryOps`]: HTTP for remote reads plus in-memory
//! config and cache maps whose access is serialized through one lock.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use crate::core::escape;
use crate::io::http;

use super::note::{self, VerifierKey};
use super::SumDbError;

/// Storage and transport callbacks of the lookup client.
#[async_trait]
pub trait ClientOps: Send + Sync {
    /// Fetch a path relative to the log's base URL.
    async fn read_remote(&self, path: &str) -> Result<Vec<u8>, SumDbError>;

    /// Read durable key material; missing keys yield empty bytes.
    async fn read_config(&self, file: &str) -> Result<Vec<u8>, SumDbError>;

    /// Compare-and-swap durable key material. Fails with
    /// [`SumDbError::WriteConflict`] when the stored value is not `old`.
    async fn write_config(&self, file: &str, old: &[u8], new: &[u8]) -> Result<(), SumDbError>;

    /// Read a memoized value; missing keys yield [`SumDbError::NotFound`].
    async fn read_cache(&self, file: &str) -> Result<Vec<u8>, SumDbError>;

    /// Store a memoized value unconditionally.
    async fn write_cache(&self, file: &str, value: &[u8]);
}

#[derive(Default)]
struct MemoryState {
    config: HashMap<String, Vec<u8>>,
    cache: HashMap<String, Vec<u8>>,
}

/// In-memory [`ClientOps`] backing rooted at a log URL.
pub struct MemoryOps {
    base: Url,
    http: reqwest::Client,
    state: Mutex<MemoryState>,
}

impl MemoryOps {
    /// Build a backing for the log at `base`, trusting `verifier_key`.
    pub fn new(base: Url, verifier_key: &str) -> Self {
        let mut state = MemoryState::default();
        state
            .config
            .insert("key".to_string(), verifier_key.as_bytes().to_vec());

        Self {
            base,
            http: reqwest::Client::new(),
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl ClientOps for MemoryOps {
    async fn read_remote(&self, path: &str) -> Result<Vec<u8>, SumDbError> {
        let url = self
            .base
            .join(path)
            .map_err(|_| SumDbError::MalformedResponse(format!("bad remote path {path}")))?;
        Ok(http::get_bytes(&self.http, url).await?)
    }

    async fn read_config(&self, file: &str) -> Result<Vec<u8>, SumDbError> {
        let state = self.state.lock().await;
        Ok(state.config.get(file).cloned().unwrap_or_default())
    }

    async fn write_config(&self, file: &str, old: &[u8], new: &[u8]) -> Result<(), SumDbError> {
        let mut state = self.state.lock().await;
        if let Some(current) = state.config.get(file) {
            if current != old {
                return Err(SumDbError::WriteConflict(file.to_string()));
            }
        }
        state.config.insert(file.to_string(), new.to_vec());
        Ok(())
    }

    async fn read_cache(&self, file: &str) -> Result<Vec<u8>, SumDbError> {
        let state = self.state.lock().await;
        state
            .cache
            .get(file)
            .cloned()
            .ok_or_else(|| SumDbError::NotFound(file.to_string()))
    }

    async fn write_cache(&self, file: &str, value: &[u8]) {
        let mut state = self.state.lock().await;
        state.cache.insert(file.to_string(), value.to_vec());
    }
}

/// Checksum database lookup client.
pub struct Client {
    ops: Box<dyn ClientOps>,
}

impl Client {
    pub fn new(ops: impl ClientOps + 'static) -> Self {
        Self {
            ops: Box::new(ops),
        }
    }

    /// Client for the public checksum database rooted at `base`.
    pub fn public(base: Url) -> Self {
        Self::new(MemoryOps::new(base, super::DEFAULT_VERIFIER_KEY))
    }

    /// Return the authoritative record lines for a module version.
    ///
    /// `version` may carry a `/go.mod` suffix; the manifest and the archive
    /// hash live in the same record, so the suffix is trimmed for the
    /// lookup itself. Responses are cached, and every response (cached or
    /// fresh) must carry a tree head signed by the configured key.
    pub async fn lookup(&self, path: &str, version: &str) -> Result<Vec<String>, SumDbError> {
        let record_version = version.strip_suffix("/go.mod").unwrap_or(version);
        let file = format!(
            "lookup/{}@{}",
            escape::escape(path),
            escape::escape(record_version)
        );

        let body = match self.ops.read_cache(&file).await {
            Ok(cached) => cached,
            Err(SumDbError::NotFound(_)) => {
                let fetched = self.ops.read_remote(&file).await?;
                self.ops.write_cache(&file, &fetched).await;
                fetched
            }
            Err(err) => return Err(err),
        };

        let (lines, note_msg) = split_response(&body)?;

        let key_bytes = self.ops.read_config("key").await?;
        let key_str = std::str::from_utf8(&key_bytes)
            .map_err(|_| SumDbError::InvalidVerifierKey("non-UTF-8 config".to_string()))?;
        let key = VerifierKey::parse(key_str)?;

        let tree = note::open(note_msg.as_bytes(), &key)?;
        self.record_latest(&tree).await?;

        Ok(lines)
    }

    /// Keep the newest verified tree head in config under `"latest"`.
    async fn record_latest(&self, tree: &str) -> Result<(), SumDbError> {
        let Some(new_size) = tree_size(tree) else {
            return Ok(());
        };

        let old = self.ops.read_config("latest").await?;
        let old_size = std::str::from_utf8(&old).ok().and_then(tree_size);
        if old_size.is_some_and(|o| o >= new_size) {
            return Ok(());
        }

        match self.ops.write_config("latest", &old, tree.as_bytes()).await {
            Ok(()) => Ok(()),
            // A concurrent lookup advanced the head first; theirs is as
            // verified as ours.
            Err(SumDbError::WriteConflict(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Split a lookup response into its record lines and the signed tree head.
///
/// The body is the record id line, the `path version hash` lines, a blank
/// line, then the signed note.
fn split_response(body: &[u8]) -> Result<(Vec<String>, String), SumDbError> {
    let body = std::str::from_utf8(body)
        .map_err(|_| SumDbError::MalformedResponse("non-UTF-8 body".to_string()))?;

    let split = body
        .find("\n\n")
        .ok_or_else(|| SumDbError::MalformedResponse("missing tree head".to_string()))?;
    let (head, note_msg) = (&body[..split], &body[split + 2..]);

    let mut lines = head.lines();
    let id = lines
        .next()
        .ok_or_else(|| SumDbError::MalformedResponse("empty record".to_string()))?;
    if id.trim().parse::<u64>().is_err() {
        return Err(SumDbError::MalformedResponse(format!(
            "bad record id {id:?}"
        )));
    }

    let data: Vec<String> = lines
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if data.is_empty() {
        return Err(SumDbError::MalformedResponse("record has no lines".to_string()));
    }

    Ok((data, note_msg.to_string()))
}

fn tree_size(tree: &str) -> Option<u64> {
    tree.lines().nth(1)?.trim().parse().ok()
}
