//! Client for the three-file-per-version proxy protocol.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::core::gomod;
use crate::io::http::{self, HttpError};
use crate::types::Module;
use crate::core::version;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("cannot build proxy url for {0}")]
    Url(String),

    #[error("failed to parse latest-version metadata for {path}: {reason}")]
    BadLatest { path: String, reason: String },

    #[error("failed to find version {version} for {path}. Proxy list contained no tagged versions.")]
    NoVersions { path: String, version: String },

    #[error("failed to find version {version} for {path}\nAvailable versions:\n  {}", versions.join("\n  "))]
    VersionNotFound {
        path: String,
        version: String,
        versions: Vec<String>,
    },

    #[error("failed to parse manifest for {module}: {source}")]
    Manifest {
        module: String,
        #[source]
        source: gomod::ParseError,
    },

    #[error("manifest for {0} has no module directive")]
    MissingModulePath(String),
}

/// The JSON body of an `@latest` response.
#[derive(Debug, Deserialize)]
struct LatestInfo {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Time", default)]
    #[allow(dead_code)]
    time: Option<String>,
}

/// Normalize a user-supplied proxy specifier into a base URL.
///
/// Accepts full `http`/`https` URLs as-is. Anything else is treated as a
/// bare host name, after stripping a scheme marker if one is present.
/// A host that still fails to parse falls back to the public proxy.
pub fn proxy_base(proxy: &str) -> Url {
    if let Ok(url) = Url::parse(proxy) {
        if matches!(url.scheme(), "http" | "https") {
            return url;
        }
    }

    let host = proxy
        .split_once("//")
        .map(|(_, rest)| rest)
        .unwrap_or(proxy);

    Url::parse(&format!("https://{host}"))
        .unwrap_or_else(|_| Url::parse("https://proxy.golang.org").expect("static url parses"))
}

/// HTTP client bound to one proxy base URL.
pub struct ProxyClient {
    base: Url,
    http: reqwest::Client,
}

impl ProxyClient {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn join(&self, path: &str) -> Result<Url, RegistryError> {
        self.base
            .join(path)
            .map_err(|_| RegistryError::Url(path.to_string()))
    }

    /// Resolve the most recent version of a module via `@latest`.
    pub async fn latest_version(&self, m: &Module) -> Result<String, RegistryError> {
        let url = self.join(&m.latest_path())?;
        let body = http::get_bytes(&self.http, url).await?;

        let info: LatestInfo =
            serde_json::from_slice(&body).map_err(|err| RegistryError::BadLatest {
                path: m.path.clone(),
                reason: err.to_string(),
            })?;

        Ok(info.version)
    }

    /// List a module's tagged versions, newest first.
    pub async fn versions(&self, m: &Module) -> Result<Vec<String>, RegistryError> {
        let url = self.join(&m.list_path())?;
        let body = http::get_bytes(&self.http, url).await?;
        let text = String::from_utf8_lossy(&body);

        let mut versions: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        versions.sort_by(|a, b| version::compare(b, a));

        Ok(versions)
    }

    /// Fetch the module's manifest and return the authoritative path
    /// spelling from its `module` directive.
    ///
    /// Hosts such as github.com resolve paths case-insensitively, so the
    /// user's spelling may differ from the module's own; adopting the
    /// manifest's avoids case-only duplicates in the store. A missing
    /// manifest turns into an error listing the available versions.
    pub async fn canonical_path(&self, m: &Module) -> Result<String, RegistryError> {
        let url = self.join(&m.mod_file().proxy_path)?;

        let body = match http::get_bytes(&self.http, url).await {
            Ok(body) => body,
            Err(_) => {
                let versions = self.versions(m).await?;
                if versions.is_empty() {
                    return Err(RegistryError::NoVersions {
                        path: m.path.clone(),
                        version: m.version.clone(),
                    });
                }
                return Err(RegistryError::VersionNotFound {
                    path: m.path.clone(),
                    version: m.version.clone(),
                    versions,
                });
            }
        };

        let text = String::from_utf8_lossy(&body);
        let parsed = gomod::parse_lax(&text).map_err(|source| RegistryError::Manifest {
            module: m.to_string(),
            source,
        })?;

        parsed
            .module
            .ok_or_else(|| RegistryError::MissingModulePath(m.to_string()))
    }
}
