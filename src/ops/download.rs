//! Module download operations.
//!
//! The entry point is [`download`], which drives the full pipeline for
//! each requested module:
//!
//! - Resolving a missing version via the proxy's `@latest` endpoint
//! - Adopting the manifest's canonical path spelling
//! - Walking transitive requirements concurrently over the task queue
//! - Downloading and verifying every artifact of the resulting build list
//!
//! Requirement traversal visits every `(path, version)` pair it finds and
//! fetches only manifests; the full three-file download happens afterwards
//! for the one-version-per-path build list.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::mpsc;
use url::Url;

use crate::core::gomod;
use crate::io::download::fetch;
use crate::registry::{self, ProxyClient};
use crate::sumdb;
use crate::types::{ArtifactKind, Module};
use crate::ui::Output;

use super::context::{Context, Progress};
use super::error::DownloadError;

/// Options shared by every module named on one command line.
pub struct DownloadOptions {
    /// Module store directory.
    pub out_dir: PathBuf,
    /// Proxy host name or URL.
    pub proxy: String,
    /// Verifier key of the checksum database.
    pub sumdb_key: String,
    /// Base URL of the checksum database.
    pub sumdb_url: Url,
}

impl DownloadOptions {
    /// Options verifying against the public checksum database.
    pub fn new(out_dir: PathBuf, proxy: impl Into<String>) -> Self {
        Self {
            out_dir,
            proxy: proxy.into(),
            sumdb_key: sumdb::DEFAULT_VERIFIER_KEY.to_string(),
            sumdb_url: Url::parse(sumdb::DEFAULT_BASE_URL).expect("static url parses"),
        }
    }
}

/// Download each named module and its transitive requirements.
pub async fn download(names: &[String], opts: &DownloadOptions) -> Result<(), DownloadError> {
    if names.is_empty() {
        return Err(DownloadError::NoModules);
    }

    let output = Output::new();
    for name in names {
        download_one(name, opts, &output).await?;
    }

    Ok(())
}

async fn download_one(
    name: &str,
    opts: &DownloadOptions,
    output: &Output,
) -> Result<(), DownloadError> {
    let mut module = Module::parse(name);

    let proxy = ProxyClient::new(registry::proxy_base(&opts.proxy));
    tracing::debug!(proxy = %proxy.base(), "using module proxy");

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
    let ctx = Context::new(
        proxy,
        opts.out_dir.clone(),
        sumdb::Client::new(sumdb::MemoryOps::new(
            opts.sumdb_url.clone(),
            &opts.sumdb_key,
        )),
        progress_tx,
    );

    // Use the latest version if a specific version was not specified.
    if module.is_unresolved() {
        module.version = ctx
            .proxy
            .latest_version(&module)
            .await
            .map_err(|source| DownloadError::Latest {
                module: module.to_string(),
                source,
            })?;
        tracing::debug!(%module, "resolved latest version");
    }

    // Adopt the manifest's own capitalization of the module path. Hosts
    // resolve case-insensitively, and mixed spellings would store the same
    // module twice.
    module.path = ctx.proxy.canonical_path(&module).await?;

    output.info(&format!("Collecting requirements for {module}"));

    ctx.queue.append(visit(Arc::clone(&ctx), module));
    ctx.queue.wait().await.ok();
    if let Some(err) = ctx.queue.take_error() {
        return Err(err.into());
    }

    let deps = ctx.build_list.all();
    let total = deps.len();
    tracing::debug!(total, "collected build list");

    let reader = {
        let output = output.clone();
        tokio::spawn(async move {
            let mut next = 0;
            while let Some(result) = progress_rx.recv().await {
                next += 1;
                output.info(&format!("{next}/{total}: {}", result.module));
                if let Some(err) = result.error {
                    output.error(&err);
                }
            }
        })
    };

    for dep in deps {
        let task_ctx = Arc::clone(&ctx);
        ctx.queue.append(async move {
            let result = fetch_module(&task_ctx, &dep).await;
            let _ = task_ctx.progress.send(Progress {
                module: dep,
                error: result.as_ref().err().map(|e| format!("{e:#}")),
            });
            result
        });
    }
    ctx.queue.wait().await.ok();

    // All worker tasks are done; dropping the last context closes the
    // progress channel and lets the reader drain.
    let queue = Arc::clone(&ctx.queue);
    drop(ctx);
    let _ = reader.await;

    if queue.take_error().is_some() {
        return Err(DownloadError::Incomplete);
    }

    let prefix = if opts.out_dir.is_absolute() { "" } else { "./" };
    let suffix = if total > 1 { "s" } else { "" };
    output.success(&format!(
        "Downloaded {total} module{suffix} to {prefix}{}",
        opts.out_dir.display()
    ));

    Ok(())
}

/// Record a module in the build list and walk its requirements.
///
/// Boxed so tasks can enqueue further visits of the same shape onto the
/// queue they run on.
fn visit(ctx: Arc<Context>, m: Module) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
    Box::pin(async move {
        // Only download a module once.
        if !ctx.build_list.visit(m.clone()) {
            return Ok(());
        }

        let mod_file = m.mod_file();
        fetch(
            ctx.proxy.http(),
            &mod_file,
            ctx.proxy.base(),
            &ctx.out_dir,
            &ctx.sumdb,
        )
        .await
        .map_err(|source| DownloadError::FetchManifest {
            module: m.to_string(),
            source,
        })?;

        let path = ctx.out_dir.join(&mod_file.file_path);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| DownloadError::ReadManifest {
                path: path.display().to_string(),
                source,
            })?;

        let manifest = match gomod::parse_lax(&String::from_utf8_lossy(&bytes)) {
            Ok(manifest) => manifest,
            Err(source) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(DownloadError::ParseManifest {
                    module: m.to_string(),
                    source,
                }
                .into());
            }
        };

        for req in manifest.require {
            let dep = Module::new(req.path, req.version);
            ctx.queue.append(visit(Arc::clone(&ctx), dep));
        }

        Ok(())
    })
}

/// Download and verify the info, manifest, and zip files of one module.
async fn fetch_module(ctx: &Context, m: &Module) -> anyhow::Result<()> {
    for kind in [ArtifactKind::Info, ArtifactKind::Mod, ArtifactKind::Zip] {
        let artifact = crate::types::Artifact::new(m.clone(), kind);
        fetch(
            ctx.proxy.http(),
            &artifact,
            ctx.proxy.base(),
            &ctx.out_dir,
            &ctx.sumdb,
        )
        .await
        .with_context(|| format!("failed to download module {} file", kind.name()))?;
    }

    Ok(())
}

