//! modmirror - offline Go module mirror CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use modmirror::ops::{self, DownloadOptions};
use url::Url;

#[derive(Parser)]
#[command(name = "modmirror")]
#[command(author, version, about = "Mirror Go modules into a local module store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download modules and collect them into a module set
    Download {
        /// Module name(s), optionally with version: path or path@v1.0.0
        #[arg(required = true)]
        modules: Vec<String>,
        /// Directory where modules will be stored
        #[arg(long, default_value = "modules")]
        outdir: PathBuf,
        /// Hostname of the proxy to download modules from
        #[arg(long, default_value_t = default_proxy())]
        proxy: String,
    },
}

/// First entry of the ambient GOPROXY list, or the public proxy.
fn default_proxy() -> String {
    match std::env::var("GOPROXY") {
        Ok(value) if !value.trim().is_empty() => value
            .split(',')
            .next()
            .unwrap_or("proxy.golang.org")
            .trim()
            .to_string(),
        _ => "proxy.golang.org".to_string(),
    }
}

/// Apply an ambient `GOSUMDB` override of the form `verifier-key [url]`.
fn apply_sumdb_env(opts: &mut DownloadOptions) {
    let Ok(spec) = std::env::var("GOSUMDB") else {
        return;
    };

    let mut parts = spec.split_whitespace();
    if let Some(key) = parts.next() {
        if key.contains('+') {
            opts.sumdb_key = key.to_string();
        }
    }
    if let Some(url) = parts.next() {
        if let Ok(url) = Url::parse(url) {
            opts.sumdb_url = url;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            modules,
            outdir,
            proxy,
        } => {
            let mut opts = DownloadOptions::new(outdir, proxy);
            apply_sumdb_env(&mut opts);
            ops::download(&modules, &opts).await?;
        }
    }

    Ok(())
}
