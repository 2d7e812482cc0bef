//! End-to-end download tests against a mock proxy and checksum database.

use std::io::Write as _;
use std::path::Path;

use ed25519_dalek::SigningKey;
use mockito::ServerGuard;
use url::Url;

use modmirror::core::escape::escape;
use modmirror::ops::{download, DownloadOptions};
use modmirror::sumdb::{self, dirhash, note, MemoryOps};
use modmirror::types::Module;

const LOG_NAME: &str = "test.log";

/// A fake module proxy plus checksum database.
struct FakeRegistry {
    proxy: ServerGuard,
    sumdb: ServerGuard,
    signing_key: SigningKey,
    scratch: tempfile::TempDir,
}

impl FakeRegistry {
    async fn new() -> Self {
        Self {
            proxy: mockito::Server::new_async().await,
            sumdb: mockito::Server::new_async().await,
            signing_key: SigningKey::from_bytes(&[11u8; 32]),
            scratch: tempfile::tempdir().expect("failed to create scratch dir"),
        }
    }

    fn options(&self, out_dir: &Path) -> DownloadOptions {
        let mut opts = DownloadOptions::new(out_dir.to_path_buf(), self.proxy.url());
        opts.sumdb_key = note::verifier_key_string(LOG_NAME, &self.signing_key);
        opts.sumdb_url = Url::parse(&self.sumdb.url()).unwrap();
        opts
    }

    /// Serve all three artifacts of a module plus its checksum record.
    async fn add_module(&mut self, path: &str, version: &str, gomod: &str) {
        let zip = zip_bytes(&[
            (format!("{path}@{version}/go.mod"), gomod.as_bytes()),
            (format!("{path}@{version}/main.go"), b"package main\n"),
        ]);
        self.add_module_artifacts(path, version, gomod, &zip).await;
        let zip_hash = self.hash_zip_bytes(&zip);
        self.add_record(path, version, gomod, &zip_hash).await;
    }

    /// Serve only the manifest and its checksum record, for modules that
    /// are visited during traversal but lose version selection.
    async fn add_manifest_only(&mut self, path: &str, version: &str, gomod: &str) {
        let esc = escape(path);
        self.proxy
            .mock("GET", format!("/{esc}/@v/{version}.mod").as_str())
            .with_body(gomod)
            .create_async()
            .await;
        // The record still needs a zip line; any value works since the
        // archive is never fetched.
        self.add_record(path, version, gomod, "h1:unfetched=").await;
    }

    async fn add_module_artifacts(&mut self, path: &str, version: &str, gomod: &str, zip: &[u8]) {
        let esc = escape(path);
        self.proxy
            .mock("GET", format!("/{esc}/@v/{version}.info").as_str())
            .with_body(format!(
                r#"{{"Version":"{version}","Time":"2024-01-02T03:04:05Z"}}"#
            ))
            .create_async()
            .await;
        self.proxy
            .mock("GET", format!("/{esc}/@v/{version}.mod").as_str())
            .with_body(gomod)
            .create_async()
            .await;
        self.proxy
            .mock("GET", format!("/{esc}/@v/{version}.zip").as_str())
            .with_body(zip)
            .create_async()
            .await;
    }

    async fn add_record(&mut self, path: &str, version: &str, gomod: &str, zip_hash: &str) {
        let mod_hash = dirhash::hash_go_mod(gomod.as_bytes());
        let body = self.record_body(&format!(
            "{path} {version} {zip_hash}\n{path} {version}/go.mod {mod_hash}"
        ));
        self.sumdb
            .mock(
                "GET",
                format!("/lookup/{}@{version}", escape(path)).as_str(),
            )
            .with_body(body)
            .create_async()
            .await;
    }

    fn record_body(&self, lines: &str) -> String {
        let tree = "go.sum database tree\n128\ndGVzdCB0cmVlIGhlYWQ=\n";
        format!(
            "1\n{lines}\n\n{}",
            note::sign(tree, LOG_NAME, &self.signing_key)
        )
    }

    fn hash_zip_bytes(&self, zip: &[u8]) -> String {
        let path = self.scratch.path().join("hash-input.zip");
        std::fs::write(&path, zip).unwrap();
        dirhash::hash_zip(&path).unwrap()
    }
}

fn zip_bytes(entries: &[(String, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn downloads_single_module_with_no_requirements() {
    let mut registry = FakeRegistry::new().await;
    registry
        .add_module("example.com/foo", "v1.2.3", "module example.com/foo\n")
        .await;

    let out = tempfile::tempdir().unwrap();
    download(
        &["example.com/foo@v1.2.3".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap();

    let module_dir = out.path().join("example.com/foo");
    assert!(module_dir.join("v1.2.3.info").exists());
    assert!(module_dir.join("v1.2.3.mod").exists());
    assert!(module_dir.join("v1.2.3.zip").exists());
    assert_eq!(
        std::fs::read_to_string(module_dir.join("v1.2.3.mod")).unwrap(),
        "module example.com/foo\n"
    );
}

#[tokio::test]
async fn resolves_latest_version_when_unspecified() {
    let mut registry = FakeRegistry::new().await;
    registry
        .proxy
        .mock("GET", "/example.com/foo/@latest")
        .with_body(r#"{"Version":"v1.1.0","Time":"2024-01-02T03:04:05Z"}"#)
        .create_async()
        .await;
    registry
        .add_module("example.com/foo", "v1.1.0", "module example.com/foo\n")
        .await;

    let out = tempfile::tempdir().unwrap();
    download(
        &["example.com/foo".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap();

    assert!(out.path().join("example.com/foo/v1.1.0.zip").exists());
}

#[tokio::test]
async fn diamond_requirements_keep_only_the_highest_version() {
    let mut registry = FakeRegistry::new().await;
    registry
        .add_module(
            "example.com/a",
            "v1.0.0",
            "module example.com/a\n\nrequire (\n\texample.com/b v1.0.0\n\texample.com/c v1.0.0\n)\n",
        )
        .await;
    registry
        .add_module(
            "example.com/b",
            "v1.0.0",
            "module example.com/b\n\nrequire example.com/d v1.0.0\n",
        )
        .await;
    registry
        .add_module(
            "example.com/c",
            "v1.0.0",
            "module example.com/c\n\nrequire example.com/d v1.1.0\n",
        )
        .await;
    registry
        .add_manifest_only("example.com/d", "v1.0.0", "module example.com/d\n")
        .await;
    registry
        .add_module("example.com/d", "v1.1.0", "module example.com/d\n")
        .await;

    let out = tempfile::tempdir().unwrap();
    download(
        &["example.com/a@v1.0.0".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap();

    let d_dir = out.path().join("example.com/d");
    // The low version was visited, so its manifest is in the store.
    assert!(d_dir.join("v1.0.0.mod").exists());
    // Only the winning version got the full artifact download.
    assert!(!d_dir.join("v1.0.0.zip").exists());
    assert!(!d_dir.join("v1.0.0.info").exists());
    assert!(d_dir.join("v1.1.0.zip").exists());
    assert!(d_dir.join("v1.1.0.info").exists());

    for module in ["a", "b", "c"] {
        assert!(out
            .path()
            .join(format!("example.com/{module}/v1.0.0.zip"))
            .exists());
    }
}

#[tokio::test]
async fn adopts_canonical_path_spelling_from_manifest() {
    let mut registry = FakeRegistry::new().await;
    // The module's own spelling keeps an uppercase F.
    registry
        .add_module("example.com/Foo", "v1.0.0", "module example.com/Foo\n")
        .await;
    // The user's spelling resolves on the proxy too; its manifest carries
    // the canonical path.
    registry
        .proxy
        .mock("GET", "/!example.com/!foo/@v/v1.0.0.mod")
        .with_body("module example.com/Foo\n")
        .create_async()
        .await;

    let out = tempfile::tempdir().unwrap();
    download(
        &["Example.com/Foo@v1.0.0".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap();

    let module_dir = out.path().join("example.com/!foo");
    assert!(module_dir.join("v1.0.0.zip").exists());
    // Nothing was stored under the user's spelling.
    assert!(!out.path().join("!example.com").exists());
}

#[tokio::test]
async fn missing_version_reports_the_available_ones() {
    let mut registry = FakeRegistry::new().await;
    registry
        .proxy
        .mock("GET", "/example.com/foo/@v/v9.9.9.mod")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;
    registry
        .proxy
        .mock("GET", "/example.com/foo/@v/list")
        .with_body("v1.0.0\nv1.1.0\n")
        .create_async()
        .await;

    let out = tempfile::tempdir().unwrap();
    let err = download(
        &["example.com/foo@v9.9.9".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("failed to find version v9.9.9 for example.com/foo"));
    assert!(msg.contains("Available versions:"));
    assert!(msg.find("v1.1.0").unwrap() < msg.find("v1.0.0").unwrap());
}

#[tokio::test]
async fn tampered_archive_fails_and_is_removed() {
    let mut registry = FakeRegistry::new().await;

    let gomod = "module example.com/foo\n";
    let served_zip = zip_bytes(&[(
        "example.com/foo@v1.0.0/go.mod".to_string(),
        b"module example.com/evil\n".as_slice(),
    )]);
    registry
        .add_module_artifacts("example.com/foo", "v1.0.0", gomod, &served_zip)
        .await;
    // The record carries the hash of the genuine archive, not the served one.
    let genuine_zip = zip_bytes(&[(
        "example.com/foo@v1.0.0/go.mod".to_string(),
        gomod.as_bytes(),
    )]);
    let genuine_hash = registry.hash_zip_bytes(&genuine_zip);
    registry
        .add_record("example.com/foo", "v1.0.0", gomod, &genuine_hash)
        .await;

    let out = tempfile::tempdir().unwrap();
    let err = download(
        &["example.com/foo@v1.0.0".to_string()],
        &registry.options(out.path()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "one or more modules failed to download");

    let module_dir = out.path().join("example.com/foo");
    // The manifest verified fine; the tampered archive was removed.
    assert!(module_dir.join("v1.0.0.mod").exists());
    assert!(!module_dir.join("v1.0.0.zip").exists());
}

#[tokio::test]
async fn racing_downloads_of_one_artifact_produce_one_file() {
    let mut registry = FakeRegistry::new().await;
    registry
        .proxy
        .mock("GET", "/example.com/foo/@v/v1.0.0.info")
        .with_body(r#"{"Version":"v1.0.0"}"#)
        .create_async()
        .await;

    let out = tempfile::tempdir().unwrap();
    let proxy_url = Url::parse(&registry.proxy.url()).unwrap();
    let http = reqwest::Client::new();
    let db = sumdb::Client::new(MemoryOps::new(
        Url::parse(&registry.sumdb.url()).unwrap(),
        &note::verifier_key_string(LOG_NAME, &registry.signing_key),
    ));

    let artifact = Module::new("example.com/foo", "v1.0.0").info_file();
    let (a, b) = tokio::join!(
        modmirror::io::download::fetch(&http, &artifact, &proxy_url, out.path(), &db),
        modmirror::io::download::fetch(&http, &artifact, &proxy_url, out.path(), &db),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(
        std::fs::read_to_string(out.path().join("example.com/foo/v1.0.0.info")).unwrap(),
        r#"{"Version":"v1.0.0"}"#
    );
}

#[tokio::test]
async fn second_run_skips_existing_artifacts() {
    let mut registry = FakeRegistry::new().await;
    registry
        .add_module("example.com/foo", "v1.2.3", "module example.com/foo\n")
        .await;

    let out = tempfile::tempdir().unwrap();
    let opts = registry.options(out.path());
    let names = vec!["example.com/foo@v1.2.3".to_string()];

    download(&names, &opts).await.unwrap();
    let zip_path = out.path().join("example.com/foo/v1.2.3.zip");
    let first = std::fs::read(&zip_path).unwrap();

    download(&names, &opts).await.unwrap();
    assert_eq!(std::fs::read(&zip_path).unwrap(), first);
}
