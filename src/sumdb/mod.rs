//! Checksum database client.
//!
//! Downloads are verified against a public transparency log that serves
//! signed `path version hash` records. [`client::Client`] performs the
//! lookups through a set of storage callbacks, [`note`] checks the log's
//! signed tree head, and [`dirhash`] computes the canonical content hashes
//! the records are written in.

pub mod client;
pub mod dirhash;
pub mod note;
pub mod verify;

pub use client::{Client, ClientOps, MemoryOps};

use thiserror::Error;

/// Verifier key of the public checksum database.
pub const DEFAULT_VERIFIER_KEY: &str =
    "sum.golang.org+033de0ae+Ac4zctda0e5eza+HJyk9SxEdh+s3Ux18htTTAD8OuAn8";

/// Base URL of the public checksum database.
pub const DEFAULT_BASE_URL: &str = "https://sum.golang.org";

#[derive(Error, Debug)]
pub enum SumDbError {
    #[error("invalid verifier key: {0}")]
    InvalidVerifierKey(String),

    #[error("malformed signed note")]
    MalformedNote,

    #[error("note has no verifiable signature from {0}")]
    UnverifiedNote(String),

    #[error("config write conflict for {0}")]
    WriteConflict(String),

    #[error("no cached entry for {0}")]
    NotFound(String),

    #[error("malformed lookup response: {0}")]
    MalformedResponse(String),

    #[error("module hash mismatch: {candidate} not among {known:?}")]
    HashMismatch {
        candidate: String,
        known: Vec<String>,
    },

    #[error(transparent)]
    Http(#[from] crate::io::http::HttpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unreadable zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}
