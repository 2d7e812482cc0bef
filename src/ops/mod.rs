pub mod context;
pub mod download;
pub mod error;

pub use download::{download, DownloadOptions};
pub use error::DownloadError;
