//! modmirror - offline Go module mirror
//!
//! Downloads modules and their transitive requirements from a module proxy
//! into a local store laid out in the proxy's own on-disk format, verifying
//! every artifact against the public checksum database.

pub mod core;
pub mod io;
pub mod ops;
pub mod registry;
pub mod sumdb;
pub mod task;
pub mod types;
pub mod ui;
