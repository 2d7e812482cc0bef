//! Module proxy protocol client.

pub mod proxy;

pub use proxy::{proxy_base, ProxyClient, RegistryError};
