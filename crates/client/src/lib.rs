//! repokit_client - HTTP I/O provider and CLI for repokit APIs.
//!
//! [`ApiProvider`] maps repository operations onto a REST API and exposes
//! S3 blob storage as its extension. Plug it into a
//! [`repokit_core::RepositoryGroup`] to get cached, per-entity access.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
#[cfg(test)]
mod testing;
pub mod transport;

pub use client::{ApiProvider, ApiRepositoryGroup, S3Blobs};
pub use config::ApiConfig;
pub use error::{ClientError, Result};
pub use transport::{HttpTransport, ReqwestTransport};
