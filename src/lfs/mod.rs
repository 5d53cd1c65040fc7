//! Git LFS media resolution.
//!
//! Media URLs on the code-hosting site point at small pointer files. The real
//! bytes live in content-addressed storage whose location is only known after
//! reading the repository's `.lfsconfig`.

pub mod classify;
pub mod pointer;
pub mod resolver;

pub use classify::{LfsTarget, MediaSource, classify};
pub use pointer::{object_url, parse_lfs_endpoint, parse_pointer_oid};
pub use resolver::{LfsLookup, LfsResolver};

use thiserror::Error;

use crate::core::session::StoreError;
use crate::core::transport::TransportError;

/// Reasons an LFS lookup can fail.
#[derive(Debug, Error)]
pub enum LfsError {
    #[error("lookup url is invalid: {0}")]
    InvalidLookupUrl(String),
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("too many redirects while fetching {0}")]
    TooManyRedirects(String),
    #[error(".lfsconfig has no endpoint url")]
    MissingEndpoint,
    #[error("pointer file has no sha256 oid")]
    MissingOid,
    #[error("object url is invalid: {0}")]
    InvalidObjectUrl(String),
    #[error("cookie lookup failed: {0}")]
    Cookies(StoreError),
    #[error("failed to convert header '{0}'")]
    InvalidHeader(String),
}
