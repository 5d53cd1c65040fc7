//! Host session collaborators: the cookie store and the blob service.
//!
//! Both are consumed read-only. In-memory implementations are provided for
//! embedders without a native store and for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

use super::types::CookieRecord;

/// Selector accepted by [`CookieStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieQuery {
    /// Cookies that would be sent to this URL.
    Url(String),
    /// Cookies whose domain matches, or is a subdomain of, this domain.
    Domain(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("blob not found: {0}")]
    BlobNotFound(String),
}

#[async_trait]
pub trait CookieStore: Send + Sync {
    async fn query(&self, query: &CookieQuery) -> Result<Vec<CookieRecord>, StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, StoreError>;
}

/// Cookie store backed by a plain vector.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: RwLock<Vec<CookieRecord>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies<I>(cookies: I) -> Self
    where
        I: IntoIterator<Item = CookieRecord>,
    {
        Self {
            cookies: RwLock::new(cookies.into_iter().collect()),
        }
    }

    pub fn insert(&self, cookie: CookieRecord) -> Result<(), StoreError> {
        let mut guard = self
            .cookies
            .write()
            .map_err(|_| StoreError::Unavailable("cookie store lock poisoned".into()))?;
        guard.retain(|existing| {
            !(existing.name == cookie.name && existing.domain == cookie.domain)
        });
        guard.push(cookie);
        Ok(())
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn query(&self, query: &CookieQuery) -> Result<Vec<CookieRecord>, StoreError> {
        let guard = self
            .cookies
            .read()
            .map_err(|_| StoreError::Unavailable("cookie store lock poisoned".into()))?;

        let matched = match query {
            CookieQuery::Url(raw) => {
                let Some(host) = Url::parse(raw)
                    .ok()
                    .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
                else {
                    return Ok(Vec::new());
                };
                guard
                    .iter()
                    .filter(|cookie| cookie_applies_to_host(&cookie.domain, &host))
                    .cloned()
                    .collect()
            }
            CookieQuery::Domain(domain) => {
                let wanted = domain.trim_start_matches('.').to_ascii_lowercase();
                guard
                    .iter()
                    .filter(|cookie| {
                        let own = cookie.domain.trim_start_matches('.').to_ascii_lowercase();
                        own == wanted || own.ends_with(&format!(".{wanted}"))
                    })
                    .cloned()
                    .collect()
            }
        };

        Ok(matched)
    }
}

/// RFC 6265 domain-match: a leading dot allows subdomains, otherwise the
/// cookie is host-only.
fn cookie_applies_to_host(cookie_domain: &str, host: &str) -> bool {
    let cookie_domain = cookie_domain.to_ascii_lowercase();
    match cookie_domain.strip_prefix('.') {
        Some(parent) => host == parent || host.ends_with(&format!(".{parent}")),
        None => host == cookie_domain,
    }
}

/// Blob service backed by a map of identifiers to bytes.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: impl Into<String>, data: impl Into<Bytes>) {
        if let Ok(mut guard) = self.blobs.write() {
            guard.insert(identifier.into(), data.into());
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, StoreError> {
        let guard = self
            .blobs
            .read()
            .map_err(|_| StoreError::Unavailable("blob store lock poisoned".into()))?;
        guard
            .get(identifier)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(identifier.to_string()))
    }
}
