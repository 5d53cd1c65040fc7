//! Two-hop LFS lookup: `.lfsconfig` for the storage endpoint, then the pointer
//! file for the object id.

use std::sync::Arc;

use http::header::{COOKIE, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

use super::LfsError;
use super::classify::LfsTarget;
use super::pointer::{object_url, parse_lfs_endpoint, parse_pointer_oid};
use crate::core::cookies::build_cookie_header;
use crate::core::session::{CookieQuery, CookieStore};
use crate::core::transport::HttpTransport;
use crate::core::types::{ResolvedRequestOptions, ResponseMode};

/// Everything a single LFS lookup needs.
#[derive(Debug, Clone)]
pub struct LfsLookup {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub org: String,
    pub repo: String,
    pub reference: String,
    pub path: String,
}

impl LfsLookup {
    pub fn new(target: &LfsTarget, url: Url, headers: HeaderMap) -> Self {
        Self {
            url,
            method: Method::GET,
            headers,
            org: target.org.clone(),
            repo: target.repo.clone(),
            reference: target.reference.clone(),
            path: target.path.clone(),
        }
    }
}

/// Resolves LFS media references into direct object URLs.
pub struct LfsResolver {
    transport: Arc<dyn HttpTransport>,
    cookies: Option<Arc<dyn CookieStore>>,
    site_host: String,
    max_redirects: usize,
}

impl LfsResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, site_host: impl Into<String>) -> Self {
        Self {
            transport,
            cookies: None,
            site_host: site_host.into(),
            max_redirects: 10,
        }
    }

    pub fn with_cookie_store(mut self, store: Option<Arc<dyn CookieStore>>) -> Self {
        self.cookies = store;
        self
    }

    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Resolve `lookup` to the binary object URL.
    pub async fn resolve(&self, mut lookup: LfsLookup) -> Result<Url, LfsError> {
        lookup.method = Method::GET;
        self.attach_site_cookies(&mut lookup.headers).await?;

        let config_url = self.raw_url(&lookup, ".lfsconfig")?;
        let config = self.fetch_text(&lookup, config_url).await?;
        let endpoint = parse_lfs_endpoint(&config)?;
        log::debug!("lfs endpoint for {}/{}: {endpoint}", lookup.org, lookup.repo);

        let pointer_url = self.raw_url(&lookup, &lookup.path)?;
        let pointer = self.fetch_text(&lookup, pointer_url).await?;
        let oid = parse_pointer_oid(&pointer)?;

        object_url(&endpoint, &oid)
    }

    async fn attach_site_cookies(&self, headers: &mut HeaderMap) -> Result<(), LfsError> {
        headers.remove(COOKIE);
        let Some(store) = self.cookies.as_ref() else {
            return Ok(());
        };

        let site = format!("https://{}", self.site_host);
        let cookies = store
            .query(&CookieQuery::Url(site))
            .await
            .map_err(LfsError::Cookies)?;
        let header = build_cookie_header(&cookies);
        if !header.is_empty() {
            let value = HeaderValue::from_str(&header)
                .map_err(|_| LfsError::InvalidHeader("cookie".into()))?;
            headers.insert(COOKIE, value);
        }
        Ok(())
    }

    fn raw_url(&self, lookup: &LfsLookup, file: &str) -> Result<Url, LfsError> {
        let raw = format!(
            "https://{}/{}/{}/raw/{}/{}",
            self.site_host, lookup.org, lookup.repo, lookup.reference, file
        );
        Url::parse(&raw).map_err(|err| LfsError::InvalidLookupUrl(format!("{raw}: {err}")))
    }

    /// GET `url` and return its body, following redirects by hand because
    /// the transport never does. Cookies are dropped once the host changes.
    async fn fetch_text(&self, lookup: &LfsLookup, url: Url) -> Result<String, LfsError> {
        let mut current = url;
        let mut headers = lookup.headers.clone();

        for _ in 0..=self.max_redirects {
            let options = ResolvedRequestOptions::new(lookup.method.clone(), current.clone())
                .with_headers(headers.clone())
                .with_mode(ResponseMode::Buffered);

            let response = self
                .transport
                .send(options)
                .await
                .map_err(|source| LfsError::Fetch {
                    url: current.to_string(),
                    source,
                })?;

            if (300..400).contains(&response.status) {
                let next = response
                    .location()
                    .and_then(|location| current.join(location).ok())
                    .ok_or_else(|| LfsError::Status {
                        url: current.to_string(),
                        status: response.status,
                    })?;
                if next.host_str() != current.host_str() {
                    headers.remove(COOKIE);
                }
                current = next;
                continue;
            }

            if !response.is_success() {
                return Err(LfsError::Status {
                    url: current.to_string(),
                    status: response.status,
                });
            }

            return response.text().await.map_err(|source| LfsError::Fetch {
                url: current.to_string(),
                source,
            });
        }

        Err(LfsError::TooManyRedirects(current.to_string()))
    }
}
