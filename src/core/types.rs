//! Core data structures shared by the handler, the LFS resolver and the
//! transport adapters.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use super::transport::ResponseBody;

/// A single part of the upload data attached to an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPart {
    /// Literal request bytes.
    Bytes(Bytes),
    /// Reference to a blob held by the host's blob service.
    Blob(String),
}

/// Browser-initiated request handed over by the host pipeline.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub referrer: String,
    pub upload: Vec<UploadPart>,
}

impl InterceptedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: HashMap::new(),
            referrer: String::new(),
            upload: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_upload(mut self, part: UploadPart) -> Self {
        self.upload.push(part);
        self
    }
}

/// Cookie as returned by the host cookie store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub secure: bool,
}

impl CookieRecord {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        secure: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            secure,
        }
    }
}

/// Basic-auth credentials lifted out of a URL.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How the transport should hand the response body back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    Stream,
    Buffered,
}

/// Fully resolved outbound request, built fresh for every attempt.
///
/// Redirects are never delegated to the transport: `max_redirects` is pinned
/// to zero so 302 handling stays with the interceptor.
#[derive(Debug, Clone)]
pub struct ResolvedRequestOptions {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub auth: Option<BasicAuth>,
    pub mode: ResponseMode,
    max_redirects: usize,
}

impl ResolvedRequestOptions {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: None,
            auth: None,
            mode: ResponseMode::Stream,
            max_redirects: 0,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    pub fn with_auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

/// Response handed back to the host pipeline. Owns the body stream.
pub struct ResponseDescriptor {
    pub data: ResponseBody,
    pub headers: HeaderMap,
    pub status_code: u16,
}

impl fmt::Debug for ResponseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDescriptor")
            .field("status_code", &self.status_code)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
