//! Transport abstraction used for every outbound request.
//!
//! The interceptor never talks to the network directly; it hands a
//! [`ResolvedRequestOptions`] to an [`HttpTransport`] and receives a status,
//! headers and a body stream back.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use http::HeaderMap;
use http::header::{CONTENT_TYPE, LOCATION};
use thiserror::Error;

use super::types::ResolvedRequestOptions;

/// Streamed response body. Ownership moves to whoever receives the response.
pub type ResponseBody = BoxStream<'static, Result<Bytes, TransportError>>;

/// Contract for the underlying HTTP client.
///
/// Implementations must not follow redirects on their own and must honour
/// `options.auth` as HTTP basic authentication.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        options: ResolvedRequestOptions,
    ) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built or sent at all.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The request went out but no response came back.
    #[error("no response received: {0}")]
    NoResponse(String),
    #[error("body stream error: {0}")]
    Body(String),
}

/// Response as returned by the transport.
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn new(status: u16, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build a response around an in-memory body.
    pub fn buffered(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self::new(status, headers, single_chunk(body.into()))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Drain the body into memory.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Drain the body and decode it as (lossy) UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Wrap a fully buffered body in a one-item stream.
pub fn single_chunk(body: Bytes) -> ResponseBody {
    if body.is_empty() {
        return stream::empty().boxed();
    }
    stream::once(async move { Ok(body) }).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[tokio::test]
    async fn collects_streamed_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"oid ")), Ok(Bytes::from_static(b"sha256"))];
        let response = TransportResponse::new(200, HeaderMap::new(), stream::iter(chunks).boxed());
        assert_eq!(response.text().await.unwrap(), "oid sha256");
    }

    #[tokio::test]
    async fn surfaces_mid_stream_errors() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(TransportError::Body("connection reset".into())),
        ];
        let response = TransportResponse::new(200, HeaderMap::new(), stream::iter(chunks).boxed());
        assert!(matches!(response.bytes().await, Err(TransportError::Body(_))));
    }

    #[test]
    fn reads_location_header() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("https://example.com/next"));
        let response = TransportResponse::buffered(302, headers, Bytes::new());
        assert_eq!(response.location(), Some("https://example.com/next"));
        assert!(!response.is_success());
    }
}
