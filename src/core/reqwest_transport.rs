//! Reqwest-based implementation of the `HttpTransport` trait.
//!
//! Provides a thin adapter around `reqwest::Client` that converts between the
//! shared request/response representations and the concrete client.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use http::{
    HeaderMap as HttpHeaderMap, HeaderName as HttpHeaderName, HeaderValue as HttpHeaderValue,
    Method as HttpMethod,
};
use reqwest::{Client, Method, header::HeaderMap, redirect::Policy};

use super::transport::{HttpTransport, TransportError, TransportResponse, single_chunk};
use super::types::{ResolvedRequestOptions, ResponseMode};

/// Reqwest-backed transport used for intercepted and LFS requests.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new client with redirects disabled so the interceptor can
    /// inspect redirect responses explicitly.
    ///
    /// The client keeps no cookie jar of its own; cookies come from the
    /// host cookie store on every request.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client. The client should already have
    /// redirects disabled; otherwise redirects will be followed automatically
    /// and the interceptor will not observe the intermediate 302 response.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        options: ResolvedRequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        let req_method = map_method(&options.method)?;
        let req_headers = convert_headers(&options.headers)?;

        let mut builder = self
            .client
            .request(req_method, options.url.as_str())
            .headers(req_headers);

        if let Some(auth) = options.auth {
            builder = builder.basic_auth(auth.username, auth.password);
        }

        if let Some(data) = options.body {
            builder = builder.body(data);
        }

        let response = builder.send().await.map_err(classify_send_error)?;

        let status = response.status().as_u16();
        let headers = convert_back_headers(response.headers())?;

        let body = match options.mode {
            ResponseMode::Stream => response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|err| TransportError::Body(err.to_string())))
                .boxed(),
            ResponseMode::Buffered => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|err| TransportError::Body(err.to_string()))?;
                single_chunk(bytes)
            }
        };

        Ok(TransportResponse::new(status, headers, body))
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::NoResponse(err.to_string())
    }
}

fn map_method(method: &HttpMethod) -> Result<Method, TransportError> {
    Method::from_bytes(method.as_str().as_bytes())
        .map_err(|err| TransportError::InvalidRequest(err.to_string()))
}

fn convert_headers(headers: &HttpHeaderMap) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.iter() {
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes())
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        map.append(name, value);
    }
    Ok(map)
}

fn convert_back_headers(map: &HeaderMap) -> Result<HttpHeaderMap, TransportError> {
    let mut headers = HttpHeaderMap::new();
    for (name, value) in map.iter() {
        let http_name = HttpHeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|err| TransportError::Body(err.to_string()))?;
        let http_value = HttpHeaderValue::from_bytes(value.as_bytes())
            .map_err(|err| TransportError::Body(err.to_string()))?;
        headers.append(http_name, http_value);
    }
    Ok(headers)
}

type _AssertSync = Arc<ReqwestTransport>;
