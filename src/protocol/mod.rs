//! Scheme routing table.
//!
//! The host registers handlers per URL scheme; requests for a registered
//! scheme are routed to that handler instead of the native network stack.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::core::types::InterceptedRequest;
use crate::interceptor::{HandleOutcome, HttpsInterceptor};

/// Anything able to serve requests for a scheme.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    async fn handle(&self, request: InterceptedRequest) -> HandleOutcome;
}

#[async_trait]
impl ProtocolHandler for HttpsInterceptor {
    async fn handle(&self, request: InterceptedRequest) -> HandleOutcome {
        HttpsInterceptor::handle(self, request).await
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("scheme '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("invalid scheme '{0}'")]
    InvalidScheme(String),
}

#[derive(Default)]
pub struct ProtocolRegistry {
    handlers: HashMap<String, Arc<dyn ProtocolHandler>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        scheme: &str,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<(), RegistryError> {
        let scheme = scheme.to_ascii_lowercase();
        let valid = scheme
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(RegistryError::InvalidScheme(scheme));
        }
        if self.handlers.contains_key(&scheme) {
            return Err(RegistryError::AlreadyRegistered(scheme));
        }
        self.handlers.insert(scheme, handler);
        Ok(())
    }

    /// Route all `https` traffic through `interceptor`.
    pub fn register_https(
        &mut self,
        interceptor: Arc<HttpsInterceptor>,
    ) -> Result<(), RegistryError> {
        self.register("https", interceptor)
    }

    pub fn is_handled(&self, scheme: &str) -> bool {
        self.handlers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Dispatch `request` to the handler registered for its scheme.
    ///
    /// Returns `None` when the URL cannot be parsed or no handler owns the
    /// scheme, leaving the request to the host's default handling.
    pub async fn route(&self, request: InterceptedRequest) -> Option<HandleOutcome> {
        let scheme = Url::parse(&request.url).ok()?.scheme().to_string();
        let handler = self.handlers.get(&scheme)?.clone();
        Some(handler.handle(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::single_chunk;
    use crate::core::types::ResponseDescriptor;
    use bytes::Bytes;
    use http::HeaderMap;

    struct Fixed(u16);

    #[async_trait]
    impl ProtocolHandler for Fixed {
        async fn handle(&self, _request: InterceptedRequest) -> HandleOutcome {
            HandleOutcome::Response(ResponseDescriptor {
                data: single_chunk(Bytes::new()),
                headers: HeaderMap::new(),
                status_code: self.0,
            })
        }
    }

    #[tokio::test]
    async fn routes_by_scheme() {
        let mut registry = ProtocolRegistry::new();
        registry.register("HTTPS", Arc::new(Fixed(204))).unwrap();

        assert!(registry.is_handled("https"));
        let outcome = registry
            .route(InterceptedRequest::new("GET", "https://example.com/"))
            .await
            .unwrap();
        assert_eq!(outcome.status(), Some(204));

        assert!(
            registry
                .route(InterceptedRequest::new("GET", "http://example.com/"))
                .await
                .is_none()
        );
    }

    #[test]
    fn rejects_duplicate_and_malformed_schemes() {
        let mut registry = ProtocolRegistry::new();
        registry.register("https", Arc::new(Fixed(200))).unwrap();
        assert!(matches!(
            registry.register("https", Arc::new(Fixed(200))),
            Err(RegistryError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            registry.register("1bad", Arc::new(Fixed(200))),
            Err(RegistryError::InvalidScheme(_))
        ));
    }
}
