//! # https-intercept
//!
//! Request interception layer for embedded browsers: every outgoing `https`
//! request is rebuilt and sent through this crate instead of the platform
//! network stack.
//!
//! ## Features
//!
//! - Cookie attachment from the host cookie store, honouring secure cookies
//! - Git LFS media URLs resolved to their storage objects before fetching
//! - Embedded `user:pass@host` credentials moved into basic auth
//! - Streamed responses handed back to the page-loading pipeline
//! - Bounded, explicit 302 following
//! - Pluggable transport, cookie store, blob store and event handlers
//!
//! ## Example
//!
//! ```no_run
//! use https_intercept::{HttpsInterceptor, InterceptedRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let interceptor = HttpsInterceptor::new()?;
//!     let request = InterceptedRequest::new("GET", "https://example.com/");
//!     match interceptor.handle(request).await.into_response() {
//!         Some(response) => println!("status: {}", response.status_code),
//!         None => println!("navigation aborted"),
//!     }
//!     Ok(())
//! }
//! ```

mod interceptor;

pub mod config;
pub mod core;
pub mod lfs;
pub mod modules;
pub mod protocol;

pub use crate::interceptor::{
    AbortReason,
    HandleOutcome,
    HttpsInterceptor,
    HttpsInterceptorBuilder,
    InterceptError,
    InterceptResult,
};

pub use crate::config::{ConfigError, InterceptorConfig, LfsConfig, DEFAULT_MAX_REDIRECTS};

pub use crate::core::{
    BasicAuth,
    BlobStore,
    CookieQuery,
    CookieRecord,
    CookieStore,
    CredentialError,
    HttpTransport,
    InterceptedRequest,
    MemoryBlobStore,
    MemoryCookieStore,
    ReqwestTransport,
    ResolvedRequestOptions,
    ResponseBody,
    ResponseDescriptor,
    ResponseMode,
    StoreError,
    TransportError,
    TransportResponse,
    UploadPart,
    build_cookie_header,
    build_scoped_cookie_header,
    extract_embedded_credentials,
};

pub use crate::lfs::{LfsError, LfsLookup, LfsResolver, LfsTarget, MediaSource};

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    HostStats,
    GlobalStats,
    InterceptEvent,
    LoggingHandler,
    MetricsCollector,
    MetricsHandler,
    MetricsSnapshot,
};

pub use crate::protocol::{ProtocolHandler, ProtocolRegistry, RegistryError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
