//! Core building blocks shared by the interceptor and the LFS resolver.

pub mod cookies;
pub mod credentials;
pub mod reqwest_transport;
pub mod session;
pub mod transport;
pub mod types;
pub mod upload;

pub use cookies::{build_cookie_header, build_scoped_cookie_header, collect_request_cookies};
pub use credentials::{CredentialError, extract_embedded_credentials};
pub use reqwest_transport::ReqwestTransport;
pub use session::{
    BlobStore, CookieQuery, CookieStore, MemoryBlobStore, MemoryCookieStore, StoreError,
};
pub use transport::{HttpTransport, ResponseBody, TransportError, TransportResponse, single_chunk};
pub use types::{
    BasicAuth, CookieRecord, InterceptedRequest, ResolvedRequestOptions, ResponseDescriptor,
    ResponseMode, UploadPart,
};
pub use upload::resolve_upload_body;
