//! High level interception orchestration.
//!
//! Wires together cookie attachment, LFS media resolution, credential
//! extraction, body resolution and the transport to turn one intercepted
//! browser request into exactly one [`HandleOutcome`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, REFERER};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, InterceptorConfig};
use crate::core::cookies::{build_scoped_cookie_header, collect_request_cookies};
use crate::core::credentials::extract_embedded_credentials;
use crate::core::reqwest_transport::ReqwestTransport;
use crate::core::session::{BlobStore, CookieStore, StoreError};
use crate::core::transport::{HttpTransport, TransportError};
use crate::core::types::{InterceptedRequest, ResolvedRequestOptions, ResponseDescriptor};
use crate::core::upload::resolve_upload_body;
use crate::lfs::{LfsError, LfsLookup, LfsResolver, classify};
use crate::modules::events::{
	AbortEvent, DispatchEvent, EventDispatcher, EventHandler, InterceptEvent, InterceptedEvent,
	LoggingHandler, MetricsHandler, RedirectEvent, ResolutionEvent, ResponseEvent,
};
use crate::modules::metrics::{MetricsCollector, MetricsSnapshot};

/// Result alias used when constructing the interceptor.
pub type InterceptResult<T> = Result<T, InterceptError>;

/// Construction-time failures. Request handling itself never fails; see
/// [`HandleOutcome`].
#[derive(Debug, Error)]
pub enum InterceptError {
	#[error("transport initialisation failed: {0}")]
	Transport(#[from] TransportError),
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}

/// Why an intercepted request produced no response.
#[derive(Debug, Error)]
pub enum AbortReason {
	#[error("invalid request: {0}")]
	InvalidRequest(String),
	#[error("session store failed: {0}")]
	Store(#[from] StoreError),
	#[error("media resolution failed: {0}")]
	Resolution(#[from] LfsError),
	#[error("no response received: {0}")]
	Network(String),
	#[error("too many redirects (limit {limit})")]
	TooManyRedirects { limit: usize },
}

/// Terminal result of one intercepted request, however many hops it took.
#[derive(Debug)]
pub enum HandleOutcome {
	/// The origin answered with a 2xx status.
	Response(ResponseDescriptor),
	/// The origin answered with an error status; forwarded untouched.
	Forwarded(ResponseDescriptor),
	/// Navigation should be aborted.
	Abort(AbortReason),
}

impl HandleOutcome {
	/// Response to hand to the host pipeline, `None` when aborting.
	pub fn into_response(self) -> Option<ResponseDescriptor> {
		match self {
			HandleOutcome::Response(response) | HandleOutcome::Forwarded(response) => Some(response),
			HandleOutcome::Abort(_) => None,
		}
	}

	pub fn status(&self) -> Option<u16> {
		match self {
			HandleOutcome::Response(response) | HandleOutcome::Forwarded(response) => {
				Some(response.status_code)
			}
			HandleOutcome::Abort(_) => None,
		}
	}

	pub fn is_abort(&self) -> bool {
		matches!(self, HandleOutcome::Abort(_))
	}
}

/// Fluent builder for [`HttpsInterceptor`].
pub struct HttpsInterceptorBuilder {
	config: InterceptorConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	cookies: Option<Arc<dyn CookieStore>>,
	blobs: Option<Arc<dyn BlobStore>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	enable_logging: bool,
}

impl HttpsInterceptorBuilder {
	pub fn new() -> Self {
		Self {
			config: InterceptorConfig::default(),
			transport: None,
			cookies: None,
			blobs: None,
			handlers: Vec::new(),
			enable_logging: true,
		}
	}

	pub fn with_config(mut self, config: InterceptorConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
		self.cookies = Some(store);
		self
	}

	pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
		self.blobs = Some(store);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn with_max_redirects(mut self, hops: usize) -> Self {
		self.config.max_redirects = hops;
		self
	}

	pub fn disable_metrics(mut self) -> Self {
		self.config.enable_metrics = false;
		self
	}

	pub fn disable_lfs(mut self) -> Self {
		self.config.lfs.enabled = false;
		self
	}

	pub fn disable_logging(mut self) -> Self {
		self.enable_logging = false;
		self
	}

	pub fn build(self) -> InterceptResult<HttpsInterceptor> {
		self.config.validate()?;

		let transport: Arc<dyn HttpTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new()?),
		};

		let resolver = LfsResolver::new(transport.clone(), self.config.lfs.site_host.clone())
			.with_cookie_store(self.cookies.clone())
			.with_max_redirects(self.config.max_redirects);

		let metrics = self.config.enable_metrics.then(MetricsCollector::new);

		let mut events = EventDispatcher::new();
		if self.enable_logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		if let Some(ref collector) = metrics {
			events.register_handler(Arc::new(MetricsHandler::new(collector.clone())));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		Ok(HttpsInterceptor {
			config: self.config,
			transport,
			cookies: self.cookies,
			blobs: self.blobs,
			resolver,
			metrics,
			events: Arc::new(events),
		})
	}
}

impl Default for HttpsInterceptorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Overrides applied to a resolved LFS media response.
struct ForcedMedia {
	content_type: &'static str,
	disposition: String,
}

/// Outcome of a single dispatch.
enum Attempt {
	Done(HandleOutcome),
	Redirect { from: Url, to: Url },
}

/// Intercepting handler for `https` requests.
pub struct HttpsInterceptor {
	config: InterceptorConfig,
	transport: Arc<dyn HttpTransport>,
	cookies: Option<Arc<dyn CookieStore>>,
	blobs: Option<Arc<dyn BlobStore>>,
	resolver: LfsResolver,
	metrics: Option<MetricsCollector>,
	events: Arc<EventDispatcher>,
}

impl HttpsInterceptor {
	/// Construct an interceptor with default configuration and a reqwest
	/// transport, without cookie or blob stores.
	pub fn new() -> InterceptResult<Self> {
		HttpsInterceptorBuilder::new().build()
	}

	/// Obtain a builder to customise the interceptor instance.
	pub fn builder() -> HttpsInterceptorBuilder {
		HttpsInterceptorBuilder::new()
	}

	pub fn config(&self) -> &InterceptorConfig {
		&self.config
	}

	pub fn metrics(&self) -> Option<MetricsSnapshot> {
		self.metrics.as_ref().map(MetricsCollector::snapshot)
	}

	/// Callback form of [`HttpsInterceptor::handle`]: `respond` receives the
	/// response, or `None` to abort the navigation.
	pub async fn respond<F>(&self, request: InterceptedRequest, respond: F)
	where
		F: FnOnce(Option<ResponseDescriptor>),
	{
		respond(self.handle(request).await.into_response());
	}

	/// Handle one intercepted request end to end.
	///
	/// A 302 with a `location` header is followed here, up to
	/// `max_redirects` hops, as a GET without body. Every other status is
	/// returned to the caller.
	pub async fn handle(&self, mut request: InterceptedRequest) -> HandleOutcome {
		self.events.dispatch(InterceptEvent::Intercepted(InterceptedEvent {
			url: request.url.clone(),
			method: request.method.clone(),
			timestamp: chrono::Utc::now(),
		}));

		let mut hops = 0usize;
		loop {
			let reason = match self.attempt(&request).await {
				Ok(Attempt::Done(outcome)) => return outcome,
				Ok(Attempt::Redirect { from, to }) => {
					if hops >= self.config.max_redirects {
						AbortReason::TooManyRedirects {
							limit: self.config.max_redirects,
						}
					} else {
						hops += 1;
						self.events.dispatch(InterceptEvent::Redirected(RedirectEvent {
							from,
							to: to.clone(),
							hop: hops,
							timestamp: chrono::Utc::now(),
						}));
						request.url = to.to_string();
						request.method = Method::GET.to_string();
						request.upload.clear();
						continue;
					}
				}
				Err(reason) => reason,
			};

			self.events.dispatch(InterceptEvent::Aborted(AbortEvent {
				url: request.url.clone(),
				reason: reason.to_string(),
				timestamp: chrono::Utc::now(),
			}));
			return HandleOutcome::Abort(reason);
		}
	}

	async fn attempt(&self, request: &InterceptedRequest) -> Result<Attempt, AbortReason> {
		let mut url = Url::parse(&request.url)
			.map_err(|err| AbortReason::InvalidRequest(format!("{}: {err}", request.url)))?;
		let method = Method::from_bytes(request.method.as_bytes())
			.map_err(|_| AbortReason::InvalidRequest(format!("method {}", request.method)))?;
		let mut headers = to_header_map(&request.headers)?;

		if self.config.forward_referrer && !request.referrer.is_empty() {
			headers.insert(REFERER, header_value(&request.referrer, "referer")?);
		}

		if let Some(store) = self.cookies.as_deref() {
			let cookies = collect_request_cookies(store, &url).await?;
			let cookie_header = build_scoped_cookie_header(&cookies, &url);
			if !cookie_header.is_empty() {
				headers.insert(COOKIE, header_value(&cookie_header, "cookie")?);
			}
		}

		let mut forced = None;
		if self.config.lfs.enabled
			&& let Some(target) = classify(&url, &self.config.lfs)
		{
			let lookup = LfsLookup::new(&target, url.clone(), headers.clone());
			let resolved = self.resolver.resolve(lookup).await;
			self.events.dispatch(InterceptEvent::Resolution(ResolutionEvent {
				source: url.clone(),
				target: resolved.as_ref().ok().cloned(),
				error: resolved.as_ref().err().map(ToString::to_string),
				timestamp: chrono::Utc::now(),
			}));

			url = resolved?;
			headers = HeaderMap::new();
			forced = Some(ForcedMedia {
				content_type: target.forced_content_type(),
				disposition: self.config.lfs.forced_disposition.clone(),
			});
		}

		let (url, auth) = extract_embedded_credentials(url)
			.map_err(|err| AbortReason::InvalidRequest(err.to_string()))?;

		let body = resolve_upload_body(&request.upload, self.blobs.as_deref()).await?;

		self.events.dispatch(InterceptEvent::Dispatched(DispatchEvent {
			url: url.clone(),
			method: method.clone(),
			has_auth: auth.is_some(),
			body_size: body.as_ref().map(|b| b.len()).unwrap_or(0),
			timestamp: chrono::Utc::now(),
		}));

		let options = ResolvedRequestOptions::new(method.clone(), url.clone())
			.with_headers(headers)
			.with_body(body)
			.with_auth(auth);

		let started = Instant::now();
		let mut response = self.transport.send(options).await.map_err(|err| match err {
			TransportError::InvalidRequest(msg) => AbortReason::InvalidRequest(msg),
			TransportError::NoResponse(msg) | TransportError::Body(msg) => AbortReason::Network(msg),
		})?;

		self.events.dispatch(InterceptEvent::Responded(ResponseEvent {
			url: url.clone(),
			method,
			status: response.status,
			latency: started.elapsed(),
			timestamp: chrono::Utc::now(),
		}));

		if response.status == 302
			&& let Some(next) = response.location().and_then(|location| url.join(location).ok())
		{
			return Ok(Attempt::Redirect { from: url, to: next });
		}

		if !response.is_success() {
			return Ok(Attempt::Done(HandleOutcome::Forwarded(ResponseDescriptor {
				data: response.body,
				headers: response.headers,
				status_code: response.status,
			})));
		}

		if let Some(forced) = forced {
			response
				.headers
				.insert(CONTENT_TYPE, HeaderValue::from_static(forced.content_type));
			response.headers.insert(
				CONTENT_DISPOSITION,
				header_value(&forced.disposition, "content-disposition")?,
			);
		}

		Ok(Attempt::Done(HandleOutcome::Response(ResponseDescriptor {
			data: response.body,
			headers: response.headers,
			status_code: response.status,
		})))
	}
}

fn header_value(value: &str, name: &str) -> Result<HeaderValue, AbortReason> {
	HeaderValue::from_str(value)
		.map_err(|_| AbortReason::InvalidRequest(format!("invalid {name} header value")))
}

fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, AbortReason> {
	let mut map = HeaderMap::new();
	for (name, value) in headers {
		let header_name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| AbortReason::InvalidRequest(format!("invalid header name {name}")))?;
		map.insert(header_name, header_value(value, name)?);
	}
	Ok(map)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::session::MemoryCookieStore;
	use crate::core::transport::TransportResponse;
	use crate::core::types::CookieRecord;
	use async_trait::async_trait;
	use http::header::LOCATION;
	use std::sync::Mutex;

	struct StubTransport {
		responses: Mutex<Vec<Result<TransportResponse, TransportError>>>,
		seen: Mutex<Vec<ResolvedRequestOptions>>,
	}

	impl StubTransport {
		fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
			Arc::new(Self {
				responses: Mutex::new(responses.into_iter().rev().collect()),
				seen: Mutex::new(Vec::new()),
			})
		}
	}

	#[async_trait]
	impl HttpTransport for StubTransport {
		async fn send(
			&self,
			options: ResolvedRequestOptions,
		) -> Result<TransportResponse, TransportError> {
			self.seen.lock().unwrap().push(options);
			self.responses
				.lock()
				.unwrap()
				.pop()
				.unwrap_or_else(|| Err(TransportError::NoResponse("exhausted".into())))
		}
	}

	fn redirect_to(location: &'static str) -> Result<TransportResponse, TransportError> {
		let mut headers = HeaderMap::new();
		headers.insert(LOCATION, HeaderValue::from_static(location));
		Ok(TransportResponse::buffered(302, headers, ""))
	}

	fn interceptor(transport: Arc<StubTransport>) -> HttpsInterceptor {
		HttpsInterceptor::builder()
			.with_transport(transport)
			.disable_logging()
			.build()
			.unwrap()
	}

	#[tokio::test]
	async fn referrer_and_cookies_are_attached() {
		let transport = StubTransport::new(vec![Ok(TransportResponse::buffered(
			200,
			HeaderMap::new(),
			"ok",
		))]);
		let cookies = Arc::new(MemoryCookieStore::with_cookies([CookieRecord::new(
			"sid",
			"42",
			"example.com",
			true,
		)]));
		let interceptor = HttpsInterceptor::builder()
			.with_transport(transport.clone())
			.with_cookie_store(cookies)
			.disable_logging()
			.build()
			.unwrap();

		let request = InterceptedRequest::new("GET", "https://example.com/page")
			.with_referrer("https://example.com/");
		let outcome = interceptor.handle(request).await;
		assert_eq!(outcome.status(), Some(200));

		let seen = transport.seen.lock().unwrap();
		assert_eq!(seen[0].headers.get(REFERER).unwrap(), "https://example.com/");
		// one match per query: origin, dotted domain, bare domain
		assert_eq!(seen[0].headers.get(COOKIE).unwrap(), "sid=42; sid=42; sid=42; ");
	}

	#[tokio::test]
	async fn redirect_limit_produces_distinct_abort() {
		let transport = StubTransport::new(vec![
			redirect_to("/a"),
			redirect_to("/b"),
			redirect_to("/c"),
		]);
		let interceptor = HttpsInterceptor::builder()
			.with_transport(transport.clone())
			.with_max_redirects(2)
			.disable_logging()
			.build()
			.unwrap();

		let outcome = interceptor
			.handle(InterceptedRequest::new("GET", "https://example.com/start"))
			.await;
		assert!(matches!(
			outcome,
			HandleOutcome::Abort(AbortReason::TooManyRedirects { limit: 2 })
		));
		assert_eq!(transport.seen.lock().unwrap().len(), 3);
	}

	#[tokio::test]
	async fn redirect_without_location_is_forwarded() {
		let transport = StubTransport::new(vec![Ok(TransportResponse::buffered(
			302,
			HeaderMap::new(),
			"",
		))]);
		let outcome = interceptor(transport)
			.handle(InterceptedRequest::new("GET", "https://example.com/"))
			.await;
		assert!(matches!(outcome, HandleOutcome::Forwarded(ref r) if r.status_code == 302));
	}

	#[tokio::test]
	async fn unparsable_url_aborts_before_dispatch() {
		let transport = StubTransport::new(Vec::new());
		let outcome = interceptor(transport.clone())
			.handle(InterceptedRequest::new("GET", "not a url"))
			.await;
		assert!(matches!(outcome, HandleOutcome::Abort(AbortReason::InvalidRequest(_))));
		assert!(transport.seen.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn respond_delivers_none_on_abort() {
		let transport = StubTransport::new(vec![Err(TransportError::NoResponse(
			"connection refused".into(),
		))]);
		let interceptor = interceptor(transport);
		let mut delivered = Vec::new();
		interceptor
			.respond(InterceptedRequest::new("GET", "https://example.com/"), |response| {
				delivered.push(response.is_none())
			})
			.await;
		assert_eq!(delivered, vec![true]);
	}
}
