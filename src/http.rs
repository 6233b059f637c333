//! Transport seam for token endpoint requests.
//!
//! [`TokenTransport`] is the core's only dependency on an HTTP stack: execute one form-encoded
//! POST with an optional per-attempt timeout and hand back status, content type, and body. The
//! default reqwest transport owns the connection's cookie jar, so `Set-Cookie` values received
//! from the token endpoint are replayed on every later request to it for the life of the
//! connection. Custom transports own their cookie behavior.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::{cookie::Jar, header::CONTENT_TYPE, redirect::Policy};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Future returned by [`TokenTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;

/// A single form-encoded token endpoint request.
#[derive(Clone)]
pub struct TokenRequest<'a> {
	/// Absolute token endpoint URL.
	pub url: &'a Url,
	/// Form fields to POST.
	pub form: &'a [(&'static str, String)],
	/// Remaining deadline budget for this attempt, when the caller set one.
	pub timeout: Option<StdDuration>,
}
impl Debug for TokenRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("url", &self.url)
			.field("form_keys", &self.form.iter().map(|(key, _)| *key).collect::<Vec<_>>())
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Raw token endpoint response handed to the classifier.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Content-Type header value, when present.
	pub content_type: Option<String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl RawResponse {
	pub(crate) fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub(crate) fn is_json(&self) -> bool {
		self.content_type
			.as_deref()
			.is_some_and(|value| value.trim_start().starts_with("application/json"))
	}
}

/// Abstraction over HTTP transports capable of executing token endpoint requests.
///
/// Implementations must be safe for concurrent use and should honor `request.timeout` as the
/// attempt's total budget; the manager relies on it to bound each attempt by the caller's
/// remaining deadline.
pub trait TokenTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes one POST against the token endpoint.
	fn execute<'a>(&'a self, request: TokenRequest<'a>) -> TransportFuture<'a>;
}

/// Default transport backed by [`ReqwestClient`] with a per-connection cookie jar.
///
/// Token requests do not follow redirects; token endpoints return results directly instead of
/// delegating to another URI.
#[cfg(feature = "reqwest")]
pub struct ReqwestTransport {
	client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds the default transport with a fresh cookie jar.
	pub fn new() -> Result<Self> {
		let jar = Arc::new(Jar::default());
		let client = ReqwestClient::builder()
			.cookie_provider(jar)
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self { client })
	}

	/// Wraps an existing client; the caller keeps responsibility for cookies and redirects.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client }
	}
}
#[cfg(feature = "reqwest")]
impl TokenTransport for ReqwestTransport {
	fn execute<'a>(&'a self, request: TokenRequest<'a>) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut builder = self.client.post(request.url.clone()).form(request.form);

			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(RawResponse { status, content_type, body })
		})
	}
}
