//! Connection surface: the builder knobs and the token operations exposed to callers.
//!
//! A [`Connection`] owns one credential state and its cookie jar for its whole life. Callers may
//! share it freely across tasks; concurrent token requests coalesce onto a single in-flight
//! refresh.

// crates.io
use tokio::time::Instant;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	error::ConfigError,
	http::TokenTransport,
	manager::{ManagerSeed, TokenManager},
	obs::TokenMetrics,
};

/// Builder for [`Connection`] carrying the credential and endpoint knobs.
///
/// Empty strings are treated as absent, so configuration loaders can pass through unset values
/// without special casing.
#[derive(Default)]
pub struct ConnectionBuilder {
	token_url: Option<String>,
	url: Option<String>,
	access_token: Option<String>,
	refresh_token: Option<String>,
	user: Option<(String, String)>,
	client: Option<(String, String)>,
	metrics_subsystem: Option<String>,
	transport: Option<Arc<dyn TokenTransport>>,
}
impl ConnectionBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the OAuth token endpoint URL.
	pub fn token_url(mut self, url: impl Into<String>) -> Self {
		self.token_url = Some(url.into());

		self
	}

	/// Sets the API base URL the connection dispatches requests to.
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());

		self
	}

	/// Seeds the connection with an access token.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Seeds the connection with a refresh token.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Sets the user and password for the password grant.
	pub fn user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
		self.user = Some((name.into(), password.into()));

		self
	}

	/// Sets the client id and secret for the client credentials grant.
	pub fn client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
		self.client = Some((id.into(), secret.into()));

		self
	}

	/// Names the metrics subsystem; token attempts record under
	/// `<subsystem>_token_request_count`.
	pub fn metrics(mut self, subsystem: impl Into<String>) -> Self {
		self.metrics_subsystem = Some(subsystem.into());

		self
	}

	/// Replaces the default HTTP transport.
	///
	/// Custom transports own their cookie and redirect behavior.
	pub fn transport(mut self, transport: impl TokenTransport) -> Self {
		self.transport = Some(Arc::new(transport));

		self
	}

	/// Validates the configuration and builds the connection.
	///
	/// At least one credential source is required, and the token URL is required unless the only
	/// credential is a bare access token.
	pub fn build(self) -> Result<Connection> {
		let access = self.access_token.filter(|token| !token.is_empty());
		let refresh = self.refresh_token.filter(|token| !token.is_empty());
		let user = self.user.filter(|(name, password)| !name.is_empty() && !password.is_empty());
		let client = self.client.filter(|(id, secret)| !id.is_empty() && !secret.is_empty());

		if access.is_none() && refresh.is_none() && user.is_none() && client.is_none() {
			return Err(ConfigError::NoCredentials.into());
		}

		let needs_token_url = refresh.is_some() || user.is_some() || client.is_some();
		let token_url = match self.token_url.filter(|url| !url.is_empty()) {
			Some(raw) => Some(parse_url(raw)?),
			None if needs_token_url => return Err(ConfigError::MissingTokenUrl.into()),
			None => None,
		};
		let api_url = self.url.filter(|url| !url.is_empty()).map(parse_url).transpose()?;
		let transport: Arc<dyn TokenTransport> = match self.transport {
			Some(transport) => transport,
			#[cfg(feature = "reqwest")]
			None => Arc::new(ReqwestTransport::new()?),
			#[cfg(not(feature = "reqwest"))]
			None => return Err(ConfigError::MissingTransport.into()),
		};
		let metrics = Arc::new(self.metrics_subsystem.map(TokenMetrics::new).unwrap_or_default());
		let manager = Arc::new(TokenManager::new(ManagerSeed {
			token_url,
			transport,
			metrics: Arc::clone(&metrics),
			access,
			refresh,
			user,
			client,
		}));

		Ok(Connection { manager, metrics, api_url })
	}
}
impl Debug for ConnectionBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConnectionBuilder")
			.field("token_url", &self.token_url)
			.field("url", &self.url)
			.field("access_token_set", &self.access_token.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("user_set", &self.user.is_some())
			.field("client_set", &self.client.is_some())
			.field("metrics_subsystem", &self.metrics_subsystem)
			.finish()
	}
}

/// Per-call knobs for token retrieval.
#[derive(Clone, Debug)]
pub struct TokensRequest {
	/// Minimum remaining lifetime the returned access token must have.
	pub min_remaining: Duration,
	/// Overall deadline budget for the call, when set.
	pub timeout: Option<StdDuration>,
}
impl TokensRequest {
	/// Default freshness floor applied to access tokens.
	pub const DEFAULT_MIN_REMAINING: Duration = Duration::minutes(1);

	/// Creates a request with the default floor and no deadline.
	pub fn new() -> Self {
		Self { min_remaining: Self::DEFAULT_MIN_REMAINING, timeout: None }
	}

	/// Overrides the freshness floor.
	pub fn valid_for(mut self, min_remaining: Duration) -> Self {
		self.min_remaining = min_remaining;

		self
	}

	/// Bounds the whole call, waiting included, by `timeout`.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}
impl Default for TokensRequest {
	fn default() -> Self {
		Self::new()
	}
}

/// A connection to the API: owns the credential state and the token machinery.
#[derive(Debug)]
pub struct Connection {
	manager: Arc<TokenManager>,
	metrics: Arc<TokenMetrics>,
	api_url: Option<Url>,
}
impl Connection {
	/// Starts a connection builder.
	pub fn builder() -> ConnectionBuilder {
		ConnectionBuilder::new()
	}

	/// Returns an access/refresh pair using the default freshness floor.
	///
	/// The refresh slot is the empty string when the connection holds no refresh token.
	pub async fn tokens(&self) -> Result<(String, String)> {
		self.tokens_with(TokensRequest::new()).await
	}

	/// Returns a pair whose access token stays valid for at least `min_remaining`.
	pub async fn tokens_valid_for(&self, min_remaining: Duration) -> Result<(String, String)> {
		self.tokens_with(TokensRequest::new().valid_for(min_remaining)).await
	}

	/// Returns a pair honoring every knob on `request`.
	pub async fn tokens_with(&self, request: TokensRequest) -> Result<(String, String)> {
		let deadline = request.timeout.map(|timeout| Instant::now() + timeout);

		Arc::clone(&self.manager).get_tokens(request.min_remaining, deadline).await
	}

	/// Metrics sink observed by this connection's token requests.
	pub fn metrics(&self) -> &Arc<TokenMetrics> {
		&self.metrics
	}

	/// API base URL configured at build time.
	pub fn api_url(&self) -> Option<&Url> {
		self.api_url.as_ref()
	}

	/// Closes the connection; subsequent token calls fail with the shutdown error.
	///
	/// Idempotent. An in-flight refresh is left to finish on its own deadline.
	pub fn close(&self) {
		self.manager.close();
	}
}

fn parse_url(value: String) -> Result<Url> {
	Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { value, source }.into())
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn build_requires_a_credential_source() {
		let err = ConnectionBuilder::new()
			.token_url("https://sso.example.com/token")
			.build()
			.expect_err("Builder should reject a configuration without credentials.");

		assert!(matches!(err, Error::Config(ConfigError::NoCredentials)));
	}

	#[test]
	fn build_treats_empty_credentials_as_absent() {
		let err = ConnectionBuilder::new()
			.token_url("https://sso.example.com/token")
			.access_token("")
			.user("", "")
			.build()
			.expect_err("Builder should reject empty credential values.");

		assert!(matches!(err, Error::Config(ConfigError::NoCredentials)));
	}

	#[test]
	fn build_requires_a_token_url_when_refresh_is_possible() {
		let err = ConnectionBuilder::new()
			.refresh_token("my-refresh")
			.build()
			.expect_err("Builder should require a token URL for refreshable credentials.");

		assert!(matches!(err, Error::Config(ConfigError::MissingTokenUrl)));
	}

	#[test]
	fn build_accepts_a_bare_access_token_without_token_url() {
		let connection = ConnectionBuilder::new()
			.access_token("my-access")
			.build()
			.expect("Builder should accept an access-token-only configuration.");

		assert!(connection.api_url().is_none());
	}

	#[test]
	fn build_rejects_invalid_urls() {
		let err = ConnectionBuilder::new()
			.token_url("not a url")
			.refresh_token("my-refresh")
			.build()
			.expect_err("Builder should reject an unparseable token URL.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidUrl { .. })));
	}

	#[test]
	fn build_parses_the_api_url() {
		let connection = ConnectionBuilder::new()
			.token_url("https://sso.example.com/token")
			.url("https://api.example.com")
			.refresh_token("my-refresh")
			.metrics("my_sdk")
			.build()
			.expect("Builder should accept a fully-populated configuration.");

		assert_eq!(connection.api_url().map(Url::as_str), Some("https://api.example.com/"));
		assert_eq!(connection.metrics().name(), Some("my_sdk_token_request_count"));
	}
}
