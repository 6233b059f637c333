//! The token state machine: grant selection, serialized refresh, and atomic install.
//!
//! One manager owns one credential state. Callers ask for a pair that stays valid for at least
//! `min_remaining`; the manager answers from cache when it can and otherwise selects a grant,
//! dispatches it with retries, and installs the response as an atomic pair. A per-manager flight
//! guard keeps at most one token request in the air: the winning caller moves the guard into a
//! spawned refresh task, so callers that give up never cancel a refresh other waiters depend on.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::{
	sync::{Mutex as AsyncMutex, OwnedMutexGuard},
	time::{Instant, sleep, timeout_at},
};
use tracing::{Instrument, debug, warn};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	grant::{Grant, GrantRequest},
	http::{TokenRequest, TokenTransport},
	jwt::Token,
	obs::TokenMetrics,
	response::{self, Outcome},
	retry,
};

// A refresh token this close to expiry is not worth sending; the seed grant is used instead.
const REFRESH_FLOOR: Duration = Duration::seconds(10);

/// Everything a manager needs at construction time.
pub(crate) struct ManagerSeed {
	pub(crate) token_url: Option<Url>,
	pub(crate) transport: Arc<dyn TokenTransport>,
	pub(crate) metrics: Arc<TokenMetrics>,
	pub(crate) access: Option<String>,
	pub(crate) refresh: Option<String>,
	pub(crate) user: Option<(String, String)>,
	pub(crate) client: Option<(String, String)>,
}

#[derive(Default)]
struct CredentialState {
	access: Option<Token>,
	refresh: Option<Token>,
	user: Option<(String, String)>,
	client: Option<(String, String)>,
}
impl CredentialState {
	fn usable_refresh(&self, now: OffsetDateTime) -> bool {
		self.refresh.as_ref().is_some_and(|token| !token.expires_within(now, REFRESH_FLOOR))
	}

	fn has_grant_source(&self, now: OffsetDateTime) -> bool {
		self.usable_refresh(now) || self.user.is_some() || self.client.is_some()
	}

	fn pair_for(&self, access: &Token) -> (String, String) {
		let refresh =
			self.refresh.as_ref().map(|token| token.as_str().to_owned()).unwrap_or_default();

		(access.as_str().to_owned(), refresh)
	}
}
impl Debug for CredentialState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialState")
			.field("access", &self.access)
			.field("refresh", &self.refresh)
			.field("user_set", &self.user.is_some())
			.field("client_set", &self.client.is_some())
			.finish()
	}
}

/// Serializes refreshes and hands out cached pairs while they satisfy the caller's floor.
pub(crate) struct TokenManager {
	token_url: Option<Url>,
	transport: Arc<dyn TokenTransport>,
	metrics: Arc<TokenMetrics>,
	state: Mutex<CredentialState>,
	flight: Arc<AsyncMutex<()>>,
	closed: AtomicBool,
}
impl TokenManager {
	pub(crate) fn new(seed: ManagerSeed) -> Self {
		Self {
			token_url: seed.token_url,
			transport: seed.transport,
			metrics: seed.metrics,
			state: Mutex::new(CredentialState {
				access: seed.access.map(Token::new),
				refresh: seed.refresh.map(Token::new),
				user: seed.user,
				client: seed.client,
			}),
			flight: Arc::new(AsyncMutex::new(())),
			closed: AtomicBool::new(false),
		}
	}

	pub(crate) fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}

	/// Returns a pair whose access token satisfies `min_remaining`, refreshing when needed.
	pub(crate) async fn get_tokens(
		self: Arc<Self>,
		min_remaining: Duration,
		deadline: Option<Instant>,
	) -> Result<(String, String)> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::Closed);
		}
		if let Some(pair) = self.cached_pair(OffsetDateTime::now_utc(), min_remaining)? {
			return Ok(pair);
		}

		let guard = self.acquire_flight(deadline).await?;

		// Another caller may have installed fresh tokens while this one waited for the guard.
		if let Some(pair) = self.cached_pair(OffsetDateTime::now_utc(), min_remaining)? {
			return Ok(pair);
		}

		let manager = Arc::clone(&self);
		// The task owns the flight guard: a caller that gives up (dropped future or expired
		// deadline) leaves the refresh running, and its result is installed for later callers.
		let handle = tokio::spawn(async move {
			let _flight = guard;

			manager.refresh(deadline).await
		});

		match handle.await {
			Ok(result) => result,
			Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
			Err(_) => Err(Error::Closed),
		}
	}

	/// Classifies the cached state: a satisfying pair, `None` when a refresh should run, or the
	/// terminal configuration errors when nothing can mint a new pair.
	fn cached_pair(
		&self,
		now: OffsetDateTime,
		min_remaining: Duration,
	) -> Result<Option<(String, String)>> {
		let state = self.state.lock();

		if let Some(access) = &state.access {
			if !access.expires_within(now, min_remaining) {
				return Ok(Some(state.pair_for(access)));
			}
		}
		if state.has_grant_source(now) {
			return Ok(None);
		}

		// Nothing can mint a new pair; fall back to whatever is cached.
		match &state.access {
			Some(access) if !access.expires_within(now, Duration::ZERO) => {
				warn!(
					"Access token expires in less than the requested period and there is no way \
					 to refresh it."
				);

				Ok(Some(state.pair_for(access)))
			},
			Some(_) => Err(ConfigError::AccessTokenExpired.into()),
			None => Err(ConfigError::NoCredentials.into()),
		}
	}

	async fn acquire_flight(&self, deadline: Option<Instant>) -> Result<OwnedMutexGuard<()>> {
		let flight = Arc::clone(&self.flight);

		match deadline {
			Some(deadline) => timeout_at(deadline, flight.lock_owned())
				.await
				.map_err(|elapsed| TransportError::deadline(elapsed).into()),
			None => Ok(flight.lock_owned().await),
		}
	}

	/// Selects the grant to dispatch plus the seed grant to fall back to when a refresh is
	/// rejected with `invalid_grant`.
	fn plan(&self, now: OffsetDateTime) -> Result<(GrantRequest, Option<GrantRequest>)> {
		let state = self.state.lock();
		let seed = if let Some((user, password)) = &state.user {
			Some(GrantRequest::password(user, password))
		} else if let Some((id, secret)) = &state.client {
			Some(GrantRequest::client_credentials(id, secret))
		} else {
			None
		};

		if let Some(refresh) =
			state.refresh.as_ref().filter(|token| !token.expires_within(now, REFRESH_FLOOR))
		{
			return Ok((GrantRequest::refresh(refresh.as_str()), seed));
		}

		match seed {
			Some(seed) => Ok((seed, None)),
			None => Err(ConfigError::NoCredentials.into()),
		}
	}

	async fn refresh(&self, deadline: Option<Instant>) -> Result<(String, String)> {
		let (request, fallback) = self.plan(OffsetDateTime::now_utc())?;
		let grant = request.grant;
		let span = tracing::info_span!("token_request", grant = %grant);

		async move {
			debug!("Requesting tokens using the {grant} grant.");

			let outcome = self.dispatch(&request, deadline).await?;
			let outcome = match (outcome, fallback) {
				(Outcome::OAuth { error, .. }, Some(seed))
					if grant == Grant::RefreshToken && error == "invalid_grant" =>
				{
					warn!(
						"Token endpoint no longer accepts the refresh token, retrying with the \
						 {} grant.",
						seed.grant
					);

					self.dispatch(&seed, deadline).await?
				},
				(outcome, _) => outcome,
			};

			match outcome {
				Outcome::Tokens { access, refresh } => Ok(self.install(access, refresh)),
				Outcome::OAuth { error, description } => Err(Error::OAuth { error, description }),
				Outcome::Http { status, content_type, excerpt } =>
					Err(Error::Http { status, content_type, excerpt }),
			}
		}
		.instrument(span)
		.await
	}

	/// Runs one grant against the endpoint, retrying transport failures and 5xx responses until
	/// a terminal outcome, the attempt cap, or the caller's deadline.
	async fn dispatch(&self, request: &GrantRequest, deadline: Option<Instant>) -> Result<Outcome> {
		let url = self.token_url.as_ref().ok_or(ConfigError::MissingTokenUrl)?;
		let mut last_error: Option<Error> = None;
		let mut attempt = 0;

		loop {
			attempt += 1;

			let remaining =
				deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
			let result = self
				.transport
				.execute(TokenRequest { url, form: &request.form, timeout: remaining })
				.await;
			let err = match result {
				Ok(raw) => {
					self.metrics.observe(attempt, &raw.status.to_string());

					match response::classify(&raw) {
						Outcome::Http { status, content_type, excerpt }
							if retry::retryable_status(status) =>
							Error::Http { status, content_type, excerpt },
						outcome => return Ok(outcome),
					}
				},
				Err(transport_err) => {
					self.metrics.observe(attempt, "0");

					let err = Error::from(transport_err);

					if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
						// Out of budget mid-attempt; prefer reporting what actually failed.
						return Err(last_error.unwrap_or(err));
					}

					err
				},
			};

			warn!(attempt, "Token request attempt failed: {err}");

			if attempt >= retry::MAX_ATTEMPTS {
				return Err(err);
			}

			let delay = retry::backoff_delay(attempt);

			if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
				return Err(err);
			}

			last_error = Some(err);
			sleep(delay).await;
		}
	}

	/// Replaces the cached pair in one critical section; a response without a refresh token
	/// keeps the previous one.
	fn install(&self, access: String, refresh: Option<String>) -> (String, String) {
		let access = Token::new(access);
		let raw_access = access.as_str().to_owned();
		let mut state = self.state.lock();

		if let Some(refresh) = refresh {
			state.refresh = Some(Token::new(refresh));
		}

		state.access = Some(access);

		let refresh =
			state.refresh.as_ref().map(|token| token.as_str().to_owned()).unwrap_or_default();

		(raw_access, refresh)
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_url", &self.token_url)
			.field("closed", &self.closed.load(Ordering::SeqCst))
			.finish()
	}
}
