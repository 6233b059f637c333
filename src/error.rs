//! Error types shared across the token core.

// std
use std::error::Error as StdError;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint returned a structured OAuth error.
	#[error("Token endpoint returned an OAuth error: {error}: {}.", .description.as_deref().unwrap_or("no description provided"))]
	OAuth {
		/// OAuth `error` code, e.g. `invalid_grant`.
		error: String,
		/// Human-readable `error_description`, when the endpoint supplied one.
		description: Option<String>,
	},
	/// Token endpoint returned a response that carries neither tokens nor an OAuth error.
	#[error("Token endpoint returned an unexpected response: status {status}, content type '{}', body: {excerpt}", .content_type.as_deref().unwrap_or("unknown"))]
	Http {
		/// HTTP status code of the final attempt.
		status: u16,
		/// Content-Type header of the response, when present.
		content_type: Option<String>,
		/// Body excerpt per the response classification rules.
		excerpt: String,
	},
	/// Transport failure (DNS, TCP, TLS, deadline).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The connection has been closed.
	#[error("Connection has been closed.")]
	Closed,
}
impl Error {
	/// Returns `true` when the error was ultimately caused by an expired deadline.
	///
	/// Walks the source chain so wrapped [`tokio::time::error::Elapsed`] values and timed-out
	/// transport errors are both recognized.
	pub fn is_deadline_exceeded(&self) -> bool {
		if matches!(self, Self::Transport(TransportError::DeadlineExceeded { .. })) {
			return true;
		}

		let mut source = self.source();

		while let Some(err) = source {
			if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
				return true;
			}

			#[cfg(feature = "reqwest")]
			if err.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_timeout) {
				return true;
			}

			source = err.source();
		}

		false
	}
}

/// Configuration and validation failures raised at build time or before any request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No credential source at all was provided.
	#[error("No credentials were provided: set an access or refresh token, a user, or a client.")]
	NoCredentials,
	/// The cached access token is expired and nothing can mint a new one.
	#[error("Access token is expired and no refresh token or credentials are available.")]
	AccessTokenExpired,
	/// A token URL is required for the configured credentials.
	#[error("Token URL is required when tokens must be requested or refreshed.")]
	MissingTokenUrl,
	/// A configured URL cannot be parsed.
	#[error("'{value}' is not a valid absolute URL.")]
	InvalidUrl {
		/// Raw value passed to the builder.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No transport is available to reach the token endpoint.
	#[error("No HTTP transport was provided and the default `reqwest` transport is disabled.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, deadline).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The deadline expired before the token request completed.
	#[error("Deadline exceeded while requesting tokens from the token endpoint.")]
	DeadlineExceeded {
		/// The timeout that fired, preserved for chain inspection.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps the timeout that cut an attempt short.
	pub fn deadline(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::DeadlineExceeded { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() { Self::deadline(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn deadline_errors_are_chain_identifiable() {
		let elapsed = tokio::time::timeout(std::time::Duration::ZERO, std::future::pending::<()>())
			.await
			.expect_err("Zero timeout should elapse immediately.");
		let err = Error::from(TransportError::deadline(elapsed));

		assert!(err.is_deadline_exceeded());
	}

	#[test]
	fn network_errors_are_not_deadline_errors() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let err = Error::from(TransportError::network(io));

		assert!(!err.is_deadline_exceeded());
	}

	#[test]
	fn oauth_message_carries_code_and_description() {
		let err = Error::OAuth {
			error: "invalid_grant".into(),
			description: Some("Session not active".into()),
		};
		let message = err.to_string();

		assert!(message.contains("invalid_grant"));
		assert!(message.contains("Session not active"));
	}

	#[test]
	fn http_message_carries_status_content_type_and_excerpt() {
		let err = Error::Http {
			status: 503,
			content_type: Some("text/plain".into()),
			excerpt: "Service unavailable".into(),
		};
		let message = err.to_string();

		assert!(message.contains("503"));
		assert!(message.contains("text/plain"));
		assert!(message.contains("Service unavailable"));
	}
}
