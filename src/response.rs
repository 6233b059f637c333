//! Classification of token endpoint responses.
//!
//! A response is exactly one of: a token pair (2xx JSON with `access_token`), a structured OAuth
//! error (4xx/5xx JSON with `error`), or an opaque HTTP failure carrying a bounded body excerpt.
//! The excerpt keeps the full body up to 200 bytes and otherwise joins the first and last 100
//! bytes with an ellipsis, so proxies' HTML error pages stay readable in surfaced errors.

// crates.io
use tracing::debug;
// self
use crate::{_prelude::*, http::RawResponse};

const EXCERPT_LIMIT: usize = 200;
const EXCERPT_EDGE: usize = 100;

/// Classified token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
	/// 2xx JSON response carrying at least an access token.
	Tokens { access: String, refresh: Option<String> },
	/// 4xx/5xx JSON response carrying a structured OAuth error.
	OAuth { error: String, description: Option<String> },
	/// Anything else: non-JSON, malformed JSON, or JSON missing the expected fields.
	Http { status: u16, content_type: Option<String>, excerpt: String },
}

#[derive(Deserialize)]
struct TokenBody {
	access_token: Option<String>,
	refresh_token: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
}

pub(crate) fn classify(response: &RawResponse) -> Outcome {
	if response.is_json() {
		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

		match serde_path_to_error::deserialize::<_, TokenBody>(&mut deserializer) {
			Ok(body) =>
				if response.is_success() {
					if let Some(access) = body.access_token.filter(|access| !access.is_empty()) {
						return Outcome::Tokens { access, refresh: body.refresh_token };
					}
				} else if let Some(error) = body.error {
					return Outcome::OAuth { error, description: body.error_description };
				},
			Err(err) => debug!("Token endpoint returned malformed JSON: {err}."),
		}
	}

	Outcome::Http {
		status: response.status,
		content_type: response.content_type.clone(),
		excerpt: excerpt(&response.body),
	}
}

fn excerpt(body: &[u8]) -> String {
	if body.len() <= EXCERPT_LIMIT {
		return String::from_utf8_lossy(body).into_owned();
	}

	let head = String::from_utf8_lossy(&body[..EXCERPT_EDGE]);
	let tail = String::from_utf8_lossy(&body[body.len() - EXCERPT_EDGE..]);

	format!("{head}...{tail}")
}
