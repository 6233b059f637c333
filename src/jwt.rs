//! Expiry inspection for bearer tokens.
//!
//! Tokens are treated as opaque unless they are a JWT whose payload carries a numeric `exp`
//! claim. The payload is read without signature verification; expiry is advisory, and a token
//! without a readable `exp` is assumed to outlive the request so its lifetime is whatever the
//! server decides.

// crates.io
use jsonwebtoken::dangerous::insecure_decode;
// self
use crate::_prelude::*;

/// A bearer token paired with the expiry read from its payload, when readable.
///
/// Immutable value: tokens are replaced, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	raw: String,
	expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Wraps a raw encoded token, deriving its expiry from the JWT `exp` claim when decodable.
	pub fn new(raw: impl Into<String>) -> Self {
		let raw = raw.into();
		let expires_at = decode_expiry(&raw);

		Self { raw, expires_at }
	}

	/// Returns the raw encoded token.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Returns the expiry instant read from the payload, if one was decodable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns `true` when the token has a known expiry closer than `floor` from `now`.
	///
	/// Tokens without a readable expiry never report as expiring.
	pub fn expires_within(&self, now: OffsetDateTime, floor: Duration) -> bool {
		match self.expires_at {
			Some(expires_at) => expires_at - now < floor,
			None => false,
		}
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("raw", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[derive(Deserialize)]
struct Claims {
	exp: Option<f64>,
}

fn decode_expiry(raw: &str) -> Option<OffsetDateTime> {
	let claims = insecure_decode::<Claims>(raw).ok()?.claims;

	OffsetDateTime::from_unix_timestamp(claims.exp? as i64).ok()
}
