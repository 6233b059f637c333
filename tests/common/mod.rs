//! Shared fixtures for integration tests.

#![allow(dead_code)]

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::json;
use time::{Duration, OffsetDateTime};

/// Builds an unsigned JWT whose payload carries `exp` at `now + offset`.
pub fn token_expiring_in(offset: Duration) -> String {
	let exp = (OffsetDateTime::now_utc() + offset).unix_timestamp();
	let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "typ": "Bearer" }).to_string());

	format!("{header}.{payload}.signature")
}

/// Renders the token endpoint's success body.
pub fn tokens_json(access: &str, refresh: &str) -> String {
	json!({ "access_token": access, "refresh_token": refresh }).to_string()
}

/// Renders the token endpoint's structured error body.
pub fn oauth_error_json(error: &str, description: &str) -> String {
	json!({ "error": error, "error_description": description }).to_string()
}
