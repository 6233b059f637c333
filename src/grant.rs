//! Grant shapes recognized by the token endpoint.
//!
//! All grants are POSTed to the token URL as `application/x-www-form-urlencoded` bodies; client
//! authentication for the password and client-credentials grants travels as form fields.

// self
use crate::_prelude::*;

/// The protocol verb by which the token endpoint issues tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Grant {
	/// `grant_type=refresh_token` using a cached refresh token.
	RefreshToken,
	/// `grant_type=password` using a resource-owner user and password.
	Password,
	/// `grant_type=client_credentials` using a client id and secret.
	ClientCredentials,
}
impl Grant {
	/// Returns the stable wire label for the grant.
	pub const fn as_str(self) -> &'static str {
		match self {
			Grant::RefreshToken => "refresh_token",
			Grant::Password => "password",
			Grant::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for Grant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A fully-populated grant request: the grant shape plus its form fields.
#[derive(Clone)]
pub struct GrantRequest {
	/// Grant shape carried by the form.
	pub grant: Grant,
	/// Form fields POSTed to the token endpoint.
	pub form: Vec<(&'static str, String)>,
}
impl GrantRequest {
	/// Builds a refresh grant request.
	pub fn refresh(refresh_token: &str) -> Self {
		Self {
			grant: Grant::RefreshToken,
			form: vec![
				("grant_type", Grant::RefreshToken.as_str().into()),
				("refresh_token", refresh_token.into()),
			],
		}
	}

	/// Builds a password grant request.
	pub fn password(user: &str, password: &str) -> Self {
		Self {
			grant: Grant::Password,
			form: vec![
				("grant_type", Grant::Password.as_str().into()),
				("username", user.into()),
				("password", password.into()),
			],
		}
	}

	/// Builds a client credentials grant request.
	pub fn client_credentials(client_id: &str, client_secret: &str) -> Self {
		Self {
			grant: Grant::ClientCredentials,
			form: vec![
				("grant_type", Grant::ClientCredentials.as_str().into()),
				("client_id", client_id.into()),
				("client_secret", client_secret.into()),
			],
		}
	}
}
impl Debug for GrantRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrantRequest")
			.field("grant", &self.grant)
			.field("form_keys", &self.form.iter().map(|(key, _)| *key).collect::<Vec<_>>())
			.finish()
	}
}
