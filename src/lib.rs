//! Token acquisition and refresh core for API client SDKs—grant selection, serialized refresh,
//! retry classification, and cookie-aware transport in one crate.
//!
//! The entry point is [`connection::ConnectionBuilder`]: seed it with any combination of access
//! token, refresh token, user password, or client credentials, point it at a token endpoint, and
//! every call to [`connection::Connection::tokens`] returns an access/refresh pair that is valid
//! for at least the requested period, refreshing through the endpoint when the cached pair is
//! absent, expired, or about to expire.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod connection;
pub mod error;
pub mod grant;
pub mod http;
pub mod jwt;
pub mod obs;

mod manager;
mod response;
mod retry;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")] pub use reqwest::Client as ReqwestClient;
	pub use serde::Deserialize;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
