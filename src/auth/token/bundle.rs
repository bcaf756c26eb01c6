//! Token bundles returned by consent and refresh exchanges.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Credentials returned by a provider exchange.
///
/// The same shape covers both the initial consent bundle and a refresh response. A refresh
/// response without a refresh token means the provider did not rotate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenBundle {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Refresh token, if the provider issued (or rotated) one.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant of the access token, if known.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenBundle {
	/// Creates a bundle carrying only an access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, expires_at: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to the current clock.
	pub fn expires_in(self, lifetime: Duration) -> Self {
		self.expires_at(OffsetDateTime::now_utc() + lifetime)
	}
}
