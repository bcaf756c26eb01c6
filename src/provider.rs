//! Provider contracts consumed by the session.
//!
//! The session treats the authorization server as two opaque collaborators: a
//! [`ConsentProvider`] that turns scopes plus registration data into a first token bundle, and
//! a [`TokenProvider`] that refreshes and revokes. Both are object safe so sessions hold them as
//! `Arc<dyn ...>`.

// self
use crate::{
	_prelude::*,
	auth::{RegistrationData, ScopeSet, TokenBundle, TokenSecret},
	error::ProviderError,
};

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Interactive consent flow producing the first token bundle.
pub trait ConsentProvider
where
	Self: Send + Sync,
{
	/// Runs consent for `scopes` against `registration`.
	///
	/// A bundle without a refresh token is rejected by the session, not by the provider.
	fn authenticate<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		registration: &'a RegistrationData,
	) -> ProviderFuture<'a, TokenBundle>;
}

/// Token-endpoint operations that need no user interaction.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token` for a renewed access token.
	///
	/// The returned bundle carries a refresh token only when the provider rotated it.
	fn refresh<'a>(
		&'a self,
		registration: &'a RegistrationData,
		refresh_token: &'a TokenSecret,
	) -> ProviderFuture<'a, TokenBundle>;

	/// Revokes `token` at the provider.
	fn revoke<'a>(
		&'a self,
		registration: &'a RegistrationData,
		token: RevocableToken,
	) -> ProviderFuture<'a, ()>;
}

/// Token handed to [`TokenProvider::revoke`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevocableToken {
	/// Short-lived access token.
	Access(TokenSecret),
	/// Long-lived refresh token.
	Refresh(TokenSecret),
}
impl RevocableToken {
	/// Label used in logs; never includes the secret.
	pub const fn kind(&self) -> &'static str {
		match self {
			RevocableToken::Access(_) => "access_token",
			RevocableToken::Refresh(_) => "refresh_token",
		}
	}

	/// Returns the wrapped secret.
	pub fn secret(&self) -> &TokenSecret {
		match self {
			RevocableToken::Access(secret) | RevocableToken::Refresh(secret) => secret,
		}
	}
}
