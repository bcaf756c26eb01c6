// self
use crate::{
	_prelude::*,
	auth::{AccountId, ScopeSet},
	expiry::DEFAULT_EXPIRY_BUFFER,
	retry::Backoff,
};

/// Tunables for a [`Session`](crate::session::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
	/// Scopes requested during interactive consent.
	pub scopes: ScopeSet,
	/// Account identity; `None` selects [`AccountId::DEFAULT`].
	pub account: Option<AccountId>,
	/// Margin before expiry at which a token counts as expired.
	pub expiry_buffer: Duration,
	/// Retry policy wrapped around each refresh exchange.
	pub backoff: Backoff,
}
impl SessionConfig {
	/// Creates a configuration requesting `scopes` with default tunables.
	pub fn new(scopes: ScopeSet) -> Self {
		Self {
			scopes,
			account: None,
			expiry_buffer: DEFAULT_EXPIRY_BUFFER,
			backoff: Backoff::default(),
		}
	}

	/// Selects the account identity.
	pub fn with_account(mut self, account: AccountId) -> Self {
		self.account = Some(account);

		self
	}

	/// Overrides the expiry buffer.
	pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
		self.expiry_buffer = buffer;

		self
	}

	/// Overrides the refresh retry policy.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.backoff = backoff;

		self
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self::new(ScopeSet::default())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_policy() {
		let config = SessionConfig::default();

		assert!(config.scopes.is_empty());
		assert!(config.account.is_none());
		assert_eq!(config.expiry_buffer, Duration::minutes(5));
		assert_eq!(config.backoff, Backoff::new(3, StdDuration::from_secs(1)));
	}

	#[test]
	fn builders_override_fields() {
		let account = AccountId::new("ops").expect("Account fixture should be valid.");
		let config = SessionConfig::new(ScopeSet::new(["scopeA"]).expect("Scope is valid."))
			.with_account(account.clone())
			.with_expiry_buffer(Duration::seconds(30))
			.with_backoff(Backoff::new(1, StdDuration::from_millis(50)));

		assert!(config.scopes.contains("scopeA"));
		assert_eq!(config.account, Some(account));
		assert_eq!(config.expiry_buffer, Duration::seconds(30));
		assert_eq!(config.backoff.max_attempts(), 2);
	}
}
