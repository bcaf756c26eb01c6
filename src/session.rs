//! Credential session: the state machine that turns stored or freshly consented credentials
//! into usable bearer tokens.
//!
//! A [`Session`] caches at most one [`AuthorizedClient`]. Every accessor locks the cache,
//! acquires a client when it is empty (stored record first, interactive consent otherwise),
//! refreshes it when the expiry policy says so, and only then reads from it. Concurrent callers
//! queue on the same lock, so a burst of requests triggers one acquire and one refresh.
//!
//! ```text
//! Empty -> acquire -> CachedValid -> (buffer reached) -> CachedStale -> refresh -> CachedValid
//!                                                            |
//!                                               (no refresh token) -> TerminalExpired
//! sign_out: any state -> Empty
//! ```
//!
//! Processes sharing one store do not coordinate; the last writer wins.

mod acquire;
mod config;
mod lifecycle;
mod refresh;

pub use config::SessionConfig;
pub use refresh::{RefreshMetrics, RefreshSnapshot};

// self
use crate::{
	_prelude::*,
	auth::{AccountId, RegistrationData, TokenRecord, TokenSecret},
	error::AuthenticationError,
	expiry::{Clock, SystemClock},
	obs,
	provider::{ConsentProvider, TokenProvider},
	store::CredentialStore,
};

/// Observable state of a session's cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
	/// No client is cached.
	Empty,
	/// The cached access token is usable.
	CachedValid,
	/// The cached access token needs a refresh before use.
	CachedStale,
	/// The cached access token expired and no refresh token exists; sign in again.
	TerminalExpired,
}

/// Registration data paired with the current token record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedClient {
	/// Client registration the record was issued under.
	pub registration: RegistrationData,
	/// Current token record.
	pub record: TokenRecord,
}
impl AuthorizedClient {
	/// Current access token, if any.
	pub fn access_token(&self) -> Option<&TokenSecret> {
		self.record.access_token.as_ref()
	}

	/// Classifies this client at `now` under `buffer`.
	pub fn state_at(&self, buffer: Duration, now: OffsetDateTime) -> SessionState {
		if !self.record.is_expired_at(buffer, now) {
			SessionState::CachedValid
		} else if self.record.has_refresh_token() {
			SessionState::CachedStale
		} else {
			SessionState::TerminalExpired
		}
	}
}

/// `Authorization: Bearer <token>` header produced by a session.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationHeader(TokenSecret);
impl AuthorizationHeader {
	/// Header name.
	pub const NAME: &'static str = "Authorization";

	/// Wraps an access token.
	pub fn bearer(token: TokenSecret) -> Self {
		Self(token)
	}

	/// Header value, `Bearer <token>`.
	pub fn value(&self) -> String {
		format!("Bearer {}", self.0.expose())
	}

	/// Name/value pair ready for an HTTP client's header map.
	pub fn as_pair(&self) -> (&'static str, String) {
		(Self::NAME, self.value())
	}
}
impl Debug for AuthorizationHeader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthorizationHeader(Bearer <redacted>)")
	}
}

/// OAuth 2.0 credential session bound to one account identity.
pub struct Session {
	store: Arc<dyn CredentialStore>,
	consent: Arc<dyn ConsentProvider>,
	provider: Arc<dyn TokenProvider>,
	clock: Arc<dyn Clock>,
	config: SessionConfig,
	account: AccountId,
	/// Counters for refresh exchanges performed by this session.
	pub refresh_metrics: Arc<RefreshMetrics>,
	slot: AsyncMutex<Option<AuthorizedClient>>,
}
impl Session {
	/// Creates an empty session; nothing is read until the first accessor runs.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		consent: Arc<dyn ConsentProvider>,
		provider: Arc<dyn TokenProvider>,
		config: SessionConfig,
	) -> Self {
		let account = AccountId::resolve(config.account.as_ref());

		Self {
			store,
			consent,
			provider,
			clock: Arc::new(SystemClock),
			config,
			account,
			refresh_metrics: Default::default(),
			slot: AsyncMutex::new(None),
		}
	}

	/// Replaces the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Account identity this session reads and writes.
	pub fn account(&self) -> &AccountId {
		&self.account
	}

	/// Session configuration.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Reports the cache state without touching the store or the provider.
	///
	/// Waits for an in-flight acquire or refresh to settle first.
	pub async fn state(&self) -> SessionState {
		let slot = self.slot.lock().await;

		match slot.as_ref() {
			Some(client) => client.state_at(self.config.expiry_buffer, self.clock.now()),
			None => SessionState::Empty,
		}
	}

	/// Returns a fresh authorized client, acquiring and refreshing as needed.
	pub async fn client(&self) -> Result<AuthorizedClient> {
		let mut slot = self.slot.lock().await;

		self.fresh_client_locked(&mut slot).await
	}

	/// Returns a fresh access token.
	pub async fn access_token(&self) -> Result<TokenSecret> {
		let client = self.client().await?;

		client.record.access_token.ok_or_else(|| AuthenticationError::MissingAccessToken.into())
	}

	/// Returns `Authorization: Bearer <access token>` for a fresh access token.
	pub async fn authorization_header(&self) -> Result<AuthorizationHeader> {
		self.access_token().await.map(AuthorizationHeader::bearer)
	}

	/// Returns `true` when a fresh client can be produced; failures read as `false`.
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	pub async fn is_authenticated(&self) -> bool {
		match self.client().await {
			Ok(_) => true,
			Err(e) => {
				obs::event!(
					debug,
					account = %self.account,
					error = %e,
					"Session is not authenticated."
				);

				false
			},
		}
	}

	async fn fresh_client_locked(
		&self,
		slot: &mut Option<AuthorizedClient>,
	) -> Result<AuthorizedClient> {
		let client = match slot.take() {
			Some(client) => client,
			None => self.acquire().await?,
		};
		let client = slot.insert(client);

		self.ensure_fresh(client).await?;

		Ok(client.clone())
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("account", &self.account)
			.field("config", &self.config)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenBundle;

	#[test]
	fn authorization_header_formats_bearer_and_redacts_debug() {
		let header = AuthorizationHeader::bearer(TokenSecret::new("ya29.token"));

		assert_eq!(header.as_pair(), ("Authorization", "Bearer ya29.token".to_owned()));
		assert!(!format!("{header:?}").contains("ya29"));
	}

	#[test]
	fn client_state_follows_expiry_and_refresh_token() {
		let registration = RegistrationData::from_json_slice(
			br#"{"installed":{"client_id":"c","client_secret":"s","redirect_uris":["http://localhost"]}}"#,
		)
		.expect("Registration fixture should parse.");
		let now = OffsetDateTime::now_utc();
		let buffer = Duration::minutes(5);
		let client = |bundle| AuthorizedClient {
			registration: registration.clone(),
			record: TokenRecord::from_bundle(&registration, bundle),
		};

		assert_eq!(
			client(TokenBundle::new("a").expires_at(now + Duration::hours(1)))
				.state_at(buffer, now),
			SessionState::CachedValid
		);
		assert_eq!(
			client(TokenBundle::new("a").with_refresh_token("r").expires_at(now))
				.state_at(buffer, now),
			SessionState::CachedStale
		);
		assert_eq!(
			client(TokenBundle::new("a").expires_at(now - Duration::seconds(10)))
				.state_at(buffer, now),
			SessionState::TerminalExpired
		);
	}
}
