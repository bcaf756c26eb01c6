//! Scripted collaborators shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU32, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros};
use tokio::time::Instant;
// self
use oauth2_session::{
	auth::{AccountId, RegistrationData, ScopeSet, TokenBundle, TokenRecord, TokenSecret},
	error::ProviderError,
	expiry::Clock,
	provider::{ConsentProvider, ProviderFuture, RevocableToken, TokenProvider},
	session::{Session, SessionConfig},
	store::{CredentialStore, FileStore, MemoryStore, StoreError, StoreFuture},
};

/// Instant every fixture clock starts at.
pub const NOW: OffsetDateTime = macros::datetime!(2025-05-01 09:00 UTC);

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock(Mutex<OffsetDateTime>);
impl FixedClock {
	pub fn at(instant: OffsetDateTime) -> Arc<Self> {
		Arc::new(Self(Mutex::new(instant)))
	}

	pub fn advance(&self, by: Duration) {
		*self.0.lock() += by;
	}
}
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// One scripted provider response.
#[derive(Clone, Debug)]
pub enum Step {
	Grant(TokenBundle),
	Fail(&'static str),
}
impl Step {
	fn into_result(self, call: u32) -> Result<TokenBundle, ProviderError> {
		match self {
			Step::Grant(bundle) => Ok(bundle),
			Step::Fail(message) => Err(ProviderError::endpoint(format!("{message} #{call}"))),
		}
	}
}

/// Consent provider replaying scripted bundles.
#[derive(Debug, Default)]
pub struct ScriptedConsent {
	steps: Mutex<VecDeque<Step>>,
	calls: AtomicU32,
	requested: Mutex<Vec<ScopeSet>>,
	latency: StdDuration,
}
impl ScriptedConsent {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self { steps: Mutex::new(steps.into_iter().collect()), ..Default::default() })
	}

	pub fn with_latency(steps: impl IntoIterator<Item = Step>, latency: StdDuration) -> Arc<Self> {
		Arc::new(Self {
			steps: Mutex::new(steps.into_iter().collect()),
			latency,
			..Default::default()
		})
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn requested_scopes(&self) -> Vec<ScopeSet> {
		self.requested.lock().clone()
	}
}
impl ConsentProvider for ScriptedConsent {
	fn authenticate<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		_registration: &'a RegistrationData,
	) -> ProviderFuture<'a, TokenBundle> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.requested.lock().push(scopes.clone());

			if !self.latency.is_zero() {
				tokio::time::sleep(self.latency).await;
			}

			let step = self.steps.lock().pop_front().unwrap_or(Step::Fail("consent unavailable"));

			step.into_result(call)
		})
	}
}

/// Token provider replaying scripted refresh responses and recording revocations.
#[derive(Debug)]
pub struct ScriptedProvider {
	steps: Mutex<VecDeque<Step>>,
	refresh_calls: AtomicU32,
	refresh_stamps: Mutex<Vec<Instant>>,
	latency: StdDuration,
	revoke_fails: AtomicBool,
	revoked: Mutex<Vec<RevocableToken>>,
}
impl ScriptedProvider {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self::build(steps, StdDuration::ZERO))
	}

	pub fn with_latency(steps: impl IntoIterator<Item = Step>, latency: StdDuration) -> Arc<Self> {
		Arc::new(Self::build(steps, latency))
	}

	fn build(steps: impl IntoIterator<Item = Step>, latency: StdDuration) -> Self {
		Self {
			steps: Mutex::new(steps.into_iter().collect()),
			refresh_calls: AtomicU32::new(0),
			refresh_stamps: Mutex::new(Vec::new()),
			latency,
			revoke_fails: AtomicBool::new(false),
			revoked: Mutex::new(Vec::new()),
		}
	}

	pub fn fail_revocation(&self) {
		self.revoke_fails.store(true, Ordering::SeqCst);
	}

	pub fn refresh_calls(&self) -> u32 {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn refresh_stamps(&self) -> Vec<Instant> {
		self.refresh_stamps.lock().clone()
	}

	pub fn revoked(&self) -> Vec<RevocableToken> {
		self.revoked.lock().clone()
	}
}
impl TokenProvider for ScriptedProvider {
	fn refresh<'a>(
		&'a self,
		_registration: &'a RegistrationData,
		refresh_token: &'a TokenSecret,
	) -> ProviderFuture<'a, TokenBundle> {
		Box::pin(async move {
			let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.refresh_stamps.lock().push(Instant::now());

			if !self.latency.is_zero() {
				tokio::time::sleep(self.latency).await;
			}
			if refresh_token.expose().is_empty() {
				return Err(ProviderError::InvalidGrant { reason: "empty refresh token".into() });
			}

			let step = self.steps.lock().pop_front().unwrap_or(Step::Fail("refresh unavailable"));

			step.into_result(call)
		})
	}

	fn revoke<'a>(
		&'a self,
		_registration: &'a RegistrationData,
		token: RevocableToken,
	) -> ProviderFuture<'a, ()> {
		Box::pin(async move {
			self.revoked.lock().push(token);

			if self.revoke_fails.load(Ordering::SeqCst) {
				Err(ProviderError::endpoint("revocation endpoint unavailable"))
			} else {
				Ok(())
			}
		})
	}
}

/// Memory store whose writes can be switched to fail.
#[derive(Clone, Debug, Default)]
pub struct FlakyStore {
	pub inner: MemoryStore,
	fail_writes: Arc<AtomicBool>,
}
impl FlakyStore {
	pub fn new(inner: MemoryStore) -> Self {
		Self { inner, fail_writes: Default::default() }
	}

	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}
}
impl CredentialStore for FlakyStore {
	fn read_registration(&self) -> StoreFuture<'_, RegistrationData> {
		self.inner.read_registration()
	}

	fn read_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, Option<TokenRecord>> {
		self.inner.read_token(account)
	}

	fn write_token<'a>(
		&'a self,
		record: &'a TokenRecord,
		account: &'a AccountId,
	) -> StoreFuture<'a, ()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Box::pin(async {
				Err(StoreError::Backend { message: "disk quota exceeded".into() })
			});
		}

		self.inner.write_token(record, account)
	}

	fn delete_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, ()> {
		self.inner.delete_token(account)
	}
}

pub fn registration() -> RegistrationData {
	RegistrationData::from_json_slice(
		br#"{"installed":{
			"client_id":"client-123.apps.example.com",
			"client_secret":"client-secret",
			"redirect_uris":["http://localhost:3000/oauth2callback"]
		}}"#,
	)
	.expect("Registration fixture should parse.")
}

pub fn scopes() -> ScopeSet {
	ScopeSet::new(["scopeA"]).expect("Scope fixture should be valid.")
}

/// Bundle with both tokens valid for an hour after [`NOW`].
pub fn consent_bundle(access: &str, refresh: &str) -> TokenBundle {
	TokenBundle::new(access).with_refresh_token(refresh).expires_at(NOW + Duration::hours(1))
}

/// Refresh response valid for an hour after [`NOW`], without a rotated refresh token.
pub fn refreshed_bundle(access: &str) -> TokenBundle {
	TokenBundle::new(access).expires_at(NOW + Duration::hours(1))
}

/// Stored record whose access token expired ten seconds before [`NOW`].
pub fn expired_record(refresh: Option<&str>) -> TokenRecord {
	let mut bundle = TokenBundle::new("access-stale").expires_at(NOW - Duration::seconds(10));

	if let Some(refresh) = refresh {
		bundle = bundle.with_refresh_token(refresh);
	}

	TokenRecord::from_bundle(&registration(), bundle)
}

pub fn session(
	store: Arc<dyn CredentialStore>,
	consent: Arc<ScriptedConsent>,
	provider: Arc<ScriptedProvider>,
) -> Session {
	Session::new(store, consent, provider, SessionConfig::new(scopes()))
		.with_clock(FixedClock::at(NOW))
}

/// File store rooted inside a temporary directory.
pub fn file_store(dir: &TempDir) -> FileStore {
	FileStore::new(dir.path().join("credentials.json"), dir.path().join("tokens"))
}
