//! Thread-safe in-memory [`CredentialStore`] for tests, demos, and embedders that persist
//! elsewhere.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, RegistrationData, TokenRecord},
	store::{CredentialStore, StoreError, StoreFuture},
};

type TokenMap = Arc<RwLock<HashMap<AccountId, TokenRecord>>>;

/// Process-local store; clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	registration: Arc<RwLock<Option<RegistrationData>>>,
	tokens: TokenMap,
}
impl MemoryStore {
	/// Creates a store pre-loaded with `registration`.
	pub fn with_registration(registration: RegistrationData) -> Self {
		let store = Self::default();

		store.set_registration(registration);

		store
	}

	/// Installs or replaces the registration data.
	pub fn set_registration(&self, registration: RegistrationData) {
		*self.registration.write() = Some(registration);
	}

	/// Returns a snapshot of the record stored for `account`, bypassing the async contract.
	pub fn snapshot(&self, account: &AccountId) -> Option<TokenRecord> {
		self.tokens.read().get(account).cloned()
	}

	/// Number of accounts with a stored record.
	pub fn len(&self) -> usize {
		self.tokens.read().len()
	}

	/// Returns `true` when no record is stored.
	pub fn is_empty(&self) -> bool {
		self.tokens.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn read_registration(&self) -> StoreFuture<'_, RegistrationData> {
		Box::pin(async move {
			self.registration.read().clone().ok_or_else(|| StoreError::NotFound {
				message: "No registration data has been installed".into(),
			})
		})
	}

	fn read_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.snapshot(account)) })
	}

	fn write_token<'a>(
		&'a self,
		record: &'a TokenRecord,
		account: &'a AccountId,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.tokens.write().insert(account.clone(), record.clone());

			Ok(())
		})
	}

	fn delete_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.tokens.write().remove(account);

			Ok(())
		})
	}
}
