//! Storage contract for registration data and per-account token records, plus built-in
//! backends.
//!
//! Backends own the persisted [`TokenRecord`] between operations. The session only ever talks
//! to the [`CredentialStore`] trait, so swapping the file backend for [`MemoryStore`] (or a
//! caller-supplied implementation) does not change session behavior.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccountId, RegistrationData, TokenRecord},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract used by credential sessions.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the client registration.
	///
	/// Fails when the registration is absent, unreadable, or structurally invalid.
	fn read_registration(&self) -> StoreFuture<'_, RegistrationData>;

	/// Fetches the token record stored for `account`; absence is not an error.
	fn read_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Persists or replaces the token record for `account`.
	///
	/// The write is durable once the future resolves.
	fn write_token<'a>(
		&'a self,
		record: &'a TokenRecord,
		account: &'a AccountId,
	) -> StoreFuture<'a, ()>;

	/// Removes the token record for `account`. Removing a missing record succeeds.
	fn delete_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
///
/// Messages carry paths and positions only; record contents never reach them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Encoding or decoding a stored payload failed.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (I/O, permissions, locking).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A required entry such as the registration does not exist.
	#[error("Not found: {message}.")]
	NotFound {
		/// Human-readable error payload.
		message: String,
	},
	/// Registration data exists but is structurally invalid.
	#[error("Invalid registration: {message}.")]
	InvalidRegistration {
		/// Human-readable error payload.
		message: String,
	},
}
