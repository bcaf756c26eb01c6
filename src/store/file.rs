//! Local-file [`CredentialStore`]: a registration file plus one token file per account.
//!
//! Token files are written to a sibling temp file with owner-only permissions, flushed to disk,
//! then renamed over the target so readers never observe a partial record. The directory is
//! synced after the rename.

// std
use std::{
	fs::{self, OpenOptions},
	io::{ErrorKind, Write},
	path::{self, Path, PathBuf},
	process,
};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, RegistrationData, TokenRecord},
	store::{CredentialStore, StoreError, StoreFuture},
};

const TEMP_NONCE_LEN: usize = 8;
#[cfg(unix)]
const OWNER_READ_WRITE: u32 = 0o600;

/// File-backed store rooted at a registration path and a token directory.
///
/// Relative paths are resolved against the working directory at the time of each operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStore {
	registration_path: PathBuf,
	token_dir: PathBuf,
}
impl FileStore {
	/// Registration file used by [`FileStore::default`].
	pub const DEFAULT_REGISTRATION_PATH: &'static str = "credentials.json";
	/// Token directory used by [`FileStore::default`].
	pub const DEFAULT_TOKEN_DIR: &'static str = "tokens";
	/// Suffix appended to the account identifier to form a token file name.
	pub const TOKEN_FILE_SUFFIX: &'static str = ".token.json";

	/// Creates a store with explicit locations.
	pub fn new(registration_path: impl Into<PathBuf>, token_dir: impl Into<PathBuf>) -> Self {
		Self { registration_path: registration_path.into(), token_dir: token_dir.into() }
	}

	/// Overrides the registration file location.
	pub fn with_registration_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.registration_path = path.into();

		self
	}

	/// Overrides the token directory.
	pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.token_dir = dir.into();

		self
	}

	/// Absolute location of the registration file.
	pub fn registration_path(&self) -> Result<PathBuf, StoreError> {
		absolute(&self.registration_path)
	}

	/// Absolute location of the token file for `account`.
	pub fn token_path(&self, account: &AccountId) -> Result<PathBuf, StoreError> {
		let dir = absolute(&self.token_dir)?;

		Ok(dir.join(format!("{account}{}", Self::TOKEN_FILE_SUFFIX)))
	}

	fn load_registration(&self) -> Result<RegistrationData, StoreError> {
		let path = self.registration_path()?;
		let bytes = fs::read(&path).map_err(|e| match e.kind() {
			ErrorKind::NotFound => StoreError::NotFound {
				message: format!("Registration file {} does not exist", path.display()),
			},
			_ => StoreError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			},
		})?;

		RegistrationData::from_json_slice(&bytes).map_err(|e| StoreError::InvalidRegistration {
			message: format!("{}: {e}", path.display()),
		})
	}

	fn load_token(&self, account: &AccountId) -> Result<Option<TokenRecord>, StoreError> {
		let path = self.token_path(account)?;
		let bytes = match fs::read(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};
		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de).map(Some).map_err(|e| StoreError::Serialization {
			message: format!(
				"Failed to parse {} at `{}` (line {}, column {})",
				path.display(),
				e.path(),
				e.inner().line(),
				e.inner().column()
			),
		})
	}

	fn persist_token(&self, record: &TokenRecord, account: &AccountId) -> Result<(), StoreError> {
		let path = self.token_path(account)?;

		ensure_parent_exists(&path)?;

		let mut serialized =
			serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize token record for {account}: {e}"),
			})?;

		serialized.push(b'\n');

		let tmp_path = temp_sibling(&path);

		if let Err(e) = write_owner_only(&tmp_path, &serialized) {
			let _ = fs::remove_file(&tmp_path);

			return Err(e);
		}

		fs::rename(&tmp_path, &path).map_err(|e| {
			let _ = fs::remove_file(&tmp_path);

			StoreError::Backend { message: format!("Failed to replace {}: {e}", path.display()) }
		})?;

		sync_parent(&path)
	}

	fn remove_token(&self, account: &AccountId) -> Result<(), StoreError> {
		let path = self.token_path(account)?;

		match fs::remove_file(&path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to delete {}: {e}", path.display()),
			}),
		}
	}
}
impl Default for FileStore {
	fn default() -> Self {
		Self::new(Self::DEFAULT_REGISTRATION_PATH, Self::DEFAULT_TOKEN_DIR)
	}
}
impl CredentialStore for FileStore {
	fn read_registration(&self) -> StoreFuture<'_, RegistrationData> {
		Box::pin(async move { self.load_registration() })
	}

	fn read_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { self.load_token(account) })
	}

	fn write_token<'a>(
		&'a self,
		record: &'a TokenRecord,
		account: &'a AccountId,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.persist_token(record, account) })
	}

	fn delete_token<'a>(&'a self, account: &'a AccountId) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.remove_token(account) })
	}
}

fn absolute(path: &Path) -> Result<PathBuf, StoreError> {
	path::absolute(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to resolve {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create token directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

/// Unique hidden sibling of `path`, so concurrent writers never share a temp file.
fn temp_sibling(path: &Path) -> PathBuf {
	let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
	let nonce = rand::rng()
		.sample_iter(Alphanumeric)
		.take(TEMP_NONCE_LEN)
		.map(char::from)
		.collect::<String>();

	path.with_file_name(format!(".{name}.{}.{nonce}.tmp", process::id()))
}

fn write_owner_only(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
	let mut options = OpenOptions::new();

	options.write(true).create_new(true);

	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;

		options.mode(OWNER_READ_WRITE);
	}

	let mut file = options.open(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to create {}: {e}", path.display()),
	})?;

	// `mode` is filtered by the umask.
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;

		file.set_permissions(fs::Permissions::from_mode(OWNER_READ_WRITE)).map_err(|e| {
			StoreError::Backend {
				message: format!("Failed to restrict permissions on {}: {e}", path.display()),
			}
		})?;
	}

	file.write_all(contents).map_err(|e| StoreError::Backend {
		message: format!("Failed to write {}: {e}", path.display()),
	})?;
	file.sync_all().map_err(|e| StoreError::Backend {
		message: format!("Failed to sync {}: {e}", path.display()),
	})
}

/// Flushes the directory entry created by a rename.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), StoreError> {
	let Some(dir) = path.parent() else { return Ok(()) };

	fs::File::open(dir).and_then(|d| d.sync_all()).map_err(|e| StoreError::Backend {
		message: format!("Failed to sync directory {}: {e}", dir.display()),
	})
}

#[cfg(not(unix))]
fn sync_parent(_: &Path) -> Result<(), StoreError> {
	Ok(())
}
