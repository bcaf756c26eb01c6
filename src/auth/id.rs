//! Account identity used to namespace stored token records.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ACCOUNT_ID_MAX_LEN: usize = 128;

/// Error returned when account identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Account identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Account identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier contains a path separator or is a relative path component.
	#[error("Account identifier must not contain path components.")]
	PathComponent,
	/// The identifier exceeded the allowed character count.
	#[error("Account identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Identity discriminator for stored token records.
///
/// Identifiers double as file stems in the file store, so besides the usual emptiness,
/// whitespace, and length checks they reject path separators and the `.`/`..` components.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);
impl AccountId {
	/// Identity used when the caller does not supply one.
	pub const DEFAULT: &'static str = "default";

	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Resolves an optional identity, falling back to [`AccountId::DEFAULT`].
	pub fn resolve(account: Option<&AccountId>) -> Self {
		account.cloned().unwrap_or_default()
	}

	/// Returns `true` for the fallback identity.
	pub fn is_default(&self) -> bool {
		self.0 == Self::DEFAULT
	}
}
impl Default for AccountId {
	fn default() -> Self {
		Self(Self::DEFAULT.to_owned())
	}
}
impl Deref for AccountId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AccountId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for AccountId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<AccountId> for String {
	fn from(value: AccountId) -> Self {
		value.0
	}
}
impl TryFrom<String> for AccountId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for AccountId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Account({})", self.0)
	}
}
impl Display for AccountId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AccountId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view == "." || view == ".." || view.contains(['/', '\\']) {
		return Err(IdentifierError::PathComponent);
	}
	if view.len() > ACCOUNT_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { max: ACCOUNT_ID_MAX_LEN });
	}

	Ok(())
}
