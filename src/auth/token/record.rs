//! Persisted token record and its lifecycle helpers.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	auth::{RegistrationData, TokenBundle, TokenSecret},
	expiry,
};

/// Kind tag stored with every record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
	/// Credentials obtained on behalf of an end user.
	#[default]
	#[serde(rename = "authorized_user")]
	AuthorizedUser,
}

/// Token record persisted per account identity.
///
/// Serialized as `{"type":"authorized_user","client_id",...,"expiry_date":<unix millis>}`.
/// Expiry instants are kept at millisecond precision so a write followed by a read yields an
/// equal record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Kind tag; always [`TokenKind::AuthorizedUser`].
	#[serde(rename = "type", default)]
	pub kind: TokenKind,
	/// OAuth client identifier the tokens were issued to.
	pub client_id: String,
	/// OAuth client secret paired with the identifier.
	pub client_secret: TokenSecret,
	/// Long-lived refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Short-lived access token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Absolute expiry instant of the access token.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "expiry_millis")]
	pub expiry_date: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Builds a record from the registration and a freshly issued bundle.
	pub fn from_bundle(registration: &RegistrationData, bundle: TokenBundle) -> Self {
		Self {
			kind: TokenKind::AuthorizedUser,
			client_id: registration.client_id.clone(),
			client_secret: registration.client_secret.clone(),
			refresh_token: bundle.refresh_token,
			access_token: Some(bundle.access_token),
			expiry_date: bundle.expires_at.map(truncate_millis),
		}
	}

	/// Returns a copy carrying the refreshed access token and expiry.
	///
	/// Identity fields are kept. The refresh token is replaced only when the provider rotated
	/// it.
	pub fn refreshed(&self, bundle: TokenBundle) -> Self {
		Self {
			kind: self.kind,
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			refresh_token: bundle.refresh_token.or_else(|| self.refresh_token.clone()),
			access_token: Some(bundle.access_token),
			expiry_date: bundle.expires_at.map(truncate_millis),
		}
	}

	/// Returns `true` if the access token must not be used at `now` given `buffer`.
	pub fn is_expired_at(&self, buffer: Duration, now: OffsetDateTime) -> bool {
		expiry::is_expired_at(self.expiry_date, buffer, now)
	}

	/// Returns `true` when a refresh token is available.
	pub fn has_refresh_token(&self) -> bool {
		self.refresh_token.is_some()
	}
}

fn truncate_millis(instant: OffsetDateTime) -> OffsetDateTime {
	instant.replace_millisecond(instant.millisecond()).unwrap_or(instant)
}

mod expiry_millis {
	// self
	use super::*;

	pub(super) fn serialize<S>(
		value: &Option<OffsetDateTime>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(instant) => {
				let millis = instant.unix_timestamp_nanos() / 1_000_000;

				serializer.serialize_some(&(millis as i64))
			},
			None => serializer.serialize_none(),
		}
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		<Option<i64>>::deserialize(deserializer)?
			.map(|millis| OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000))
			.transpose()
			.map_err(DeError::custom)
	}
}
