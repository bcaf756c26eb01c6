//! Client registration data issued by the authorization provider's developer console.
//!
//! The registration file nests the client under either a `web` or an `installed` key. Only
//! the client identifier, client secret, and a non-empty redirect URI list are mandatory;
//! endpoint fields override the defaults below when present.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Authorization endpoint used when the registration file does not override it.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
/// Token endpoint used when the registration file does not override it.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Revocation endpoint used when the registration file does not override it.
pub const DEFAULT_REVOKE_URI: &str = "https://oauth2.googleapis.com/revoke";

/// Errors raised while parsing or validating registration data.
#[derive(Debug, ThisError)]
pub enum RegistrationError {
	/// The payload is not valid JSON or has the wrong shape.
	///
	/// Only the JSON path and position are reported so secrets never reach the message.
	#[error("Registration data is malformed at `{path}` (line {line}, column {column}).")]
	Malformed {
		/// JSON path of the offending value.
		path: String,
		/// One-based line number.
		line: usize,
		/// One-based column number.
		column: usize,
	},
	/// Neither a `web` nor an `installed` application entry exists.
	#[error("Registration data has neither a `web` nor an `installed` entry.")]
	MissingApplication,
	/// A required field is absent or empty.
	#[error("Registration data is missing `{field}`.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// A URI field could not be parsed.
	#[error("Registration field `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Immutable client registration record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationData {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Ordered redirect endpoints; never empty.
	pub redirect_uris: Vec<Url>,
	/// Authorization endpoint.
	pub auth_uri: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token_uri: Url,
	/// Revocation endpoint, if the provider offers one.
	pub revoke_uri: Option<Url>,
}
impl RegistrationData {
	/// Parses a registration file payload.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, RegistrationError> {
		let de = &mut serde_json::Deserializer::from_slice(bytes);
		let file: RegistrationFile = serde_path_to_error::deserialize(de).map_err(|e| {
			RegistrationError::Malformed {
				path: e.path().to_string(),
				line: e.inner().line(),
				column: e.inner().column(),
			}
		})?;
		let raw = file.web.or(file.installed).ok_or(RegistrationError::MissingApplication)?;

		raw.validate()
	}

	/// Redirect endpoint used by consent flows (the first registered entry).
	pub fn redirect_uri(&self) -> Option<&Url> {
		self.redirect_uris.first()
	}
}

#[derive(Deserialize)]
struct RegistrationFile {
	web: Option<RawRegistration>,
	installed: Option<RawRegistration>,
}

#[derive(Deserialize)]
struct RawRegistration {
	client_id: Option<String>,
	client_secret: Option<String>,
	#[serde(default)]
	redirect_uris: Vec<String>,
	auth_uri: Option<String>,
	token_uri: Option<String>,
	revoke_uri: Option<String>,
}
impl RawRegistration {
	fn validate(self) -> Result<RegistrationData, RegistrationError> {
		let client_id = required("client_id", self.client_id)?;
		let client_secret = required("client_secret", self.client_secret)?;

		if self.redirect_uris.is_empty() {
			return Err(RegistrationError::MissingField { field: "redirect_uris" });
		}

		let redirect_uris = self
			.redirect_uris
			.iter()
			.map(|raw| parse_url("redirect_uris", raw))
			.collect::<Result<Vec<_>, _>>()?;
		let auth_uri = parse_url("auth_uri", self.auth_uri.as_deref().unwrap_or(DEFAULT_AUTH_URI))?;
		let token_uri =
			parse_url("token_uri", self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI))?;
		let revoke_uri =
			parse_url("revoke_uri", self.revoke_uri.as_deref().unwrap_or(DEFAULT_REVOKE_URI))?;

		Ok(RegistrationData {
			client_id,
			client_secret: TokenSecret::new(client_secret),
			redirect_uris,
			auth_uri,
			token_uri,
			revoke_uri: Some(revoke_uri),
		})
	}
}

fn required(field: &'static str, value: Option<String>) -> Result<String, RegistrationError> {
	value.filter(|v| !v.is_empty()).ok_or(RegistrationError::MissingField { field })
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, RegistrationError> {
	Url::parse(raw).map_err(|source| RegistrationError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_installed_shape_with_defaults() {
		let payload = br#"{
			"installed": {
				"client_id": "client.apps.example",
				"client_secret": "shh",
				"redirect_uris": ["http://localhost:3000/oauth2callback", "urn:ietf:wg:oauth:2.0:oob"]
			}
		}"#;
		let registration =
			RegistrationData::from_json_slice(payload).expect("Installed shape should parse.");

		assert_eq!(registration.client_id, "client.apps.example");
		assert_eq!(registration.client_secret.expose(), "shh");
		assert_eq!(
			registration.redirect_uri().map(Url::as_str),
			Some("http://localhost:3000/oauth2callback")
		);
		assert_eq!(registration.token_uri.as_str(), DEFAULT_TOKEN_URI);
		assert_eq!(registration.auth_uri.as_str(), DEFAULT_AUTH_URI);
	}

	#[test]
	fn web_shape_overrides_endpoints() {
		let payload = br#"{
			"web": {
				"client_id": "web-client",
				"client_secret": "web-secret",
				"redirect_uris": ["https://app.example.com/callback"],
				"auth_uri": "https://id.example.com/authorize",
				"token_uri": "https://id.example.com/token"
			}
		}"#;
		let registration =
			RegistrationData::from_json_slice(payload).expect("Web shape should parse.");

		assert_eq!(registration.auth_uri.as_str(), "https://id.example.com/authorize");
		assert_eq!(registration.token_uri.as_str(), "https://id.example.com/token");
	}

	#[test]
	fn missing_fields_are_reported_by_name() {
		let err = RegistrationData::from_json_slice(
			br#"{"installed":{"client_id":"id","redirect_uris":["http://localhost"]}}"#,
		)
		.expect_err("Missing client secret must be rejected.");

		assert!(matches!(err, RegistrationError::MissingField { field: "client_secret" }));

		let err = RegistrationData::from_json_slice(
			br#"{"web":{"client_id":"id","client_secret":"s","redirect_uris":[]}}"#,
		)
		.expect_err("Empty redirect list must be rejected.");

		assert!(matches!(err, RegistrationError::MissingField { field: "redirect_uris" }));

		let err = RegistrationData::from_json_slice(br#"{"other":{}}"#)
			.expect_err("Unknown application shape must be rejected.");

		assert!(matches!(err, RegistrationError::MissingApplication));
	}

	#[test]
	fn malformed_payload_reports_path_without_values() {
		let err = RegistrationData::from_json_slice(
			br#"{"web":{"client_id":"id","client_secret":"s","redirect_uris":"sekrit"}}"#,
		)
		.expect_err("Non-list redirect URIs must be rejected.");

		assert!(matches!(err, RegistrationError::Malformed { .. }));
		assert!(err.to_string().contains("web.redirect_uris"));
		assert!(!err.to_string().contains("sekrit"));
	}
}
