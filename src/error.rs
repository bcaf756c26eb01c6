//! Session-level error types shared across the store, providers, and the session state machine.
//!
//! The taxonomy is closed: every public operation fails with either an
//! [`AuthenticationError`] or a [`StoreError`]. Provider failures never surface on their own;
//! they travel as the source of the authentication failure they caused. No variant formats
//! secret material into its message.

// self
use crate::_prelude::*;

/// Session-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public session APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Establishing or refreshing a usable credential failed.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Reading, writing, or deleting persisted state failed.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Returns `true` for the terminal "expired without refresh token" condition.
	pub fn is_token_expired(&self) -> bool {
		matches!(self, Self::Authentication(AuthenticationError::TokenExpired))
	}

	/// Returns `true` when the failure originated in the storage layer.
	pub fn is_storage(&self) -> bool {
		matches!(self, Self::Storage(_))
	}
}

/// Failures to establish or refresh a valid credential.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// The interactive consent provider failed.
	#[error("Interactive consent failed.")]
	Consent {
		/// Provider failure reported by the consent flow.
		#[source]
		source: ProviderError,
	},
	/// The consent provider returned a bundle without a refresh token.
	#[error("Consent provider returned a token bundle without a refresh token.")]
	MissingRefreshToken,
	/// The cached credential is past its usable lifetime and cannot be refreshed.
	///
	/// This is terminal: callers must sign in again.
	#[error("Access token expired and no refresh token is available; sign in again.")]
	TokenExpired,
	/// Every refresh attempt failed.
	#[error("Token refresh failed after {attempts} attempts.")]
	RefreshExhausted {
		/// Number of attempts performed, including the first.
		attempts: u32,
		/// Failure reported by the final attempt.
		#[source]
		source: ProviderError,
	},
	/// The freshness pass completed but no access token is present.
	#[error("No access token is available after the freshness check.")]
	MissingAccessToken,
}

/// Failures reported by consent, refresh, and revocation providers.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Local configuration problem (endpoints, HTTP client, response shape).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or session-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or registration credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider returned an unexpected but non-fatal response.
	#[error("Provider endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider responded with malformed JSON.
	#[error("Provider endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying I/O failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl ProviderError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds an [`ProviderError::Endpoint`] without an HTTP status.
	pub fn endpoint(message: impl Into<String>) -> Self {
		Self::Endpoint { message: message.into(), status: None }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ProviderError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Configuration and validation failures raised before or after a provider call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Registration data contains an endpoint the OAuth client rejects.
	#[error("Registration {endpoint} endpoint is invalid.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Registration data lists no redirect endpoint for the consent flow.
	#[error("Registration data does not define a redirect URI.")]
	MissingRedirectUri,
	/// Revocation was requested but cannot be performed with the configured endpoints.
	#[error("Token revocation is not configured: {reason}.")]
	Revocation {
		/// Reason reported by the OAuth client.
		reason: String,
	},
	/// Provider returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
