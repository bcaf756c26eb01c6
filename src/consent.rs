//! Authorization Code + PKCE consent built on [`OAuth2Provider`].
//!
//! Driving the browser is left to an [`AuthorizationCodeReceiver`]: it gets the authorize URL
//! and returns whatever arrived at the redirect endpoint. This module generates state and the
//! PKCE pair, checks the returned state, and exchanges the code.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{RegistrationData, ScopeSet, TokenBundle, TokenSecret},
	error::{ConfigError, ProviderError},
	http::TokenHttpClient,
	oauth::{OAuth2Provider, TransportErrorMapper},
	provider::{ConsentProvider, ProviderFuture},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Everything a receiver needs to send the user through consent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
	/// Fully formed authorize URL to open in a browser.
	pub authorize_url: Url,
	/// Redirect endpoint the provider will call back.
	pub redirect_uri: Url,
	/// Opaque state value expected back on the redirect.
	pub state: String,
}

/// Parameters delivered to the redirect endpoint.
#[derive(Clone, Debug)]
pub struct AuthorizationResponse {
	/// One-time authorization code.
	pub code: TokenSecret,
	/// State value echoed by the provider.
	pub state: String,
}
impl AuthorizationResponse {
	/// Creates a response from raw redirect parameters.
	pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
		Self { code: TokenSecret::new(code), state: state.into() }
	}
}

/// Delivers the user to the authorize URL and collects the redirect parameters.
pub trait AuthorizationCodeReceiver
where
	Self: Send + Sync,
{
	/// Waits for the provider to redirect back after consent.
	fn receive<'a>(
		&'a self,
		request: &'a AuthorizationRequest,
	) -> ProviderFuture<'a, AuthorizationResponse>;
}

/// [`ConsentProvider`] running the authorization-code grant with PKCE S256.
///
/// The authorize URL asks for offline access with a forced consent prompt so the provider
/// issues a refresh token.
pub struct AuthorizationCodeConsent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	provider: Arc<OAuth2Provider<C, M>>,
	receiver: Arc<dyn AuthorizationCodeReceiver>,
}
impl<C, M> AuthorizationCodeConsent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a consent flow that exchanges codes through `provider`.
	pub fn new(
		provider: Arc<OAuth2Provider<C, M>>,
		receiver: Arc<dyn AuthorizationCodeReceiver>,
	) -> Self {
		Self { provider, receiver }
	}
}
impl<C, M> Debug for AuthorizationCodeConsent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationCodeConsent").field("provider", &self.provider).finish()
	}
}
impl<C, M> ConsentProvider for AuthorizationCodeConsent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn authenticate<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		registration: &'a RegistrationData,
	) -> ProviderFuture<'a, TokenBundle> {
		Box::pin(async move {
			let redirect_uri =
				registration.redirect_uri().ok_or(ConfigError::MissingRedirectUri)?.clone();
			let pkce = PkcePair::generate();
			let state = random_string(STATE_LEN);
			let request = AuthorizationRequest {
				authorize_url: build_authorize_url(
					registration,
					&redirect_uri,
					scopes,
					&state,
					&pkce.challenge,
				),
				redirect_uri,
				state,
			};
			let response = self.receiver.receive(&request).await?;

			if response.state != request.state {
				return Err(ProviderError::InvalidGrant {
					reason: "authorization state mismatch".into(),
				});
			}

			self.provider
				.exchange_code(
					registration,
					response.code.expose(),
					&pkce.verifier,
					&request.redirect_uri,
				)
				.await
		})
	}
}

struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}

fn build_authorize_url(
	registration: &RegistrationData,
	redirect_uri: &Url,
	scopes: &ScopeSet,
	state: &str,
	code_challenge: &str,
) -> Url {
	let mut url = registration.auth_uri.clone();

	url.query_pairs_mut()
		.append_pair("response_type", "code")
		.append_pair("client_id", &registration.client_id)
		.append_pair("redirect_uri", redirect_uri.as_str())
		.append_pair("scope", &scopes.normalized())
		.append_pair("state", state)
		.append_pair("code_challenge", code_challenge)
		.append_pair("code_challenge_method", "S256")
		.append_pair("access_type", "offline")
		.append_pair("prompt", "consent");

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::BTreeMap;
	// self
	use super::*;

	fn registration() -> RegistrationData {
		RegistrationData::from_json_slice(
			br#"{"installed":{
				"client_id":"cid",
				"client_secret":"cs",
				"redirect_uris":["http://127.0.0.1:8085/callback"],
				"auth_uri":"https://id.example.com/authorize"
			}}"#,
		)
		.expect("Registration fixture should parse.")
	}

	#[test]
	fn pkce_challenge_matches_rfc7636_vector() {
		assert_eq!(
			pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn authorize_url_requests_offline_consent() {
		let registration = registration();
		let scopes =
			ScopeSet::new(["https://mail.example.com/send", "profile"]).expect("Scopes are valid.");
		let redirect = registration.redirect_uri().expect("Fixture has a redirect.").clone();
		let url = build_authorize_url(&registration, &redirect, &scopes, "xyz", "challenge");
		let pairs: BTreeMap<_, _> = url.query_pairs().into_owned().collect();

		assert_eq!(url.path(), "/authorize");
		assert_eq!(pairs["response_type"], "code");
		assert_eq!(pairs["client_id"], "cid");
		assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8085/callback");
		assert_eq!(pairs["scope"], "https://mail.example.com/send profile");
		assert_eq!(pairs["state"], "xyz");
		assert_eq!(pairs["code_challenge_method"], "S256");
		assert_eq!(pairs["access_type"], "offline");
		assert_eq!(pairs["prompt"], "consent");
		assert!(!pairs.contains_key("client_secret"));
	}

	#[test]
	fn generated_values_use_unreserved_characters() {
		let pkce = PkcePair::generate();

		assert_eq!(pkce.verifier.len(), PKCE_VERIFIER_LEN);
		assert!(pkce.verifier.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(random_string(STATE_LEN), random_string(STATE_LEN));
	}
}
