#![cfg(feature = "reqwest")]

mod common;

// std
use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use oauth2_session::{
	auth::{AccountId, RegistrationData, ScopeSet, TokenBundle, TokenRecord, TokenSecret},
	consent::{
		AuthorizationCodeConsent, AuthorizationCodeReceiver, AuthorizationRequest,
		AuthorizationResponse,
	},
	error::{AuthenticationError, Error, ProviderError},
	http::ReqwestHttpClient,
	oauth::{OAuth2Provider, ReqwestTransportErrorMapper},
	provider::{ConsentProvider, ProviderFuture, TokenProvider},
	retry::Backoff,
	session::{Session, SessionConfig},
	store::{CredentialStore, MemoryStore},
};

type ReqwestProvider = OAuth2Provider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

const REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

/// Receiver that answers with a fixed code and the state it was given, or a forged one.
#[derive(Debug, Default)]
struct EchoReceiver {
	forge_state: bool,
	seen: Mutex<Option<AuthorizationRequest>>,
}
impl EchoReceiver {
	fn authorize_pairs(&self) -> HashMap<String, String> {
		let seen = self.seen.lock();
		let request = seen.as_ref().expect("Receiver should have been called.");

		request.authorize_url.query_pairs().into_owned().collect()
	}
}
impl AuthorizationCodeReceiver for EchoReceiver {
	fn receive<'a>(
		&'a self,
		request: &'a AuthorizationRequest,
	) -> ProviderFuture<'a, AuthorizationResponse> {
		Box::pin(async move {
			*self.seen.lock() = Some(request.clone());

			let state = if self.forge_state { "forged".to_owned() } else { request.state.clone() };

			Ok(AuthorizationResponse::new("auth-code", state))
		})
	}
}

fn mock_registration(server: &MockServer) -> RegistrationData {
	let payload = format!(
		r#"{{"installed":{{
			"client_id":"client-123.apps.example.com",
			"client_secret":"client-secret",
			"redirect_uris":["{REDIRECT_URI}"],
			"auth_uri":"{}",
			"token_uri":"{}",
			"revoke_uri":"{}"
		}}}}"#,
		server.url("/authorize"),
		server.url("/token"),
		server.url("/revoke"),
	);

	RegistrationData::from_json_slice(payload.as_bytes()).expect("Registration should parse.")
}

fn provider() -> Arc<ReqwestProvider> {
	Arc::new(OAuth2Provider::new().expect("Provider should build."))
}

fn stale_record(registration: &RegistrationData) -> TokenRecord {
	TokenRecord::from_bundle(
		registration,
		TokenBundle::new("access-stale")
			.with_refresh_token("refresh-1")
			.expires_at(OffsetDateTime::now_utc() - Duration::seconds(10)),
	)
}

async fn seeded_store(registration: RegistrationData, record: &TokenRecord) -> MemoryStore {
	let store = MemoryStore::with_registration(registration);

	store.write_token(record, &AccountId::default()).await.expect("Seeding should succeed.");

	store
}

fn refresh_only_session(store: &MemoryStore, backoff: Backoff) -> Session {
	Session::new(
		Arc::new(store.clone()),
		ScriptedConsent::new([]),
		provider(),
		SessionConfig::new(scopes()).with_backoff(backoff),
	)
}

#[tokio::test]
async fn refresh_exchanges_and_persists_rotated_token() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let store = seeded_store(registration.clone(), &stale_record(&registration)).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-1")
				.form_urlencoded_tuple("client_id", "client-123.apps.example.com");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-2\",\"refresh_token\":\"refresh-2\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let session = refresh_only_session(&store, Backoff::default());
	let header = session.authorization_header().await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(header.value(), "Bearer access-2");

	let record = store.snapshot(&AccountId::default()).expect("Record should be stored.");

	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-2"));
	assert!(
		record.expiry_date.expect("Expiry should be recorded.")
			> OffsetDateTime::now_utc() + Duration::minutes(30)
	);
}

#[tokio::test]
async fn invalid_grant_is_classified_and_not_masked() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let store = seeded_store(registration.clone(), &stale_record(&registration)).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"Token has been expired or revoked.\"}",
			);
		})
		.await;
	let session = refresh_only_session(&store, Backoff::new(0, StdDuration::from_millis(10)));
	let err = session.access_token().await.expect_err("Refresh should be rejected.");

	mock.assert_async().await;

	match err {
		Error::Authentication(AuthenticationError::RefreshExhausted {
			attempts,
			source: ProviderError::InvalidGrant { reason },
		}) => {
			assert_eq!(attempts, 1);
			assert!(reason.contains("invalid_grant"));
			assert!(!reason.contains("refresh-1"));
		},
		other => panic!("Expected an invalid_grant exhaustion, got {other:?}."),
	}
}

#[tokio::test]
async fn invalid_client_is_classified() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let err = provider()
		.refresh(&registration, &TokenSecret::new("refresh-1"))
		.await
		.expect_err("Client should be rejected.");

	mock.assert_async().await;

	assert!(matches!(err, ProviderError::InvalidClient { .. }));
}

#[tokio::test]
async fn malformed_token_response_is_a_parse_error() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body("{\"token_type\":1}");
		})
		.await;
	let err = provider()
		.refresh(&registration, &TokenSecret::new("refresh-1"))
		.await
		.expect_err("Malformed payload should fail.");

	mock.assert_async().await;

	assert!(matches!(err, ProviderError::ResponseParse { status: Some(200), .. }));
}

#[tokio::test]
async fn unreachable_token_endpoint_is_a_network_error() {
	let registration = RegistrationData::from_json_slice(
		br#"{"installed":{
			"client_id":"client-123.apps.example.com",
			"client_secret":"client-secret",
			"redirect_uris":["http://localhost:3000/oauth2callback"],
			"token_uri":"http://127.0.0.1:9/token"
		}}"#,
	)
	.expect("Registration should parse.");
	let err = provider()
		.refresh(&registration, &TokenSecret::new("refresh-1"))
		.await
		.expect_err("Closed port should fail.");

	assert!(matches!(err, ProviderError::Network { .. }));
}

#[tokio::test]
async fn authorization_code_consent_drives_a_full_session() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let store = MemoryStore::with_registration(registration);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "auth-code")
				.form_urlencoded_tuple("redirect_uri", REDIRECT_URI)
				.form_urlencoded_tuple_exists("code_verifier");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-success\",\"refresh_token\":\"refresh-success\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let provider = provider();
	let receiver = Arc::new(EchoReceiver::default());
	let consent = Arc::new(AuthorizationCodeConsent::new(provider.clone(), receiver.clone()));
	let scopes = ScopeSet::new(["scopeB", "scopeA"]).expect("Scopes should be valid.");
	let session =
		Session::new(Arc::new(store.clone()), consent, provider, SessionConfig::new(scopes));
	let header = session.authorization_header().await.expect("Consent should succeed.");

	mock.assert_async().await;

	assert_eq!(header.as_pair(), ("Authorization", "Bearer access-success".to_owned()));

	let pairs = receiver.authorize_pairs();

	assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
	assert_eq!(pairs.get("scope").map(String::as_str), Some("scopeA scopeB"));
	assert_eq!(pairs.get("redirect_uri").map(String::as_str), Some(REDIRECT_URI));
	assert_eq!(pairs.get("access_type").map(String::as_str), Some("offline"));
	assert_eq!(pairs.get("prompt").map(String::as_str), Some("consent"));
	assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some("S256"));
	assert!(pairs.contains_key("code_challenge"));

	let record = store.snapshot(&AccountId::default()).expect("Record should be stored.");

	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-success"));

	session.sign_out().await.expect("Sign-out should succeed even if revocation is refused.");

	assert!(store.is_empty());
}

#[tokio::test]
async fn forged_state_is_rejected_before_the_code_exchange() {
	let server = MockServer::start_async().await;
	let registration = mock_registration(&server);
	let receiver = Arc::new(EchoReceiver { forge_state: true, ..Default::default() });
	let consent = AuthorizationCodeConsent::new(provider(), receiver);
	let err = consent
		.authenticate(&scopes(), &registration)
		.await
		.expect_err("Forged state must be rejected.");

	assert!(matches!(err, ProviderError::InvalidGrant { ref reason } if reason.contains("state")));
}
