//! Walks one account through consent, refresh, and sign-out with tokens persisted on disk.
//!
//! A local mock server plays the authorization server, and the receiver stands in for the
//! browser by echoing the state back with a fixed code. The first token expires inside the
//! default five-minute buffer, so the first header request also performs a refresh.

// std
use std::{env, fs, process, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_session::{
	auth::{AccountId, ScopeSet},
	consent::{
		AuthorizationCodeConsent, AuthorizationCodeReceiver, AuthorizationRequest,
		AuthorizationResponse,
	},
	oauth::OAuth2Provider,
	provider::ProviderFuture,
	session::{Session, SessionConfig},
	store::FileStore,
};

struct PrintingReceiver;
impl AuthorizationCodeReceiver for PrintingReceiver {
	fn receive<'a>(
		&'a self,
		request: &'a AuthorizationRequest,
	) -> ProviderFuture<'a, AuthorizationResponse> {
		Box::pin(async move {
			println!("Open in a browser: {}.", request.authorize_url);

			Ok(AuthorizationResponse::new("demo-code", request.state.clone()))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let code_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "authorization_code");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"token_type\":\"bearer\",\"expires_in\":60}",
			);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access-2\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let dir = env::temp_dir().join(format!("oauth2-session-demo-{}", process::id()));

	fs::create_dir_all(&dir)?;
	fs::write(
		dir.join("credentials.json"),
		format!(
			r#"{{"installed":{{
				"client_id":"demo-client",
				"client_secret":"demo-secret",
				"redirect_uris":["http://localhost:3000/oauth2callback"],
				"auth_uri":"{}",
				"token_uri":"{}"
			}}}}"#,
			server.url("/authorize"),
			server.url("/token"),
		),
	)?;

	let store = Arc::new(FileStore::new(dir.join("credentials.json"), dir.join("tokens")));
	let provider = Arc::new(OAuth2Provider::new()?);
	let consent =
		Arc::new(AuthorizationCodeConsent::new(provider.clone(), Arc::new(PrintingReceiver)));
	let config = SessionConfig::new(ScopeSet::new(["openid", "email"])?);
	let session = Session::new(store.clone(), consent, provider, config);
	let (name, value) = session.authorization_header().await?.as_pair();

	println!("{name}: {value}");
	println!("Refresh counters: {:?}.", session.refresh_metrics.snapshot());
	println!("Token file: {}.", store.token_path(&AccountId::default())?.display());

	code_mock.assert_async().await;
	refresh_mock.assert_async().await;

	session.sign_out().await?;

	println!("Signed out; session state is {:?}.", session.state().await);

	fs::remove_dir_all(&dir)?;

	Ok(())
}
