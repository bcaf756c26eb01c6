//! [`TokenProvider`] implementation on top of the `oauth2` crate.
//!
//! The OAuth client is rebuilt from [`RegistrationData`] on every call because the registration
//! is owned by the store, not by the provider. Client credentials travel in the request body.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AccessToken, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointMaybeSet,
	EndpointNotSet, EndpointSet, ErrorResponseType, HttpClientError, PkceCodeVerifier,
	RedirectUrl, RefreshToken, RequestTokenError, RevocationUrl, StandardErrorResponse,
	StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{RegistrationData, TokenBundle, TokenSecret},
	error::{ConfigError, ProviderError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ProviderFuture, RevocableToken, TokenProvider},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type ConfiguredClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointMaybeSet, EndpointSet>;

/// Maps transport failures into [`ProviderError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> ProviderError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> ProviderError {
		match err {
			HttpClientError::Reqwest(inner) => {
				let inner = *inner;

				if inner.is_builder() {
					return ConfigError::http_client_build(inner).into();
				}
				if inner.is_timeout() {
					return ProviderError::Endpoint {
						message: "Request timed out while calling the token endpoint".into(),
						status: meta_status(meta).or_else(|| inner.status().map(|s| s.as_u16())),
					};
				}

				ProviderError::network(inner)
			},
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => ProviderError::Io(inner),
			HttpClientError::Other(message) => ProviderError::Endpoint {
				message: format!("HTTP client error: {message}"),
				status: meta_status(meta),
			},
			_ => ProviderError::Endpoint {
				message: "Unknown HTTP client error".into(),
				status: meta_status(meta),
			},
		}
	}
}

/// `oauth2`-backed refresh, revoke, and authorization-code exchange.
pub struct OAuth2Provider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
#[cfg(feature = "reqwest")]
impl OAuth2Provider<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a provider using a redirect-free reqwest client.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?, ReqwestTransportErrorMapper))
	}
}
impl<C, M> OAuth2Provider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a provider over a custom transport and error mapper.
	pub fn with_http_client(
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { http_client: http_client.into(), error_mapper: error_mapper.into() }
	}

	/// Exchanges an authorization code (with its PKCE verifier) for a token bundle.
	pub(crate) fn exchange_code<'a>(
		&'a self,
		registration: &'a RegistrationData,
		code: &'a str,
		pkce_verifier: &'a str,
		redirect_uri: &'a Url,
	) -> ProviderFuture<'a, TokenBundle> {
		Box::pin(async move {
			let client = build_client(registration)?;
			let redirect = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "redirect", source })?;
			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());
			let response = client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect))
				.request_async(&handle)
				.await
				.map_err(|e| map_request_error(meta.take(), e, self.error_mapper.as_ref()))?;

			into_bundle(response)
		})
	}
}
impl<C, M> Debug for OAuth2Provider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Provider").finish_non_exhaustive()
	}
}
impl<C, M> TokenProvider for OAuth2Provider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn refresh<'a>(
		&'a self,
		registration: &'a RegistrationData,
		refresh_token: &'a TokenSecret,
	) -> ProviderFuture<'a, TokenBundle> {
		Box::pin(async move {
			let client = build_client(registration)?;
			let secret = RefreshToken::new(refresh_token.expose().to_owned());
			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());
			let response = client
				.exchange_refresh_token(&secret)
				.request_async(&handle)
				.await
				.map_err(|e| map_request_error(meta.take(), e, self.error_mapper.as_ref()))?;

			into_bundle(response)
		})
	}

	fn revoke<'a>(
		&'a self,
		registration: &'a RegistrationData,
		token: RevocableToken,
	) -> ProviderFuture<'a, ()> {
		Box::pin(async move {
			let client = build_client(registration)?;
			let revocable = match token {
				RevocableToken::Access(secret) => StandardRevocableToken::AccessToken(
					AccessToken::new(secret.expose().to_owned()),
				),
				RevocableToken::Refresh(secret) => StandardRevocableToken::RefreshToken(
					RefreshToken::new(secret.expose().to_owned()),
				),
			};
			let request = client
				.revoke_token(revocable)
				.map_err(|e| ConfigError::Revocation { reason: e.to_string() })?;
			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());

			request
				.request_async(&handle)
				.await
				.map_err(|e| map_request_error(meta.take(), e, self.error_mapper.as_ref()))
		})
	}
}

fn build_client(registration: &RegistrationData) -> Result<ConfiguredClient, ProviderError> {
	let auth_url = AuthUrl::new(registration.auth_uri.to_string())
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "authorization", source })?;
	let token_url = TokenUrl::new(registration.token_uri.to_string())
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?;
	let revocation_url = registration
		.revoke_uri
		.as_ref()
		.map(|uri| RevocationUrl::new(uri.to_string()))
		.transpose()
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "revocation", source })?;

	Ok(BasicClient::new(ClientId::new(registration.client_id.clone()))
		.set_client_secret(ClientSecret::new(registration.client_secret.expose().to_owned()))
		.set_auth_type(AuthType::RequestBody)
		.set_auth_uri(auth_url)
		.set_token_uri(token_url)
		.set_revocation_url_option(revocation_url))
}

fn into_bundle(response: BasicTokenResponse) -> Result<TokenBundle, ProviderError> {
	let mut bundle = TokenBundle::new(response.access_token().secret().to_owned());

	if let Some(refresh) = response.refresh_token() {
		bundle = bundle.with_refresh_token(refresh.secret().to_owned());
	}
	if let Some(lifetime) = response.expires_in() {
		let lifetime =
			Duration::try_from(lifetime).map_err(|_| ConfigError::ExpiresInOutOfRange)?;
		let instant = OffsetDateTime::now_utc()
			.checked_add(lifetime)
			.ok_or(ConfigError::ExpiresInOutOfRange)?;

		bundle = bundle.expires_at(instant);
	}

	Ok(bundle)
}

fn map_request_error<T, E, M>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, StandardErrorResponse<T>>,
	mapper: &M,
) -> ProviderError
where
	T: ErrorResponseType + Display,
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(&response, meta),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta, error),
		RequestTokenError::Parse(source, _body) =>
			ProviderError::ResponseParse { source, status: meta_status(meta) },
		RequestTokenError::Other(message) =>
			ProviderError::Endpoint { message, status: meta_status(meta) },
	}
}

fn map_server_response<T>(
	response: &StandardErrorResponse<T>,
	meta: Option<&ResponseMetadata>,
) -> ProviderError
where
	T: ErrorResponseType + Display,
{
	let code = response.error().to_string();
	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.clone(),
	};

	match code.as_str() {
		"invalid_grant" => ProviderError::InvalidGrant { reason },
		"invalid_client" | "unauthorized_client" => ProviderError::InvalidClient { reason },
		_ => ProviderError::Endpoint { message: reason, status: meta_status(meta) },
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
