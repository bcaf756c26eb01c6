//! Load-or-authenticate: fills an empty session from the store, falling back to consent.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::AuthenticationError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{AuthorizedClient, Session},
};

impl Session {
	/// Builds a client from the stored record, or runs initial authentication when none exists.
	pub(super) async fn acquire(&self) -> Result<AuthorizedClient> {
		const KIND: FlowKind = FlowKind::Acquire;

		let span = FlowSpan::new(KIND, "acquire", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<AuthorizedClient> = span
			.instrument(async {
				let Some(record) = self.store.read_token(&self.account).await? else {
					obs::event!(debug, account = %self.account, "No stored token record.");

					return self.initial_authentication().await;
				};
				let registration = self.store.read_registration().await?;

				obs::event!(debug, account = %self.account, "Loaded stored token record.");

				Ok(AuthorizedClient { registration, record })
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Runs interactive consent and persists the resulting record.
	///
	/// Bundles without a refresh token are rejected before anything is written.
	async fn initial_authentication(&self) -> Result<AuthorizedClient> {
		const KIND: FlowKind = FlowKind::InitialAuthentication;

		let span = FlowSpan::new(KIND, "initial_authentication", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<AuthorizedClient> = span
			.instrument(async {
				let registration = self.store.read_registration().await?;
				let bundle = self
					.consent
					.authenticate(&self.config.scopes, &registration)
					.await
					.map_err(|source| AuthenticationError::Consent { source })?;

				if bundle.refresh_token.is_none() {
					return Err(AuthenticationError::MissingRefreshToken.into());
				}

				let record = TokenRecord::from_bundle(&registration, bundle);

				self.store.write_token(&record, &self.account).await?;

				obs::event!(
					info,
					account = %self.account,
					scopes = %self.config.scopes,
					"Initial authentication completed."
				);

				Ok(AuthorizedClient { registration, record })
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}
